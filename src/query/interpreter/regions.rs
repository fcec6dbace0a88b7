//! Genomic region filter.

use crate::common::canonical_chrom;
use crate::query::schema::data::VariantRecord;
use crate::query::schema::query::{CaseQuery, GenomicRegion, Range};

/// Determine whether the `VariantRecord` passes the genomic region filter.
pub fn passes(query: &CaseQuery, seqvar: &VariantRecord) -> bool {
    match &query.genomic_regions {
        None => true,
        Some(regions) if regions.is_empty() => true,
        Some(regions) => {
            let res = regions.iter().any(|region| {
                overlaps(region, &seqvar.chrom, seqvar.pos, seqvar.end())
            });
            if !res {
                tracing::trace!(
                    "variant {:?} fails region filter {:?}",
                    seqvar,
                    &query.genomic_regions
                );
            }
            res
        }
    }
}

/// Whether the half-open `region` overlaps the variant's 1-based inclusive
/// span `[seqvar_pos, seqvar_end]`.
fn overlaps(region: &GenomicRegion, seqvar_chrom: &str, seqvar_pos: i32, seqvar_end: i32) -> bool {
    let GenomicRegion {
        chrom: region_chrom,
        range: region_range,
    } = region;

    if canonical_chrom(region_chrom) != canonical_chrom(seqvar_chrom) {
        return false;
    }

    if let Some(Range { start, end }) = region_range {
        *start <= seqvar_end && seqvar_pos < *end
    } else {
        true
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    #[rstest]
    #[case("1", Some((100, 200)), "1", 100, 100, true)]
    #[case("chr1", Some((100, 200)), "1", 100, 100, true)]
    #[case("chr1", Some((100, 200)), "chr1", 100, 100, true)]
    // end of the half-open range is exclusive
    #[case("chr1", Some((100, 200)), "chr1", 199, 199, true)]
    #[case("chr1", Some((100, 200)), "chr1", 200, 200, false)]
    // variant span reaching into the region
    #[case("chr1", Some((100, 200)), "chr1", 95, 100, true)]
    #[case("chr1", Some((100, 200)), "chr1", 95, 99, false)]
    // chromosome mismatch
    #[case("1", Some((100, 200)), "2", 100, 100, false)]
    // whole chromosome
    #[case("1", None, "chr1", 12345, 12345, true)]
    #[case("X", None, "1", 12345, 12345, false)]
    fn overlaps(
        #[case] region_chrom: &str,
        #[case] region_range: Option<(i32, i32)>,
        #[case] seqvar_chrom: &str,
        #[case] seqvar_pos: i32,
        #[case] seqvar_end: i32,
        #[case] expected: bool,
    ) {
        let region = super::GenomicRegion {
            chrom: String::from(region_chrom),
            range: region_range.map(|(start, end)| super::Range { start, end }),
        };
        assert_eq!(
            super::overlaps(&region, seqvar_chrom, seqvar_pos, seqvar_end),
            expected
        );
    }
}
