//! Population frequency filter.

use crate::common::canonical_chrom;
use crate::query::schema::data::{Af as _, VariantRecord};
use crate::query::schema::query::CaseQuery;

/// Determine whether the `VariantRecord` passes the frequency filter.
///
/// A variant with no record in a database has all counts at zero and thus
/// passes that database's filter; lack of data never excludes a variant.
pub fn passes(query: &CaseQuery, s: &VariantRecord) -> Result<bool, anyhow::Error> {
    let q = &query.frequency;
    let is_mtdna = canonical_chrom(&s.chrom) == "MT";

    if is_mtdna {
        if q.helixmtdb.enabled
            && (q.helixmtdb.frequency.is_some()
                && s.helixmtdb.af() > q.helixmtdb.frequency.expect("tested before")
                || q.helixmtdb.heteroplasmic.is_some()
                    && s.helixmtdb.het > q.helixmtdb.heteroplasmic.expect("tested before")
                || q.helixmtdb.homoplasmic.is_some()
                    && s.helixmtdb.hom > q.helixmtdb.homoplasmic.expect("tested before"))
        {
            tracing::trace!("variant {:?} fails HelixMtDb frequency filter {:?}", s, &q);
            return Ok(false);
        }
    } else if q.gnomad_exomes.enabled
        && (q.gnomad_exomes.frequency.is_some()
            && s.gnomad_exomes.af() > q.gnomad_exomes.frequency.expect("tested before")
            || q.gnomad_exomes.heterozygous.is_some()
                && s.gnomad_exomes.het > q.gnomad_exomes.heterozygous.expect("tested before")
            || q.gnomad_exomes.homozygous.is_some()
                && s.gnomad_exomes.hom > q.gnomad_exomes.homozygous.expect("tested before")
            || q.gnomad_exomes.hemizygous.is_some()
                && s.gnomad_exomes.hemi > q.gnomad_exomes.hemizygous.expect("tested before"))
    {
        tracing::trace!(
            "variant {:?} fails gnomAD exomes frequency filter {:?}",
            s,
            &q.gnomad_exomes
        );
        return Ok(false);
    }

    if q.gnomad_genomes.enabled
        && (q.gnomad_genomes.frequency.is_some()
            && s.gnomad_genomes.af() > q.gnomad_genomes.frequency.expect("tested before")
            || q.gnomad_genomes.heterozygous.is_some()
                && s.gnomad_genomes.het > q.gnomad_genomes.heterozygous.expect("tested before")
            || q.gnomad_genomes.homozygous.is_some()
                && s.gnomad_genomes.hom > q.gnomad_genomes.homozygous.expect("tested before")
            || !is_mtdna
                && q.gnomad_genomes.hemizygous.is_some()
                && s.gnomad_genomes.hemi > q.gnomad_genomes.hemizygous.expect("tested before"))
    {
        tracing::trace!(
            "variant {:?} fails gnomAD genomes frequency filter {:?}",
            s,
            &q.gnomad_genomes
        );
        return Ok(false);
    }

    if q.inhouse.enabled
        && (q.inhouse.carriers.is_some()
            && s.inhouse.carriers > q.inhouse.carriers.expect("tested before")
            || q.inhouse.heterozygous.is_some()
                && s.inhouse.het > q.inhouse.heterozygous.expect("tested before")
            || q.inhouse.homozygous.is_some()
                && s.inhouse.hom > q.inhouse.homozygous.expect("tested before")
            || !is_mtdna
                && q.inhouse.hemizygous.is_some()
                && s.inhouse.hemi > q.inhouse.hemizygous.expect("tested before"))
    {
        tracing::trace!(
            "variant {:?} fails in-house frequency filter {:?}",
            s,
            &q.inhouse
        );
        return Ok(false);
    }

    Ok(true)
}
