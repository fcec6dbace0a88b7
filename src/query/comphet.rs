//! Gene-wise grouping pass for compound heterozygous queries.
//!
//! The row-level predicate only establishes "index is heterozygous and the
//! parental genotypes do not contradict".  A variant then matches only as
//! part of a pair of heterozygous variants in the same gene, one inherited
//! from each parent.  This module implements that second pass.

use indexmap::IndexMap;

use crate::common::chrom_no;
use crate::ped::Pedigree;
use crate::query::schema::data::VariantRecord;
use crate::query::schema::query::{
    considered_no_call, CaseQuery, GenotypeChoice, MatchesGenotypeStr as _,
};

/// One row-level candidate together with the samples blanked by the quality
/// filter.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The variant record.
    pub seqvar: VariantRecord,
    /// Samples whose genotype is treated as no-call.
    pub no_call_samples: Vec<String>,
}

/// Parental origin of a candidate variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Present in the father only.
    Father,
    /// Present in the mother only.
    Mother,
    /// Present in neither typed parent (parent untyped, no-call, or
    /// reference).
    Neither,
}

/// Whether the given sample carries the variant (het. or hom.).
fn present_in_sample(candidate: &Candidate, sample_name: Option<&str>) -> bool {
    let Some(sample_name) = sample_name else {
        return false;
    };
    if candidate
        .no_call_samples
        .iter()
        .any(|no_call| no_call == sample_name)
    {
        return false;
    }
    candidate
        .seqvar
        .call_info
        .get(sample_name)
        .and_then(|call_info| call_info.genotype.as_ref())
        .filter(|gt_str| !considered_no_call(gt_str))
        .map(|gt_str| GenotypeChoice::Variant.matches(gt_str).unwrap_or(false))
        .unwrap_or(false)
}

/// Apply the compound heterozygous grouping to the row-level candidates.
///
/// Candidates are grouped by HGNC gene ID.  Per gene, the largest
/// pairwise-compatible combination is retained: every candidate absent from
/// both typed parents, plus at most one candidate per typed parent (the
/// earliest by coordinate on ties, which keeps the result deterministic).
/// Two variants present in the same parent are never reported together.  A
/// gene only contributes rows when the retained combination has at least two
/// members.
pub fn filter_comphet(
    query: &CaseQuery,
    pedigree: &Pedigree,
    candidates: Vec<Candidate>,
) -> Result<Vec<Candidate>, anyhow::Error> {
    let index_name = query
        .recessive_index
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("compound recessive query without index sample"))?;
    let father_name = pedigree
        .father_of(index_name)
        .map(|individual| individual.name.clone());
    let mother_name = pedigree
        .mother_of(index_name)
        .map(|individual| individual.name.clone());

    let mut by_gene: IndexMap<String, Vec<Candidate>> = IndexMap::new();
    for candidate in candidates {
        let Some(hgnc_id) = candidate.seqvar.hgnc_id().map(|s| s.to_string()) else {
            // Variants without gene annotation cannot be paired.
            continue;
        };
        by_gene.entry(hgnc_id).or_default().push(candidate);
    }

    let mut result = Vec::new();
    for (hgnc_id, mut gene_candidates) in by_gene {
        gene_candidates.sort_by_key(|candidate| {
            (
                chrom_no(&candidate.seqvar.chrom),
                candidate.seqvar.pos,
                candidate.seqvar.reference.clone(),
                candidate.seqvar.alternative.clone(),
            )
        });

        let mut keep = Vec::new();
        let mut father_slot: Option<Candidate> = None;
        let mut mother_slot: Option<Candidate> = None;
        for candidate in gene_candidates {
            let in_father = present_in_sample(&candidate, father_name.as_deref());
            let in_mother = present_in_sample(&candidate, mother_name.as_deref());
            let origin = match (in_father, in_mother) {
                (true, false) => Origin::Father,
                (false, true) => Origin::Mother,
                (false, false) => Origin::Neither,
                (true, true) => {
                    // Removed by the row-level parental check already.
                    continue;
                }
            };
            match origin {
                Origin::Father => {
                    if father_slot.is_none() {
                        father_slot = Some(candidate);
                    }
                }
                Origin::Mother => {
                    if mother_slot.is_none() {
                        mother_slot = Some(candidate);
                    }
                }
                Origin::Neither => keep.push(candidate),
            }
        }
        keep.extend(father_slot);
        keep.extend(mother_slot);

        if keep.len() >= 2 {
            tracing::trace!(
                "gene {} contributes {} compound het. candidates",
                &hgnc_id,
                keep.len()
            );
            // Restore coordinate order within the gene.
            keep.sort_by_key(|candidate| {
                (
                    chrom_no(&candidate.seqvar.chrom),
                    candidate.seqvar.pos,
                    candidate.seqvar.reference.clone(),
                    candidate.seqvar.alternative.clone(),
                )
            });
            result.extend(keep);
        } else {
            tracing::trace!(
                "gene {} has no compatible compound het. pair ({} candidates kept)",
                &hgnc_id,
                keep.len()
            );
        }
    }

    // Global deterministic order over all genes.
    result.sort_by_key(|candidate| {
        (
            chrom_no(&candidate.seqvar.chrom),
            candidate.seqvar.pos,
            candidate.seqvar.reference.clone(),
            candidate.seqvar.alternative.clone(),
        )
    });
    Ok(result)
}
