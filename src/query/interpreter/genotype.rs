//! Genotype and inheritance mode filter.

use crate::common::Chrom;
use crate::ped::{Pedigree, Sex};
use crate::query::schema::data::VariantRecord;
use crate::query::schema::query::{
    considered_no_call, CaseQuery, GenotypeChoice, MatchesGenotypeStr as _, RecessiveMode,
};

use super::compilation;

/// Expand the recessive mode of a query into per-sample genotype markers.
///
/// The designated index sample receives the `RecessiveIndex` or
/// `ComphetIndex` marker, the index's parents receive `RecessiveParent`.
/// Samples already constrained by the user keep their constraint unless they
/// take part in the recessive structure.  Returns a new query, the input is
/// left untouched.
///
/// # Errors
///
/// Returns an error when the mode lacks a resolvable index sample or the
/// index is not part of the pedigree.
pub fn expand_recessive_markers(
    query: &CaseQuery,
    pedigree: &Pedigree,
) -> Result<CaseQuery, compilation::Error> {
    let markers = query.index_marker_samples();
    let Some(mode) = query.recessive_mode else {
        return Ok(query.clone());
    };

    let index = query
        .recessive_index
        .clone()
        .or_else(|| markers.first().cloned())
        .ok_or(compilation::Error::MissingRecessiveIndex)?;
    if !pedigree.individuals.contains_key(&index) {
        return Err(compilation::Error::UnknownIndexSample(index));
    }

    let index_marker = match mode {
        RecessiveMode::Recessive => GenotypeChoice::RecessiveIndex,
        RecessiveMode::CompoundRecessive => GenotypeChoice::ComphetIndex,
    };
    let parent_names = [pedigree.father_of(&index), pedigree.mother_of(&index)]
        .into_iter()
        .flatten()
        .map(|parent| parent.name.clone())
        .collect::<Vec<_>>();

    let mut result = query.clone();
    result.recessive_index = Some(index.clone());
    result.genotype.insert(index, Some(index_marker));
    for parent in parent_names {
        result
            .genotype
            .insert(parent, Some(GenotypeChoice::RecessiveParent));
    }
    Ok(result)
}

/// Determine whether the `VariantRecord` passes the genotype filter.
///
/// Samples listed in `no_call_samples` have failed their quality thresholds
/// with the `no-call` policy; their genotypes are treated as missing.
pub fn passes(
    query: &CaseQuery,
    pedigree: &Pedigree,
    seqvar: &VariantRecord,
    no_call_samples: &[&str],
) -> Result<bool, anyhow::Error> {
    let result = if let (Some(index_name), Some(mode)) =
        (query.recessive_index.as_ref(), query.recessive_mode)
    {
        passes_recessive_modes(query, pedigree, mode, index_name, seqvar, no_call_samples)?
    } else {
        passes_non_recessive_mode(query, seqvar, no_call_samples)?
    };

    tracing::trace!(
        "variant {:?} has result {} for genotype filter {:?}",
        seqvar,
        result,
        &query.genotype
    );
    Ok(result)
}

/// Return the effective genotype of a sample, `None` when the genotype is
/// missing, a no-call, or blanked by the quality filter.
fn effective_genotype(
    seqvar: &VariantRecord,
    sample_name: &str,
    no_call_samples: &[&str],
) -> Option<String> {
    if no_call_samples.contains(&sample_name) {
        return None;
    }
    seqvar
        .call_info
        .get(sample_name)
        .and_then(|call_info| call_info.genotype.clone())
        .filter(|gt_str| !considered_no_call(gt_str))
}

/// Handle case of the mode being one of the recessive modes.
fn passes_recessive_modes(
    query: &CaseQuery,
    pedigree: &Pedigree,
    mode: RecessiveMode,
    index_name: &str,
    seqvar: &VariantRecord,
    no_call_samples: &[&str],
) -> Result<bool, anyhow::Error> {
    let chrom = seqvar.chrom.parse::<Chrom>()?;
    let index_sex = pedigree
        .individuals
        .get(index_name)
        .map(|individual| individual.sex)
        .ok_or_else(|| anyhow::anyhow!("index sample {} not found in pedigree", index_name))?;

    // Constraints on samples outside the recessive structure still apply;
    // samples without an established genotype stay unconstrained here.
    for (sample_name, choice) in query.genotype.iter() {
        let Some(choice) = choice else {
            continue;
        };
        if matches!(
            choice,
            GenotypeChoice::RecessiveIndex
                | GenotypeChoice::ComphetIndex
                | GenotypeChoice::RecessiveParent
        ) {
            continue;
        }
        if let Some(gt_str) = effective_genotype(seqvar, sample_name, no_call_samples) {
            if !choice
                .matches(&gt_str)
                .map_err(|e| anyhow::anyhow!("invalid genotype choice in {:?}: {}", &seqvar, e))?
            {
                return Ok(false);
            }
        }
    }

    // Without an established genotype for the index there is nothing to
    // support the inheritance hypothesis.
    let Some(index_gt) = effective_genotype(seqvar, index_name, no_call_samples) else {
        return Ok(false);
    };

    // Collect the parents selected for the recessive structure; parents with
    // unknown genotype stay unconstrained.
    let parents = query
        .recessive_parent_samples()
        .into_iter()
        .filter_map(|parent_name| {
            let parent_sex = pedigree
                .individuals
                .get(&parent_name)
                .map(|individual| individual.sex)
                .unwrap_or_default();
            effective_genotype(seqvar, &parent_name, no_call_samples)
                .map(|gt_str| (parent_sex, gt_str))
        })
        .collect::<Vec<_>>();

    match mode {
        RecessiveMode::Recessive => {
            passes_homozygous_recessive(chrom, index_sex, &index_gt, &parents)
        }
        RecessiveMode::CompoundRecessive => passes_comphet_candidate(&index_gt, &parents),
    }
}

/// Row-level check for the homozygous recessive mode.
///
/// The index must be homozygous alternative, or hemizygous alternative for a
/// male index on the X chromosome.  Parents with known genotype must be
/// heterozygous carriers; on the X chromosome the father of a male index is
/// exempt and the father of a female index must carry the allele
/// hemizygously.
fn passes_homozygous_recessive(
    chrom: Chrom,
    index_sex: Sex,
    index_gt: &str,
    parents: &[(Sex, String)],
) -> Result<bool, anyhow::Error> {
    let on_x = chrom == Chrom::X;
    let index_ok = GenotypeChoice::Hom
        .matches(index_gt)
        .map_err(|e| anyhow::anyhow!("invalid index genotype: {}", e))?
        || (on_x
            && index_sex == Sex::Male
            && GenotypeChoice::Variant
                .matches(index_gt)
                .map_err(|e| anyhow::anyhow!("invalid index genotype: {}", e))?);
    if !index_ok {
        return Ok(false);
    }

    for (parent_sex, parent_gt) in parents {
        let parent_ok = if on_x && *parent_sex == Sex::Male {
            if index_sex == Sex::Male {
                // The father does not transmit his X to a male index.
                true
            } else {
                GenotypeChoice::Variant
                    .matches(parent_gt)
                    .map_err(|e| anyhow::anyhow!("invalid parent genotype: {}", e))?
            }
        } else {
            GenotypeChoice::Het
                .matches(parent_gt)
                .map_err(|e| anyhow::anyhow!("invalid parent genotype: {}", e))?
        };
        if !parent_ok {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Row-level check for compound heterozygous candidates.
///
/// The index must be heterozygous; among the parents with known genotype at
/// most one may be reference, at most one may be heterozygous, and none may
/// be homozygous alternative.  The gene-wise pairing is a second pass, see
/// `crate::query::comphet`.
fn passes_comphet_candidate(
    index_gt: &str,
    parents: &[(Sex, String)],
) -> Result<bool, anyhow::Error> {
    let comphet_ok_index = GenotypeChoice::Het
        .matches(index_gt)
        .map_err(|e| anyhow::anyhow!("invalid index genotype: {}", e))?;
    let parents_ref = parents
        .iter()
        .filter(|(_, parent_gt)| {
            GenotypeChoice::Ref.matches(parent_gt).unwrap_or(false)
        })
        .count();
    let parents_het = parents
        .iter()
        .filter(|(_, parent_gt)| {
            GenotypeChoice::Het.matches(parent_gt).unwrap_or(false)
        })
        .count();
    let parents_hom = parents
        .iter()
        .filter(|(_, parent_gt)| {
            GenotypeChoice::Hom.matches(parent_gt).unwrap_or(false)
        })
        .count();

    Ok(comphet_ok_index && parents_ref <= 1 && parents_het <= 1 && parents_hom == 0)
}

/// Handle case if the mode is not one of the recessive modes.
fn passes_non_recessive_mode(
    query: &CaseQuery,
    seqvar: &VariantRecord,
    no_call_samples: &[&str],
) -> Result<bool, anyhow::Error> {
    for (sample_name, genotype) in query.genotype.iter() {
        let genotype_choice = if let Some(genotype_choice) = genotype {
            genotype_choice
        } else {
            tracing::trace!("no genotype choice for sample {} (skip&pass)", sample_name);
            continue;
        };
        if no_call_samples.contains(&sample_name.as_str()) {
            tracing::trace!("genotype of sample {} blanked by quality (skip&pass)", sample_name);
            continue;
        }
        let genotype = if let Some(call_info) = seqvar.call_info.get(sample_name) {
            if let Some(genotype) = call_info.genotype.as_ref() {
                genotype
            } else {
                tracing::trace!("no GT for sample {} (skip&fail)", sample_name);
                return Ok(false);
            }
        } else {
            tracing::trace!("no call info for sample {} (skip&fail)", sample_name);
            return Ok(false);
        };

        if !genotype_choice
            .matches(genotype)
            .map_err(|e| anyhow::anyhow!("invalid genotype choice in {:?}: {}", &seqvar, e))?
        {
            tracing::trace!(
                "variant {:?} fails genotype filter {:?} on sample {}",
                seqvar,
                &query.genotype,
                sample_name
            );
            return Ok(false);
        }
    }

    Ok(true) // all good up to here
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::ped::Pedigree;
    use crate::query::schema::data::test::record_with_genotypes;
    use crate::query::schema::query::test::query_for;
    use crate::query::schema::query::{CaseQuery, GenotypeChoice, RecessiveMode};

    fn recessive_query(pedigree: &Pedigree, mode: RecessiveMode) -> CaseQuery {
        let mut query = query_for(pedigree);
        query.recessive_mode = Some(mode);
        query.recessive_index = Some("index".into());
        super::expand_recessive_markers(&query, pedigree).unwrap()
    }

    #[test]
    fn expand_recessive_markers_is_pure() {
        let pedigree = crate::ped::test::trio();
        let mut query = query_for(&pedigree);
        query.recessive_mode = Some(RecessiveMode::Recessive);
        query.recessive_index = Some("index".into());

        let expanded = super::expand_recessive_markers(&query, &pedigree).unwrap();

        assert_eq!(query.genotype["index"], Some(GenotypeChoice::Any));
        assert_eq!(
            expanded.genotype["index"],
            Some(GenotypeChoice::RecessiveIndex)
        );
        assert_eq!(
            expanded.genotype["father"],
            Some(GenotypeChoice::RecessiveParent)
        );
        assert_eq!(
            expanded.genotype["mother"],
            Some(GenotypeChoice::RecessiveParent)
        );
    }

    #[rstest]
    // index hom, both parents carriers: pass
    #[case("1/1", "0/1", "0/1", true)]
    // index het only: fail
    #[case("0/1", "0/1", "0/1", false)]
    // index ref: fail
    #[case("0/0", "0/1", "0/1", false)]
    // one parent not carrier: fail
    #[case("1/1", "0/0", "0/1", false)]
    // parent hom: fail (would be affected)
    #[case("1/1", "1/1", "0/1", false)]
    // parent genotype unknown: unconstrained
    #[case("1/1", "./.", "0/1", true)]
    fn passes_homozygous_recessive_autosomal(
        #[case] gt_index: &str,
        #[case] gt_father: &str,
        #[case] gt_mother: &str,
        #[case] expected: bool,
    ) {
        let pedigree = crate::ped::test::trio();
        let query = recessive_query(&pedigree, RecessiveMode::Recessive);
        let seqvar = record_with_genotypes(
            "1",
            100,
            "A",
            "G",
            "HGNC:1100",
            &[("index", gt_index), ("father", gt_father), ("mother", gt_mother)],
        );

        let res = super::passes(&query, &pedigree, &seqvar, &[]).unwrap();

        assert_eq!(res, expected);
    }

    #[rstest]
    // male index hemizygous, mother carrier, father ref: pass
    #[case("1", "0/0", "0/1", true)]
    // male index het call on X still counts as hemizygous
    #[case("0/1", "0/0", "0/1", true)]
    // mother not carrier: fail
    #[case("1", "0/0", "0/0", false)]
    // index ref: fail
    #[case("0", "0/0", "0/1", false)]
    fn passes_homozygous_recessive_x_linked(
        #[case] gt_index: &str,
        #[case] gt_father: &str,
        #[case] gt_mother: &str,
        #[case] expected: bool,
    ) {
        let pedigree = crate::ped::test::trio();
        let query = recessive_query(&pedigree, RecessiveMode::Recessive);
        let seqvar = record_with_genotypes(
            "chrX",
            100,
            "A",
            "G",
            "HGNC:1100",
            &[("index", gt_index), ("father", gt_father), ("mother", gt_mother)],
        );

        let res = super::passes(&query, &pedigree, &seqvar, &[]).unwrap();

        assert_eq!(res, expected);
    }

    #[rstest]
    // index het, one parent carrier: candidate
    #[case("0/1", "0/1", "0/0", &[], true)]
    #[case("0/1", "0/0", "0/1", &[], true)]
    // index het, both parents ref (de novo): not a candidate
    #[case("0/1", "0/0", "0/0", &[], false)]
    // both parents het: fail
    #[case("0/1", "0/1", "0/1", &[], false)]
    // parent hom: fail
    #[case("0/1", "1/1", "0/0", &[], false)]
    // index hom: fail
    #[case("1/1", "0/1", "0/0", &[], false)]
    // index no-call: fail
    #[case("./.", "0/1", "0/0", &[], false)]
    // father blanked by quality: counts as unknown
    #[case("0/1", "1/1", "0/1", &["father"], true)]
    fn passes_comphet_candidate(
        #[case] gt_index: &str,
        #[case] gt_father: &str,
        #[case] gt_mother: &str,
        #[case] no_call_samples: &[&str],
        #[case] expected: bool,
    ) {
        let pedigree = crate::ped::test::trio();
        let query = recessive_query(&pedigree, RecessiveMode::CompoundRecessive);
        let seqvar = record_with_genotypes(
            "1",
            100,
            "A",
            "G",
            "HGNC:1100",
            &[("index", gt_index), ("father", gt_father), ("mother", gt_mother)],
        );

        let res = super::passes(&query, &pedigree, &seqvar, no_call_samples).unwrap();

        assert_eq!(res, expected);
    }

    #[rstest]
    // all constraints match
    #[case(&[("index", Some(GenotypeChoice::Het)), ("father", Some(GenotypeChoice::Ref))], true)]
    // constraint violated
    #[case(&[("index", Some(GenotypeChoice::Hom)), ("father", Some(GenotypeChoice::Ref))], false)]
    // unconstrained sample ignored
    #[case(&[("index", None), ("father", None)], true)]
    fn passes_non_recessive_mode(
        #[case] choices: &[(&str, Option<GenotypeChoice>)],
        #[case] expected: bool,
    ) {
        let mut query = CaseQuery::default();
        for (sample, choice) in choices {
            query.genotype.insert(sample.to_string(), *choice);
        }
        let pedigree = crate::ped::test::trio();
        let seqvar = record_with_genotypes(
            "1",
            100,
            "A",
            "G",
            "HGNC:1100",
            &[("index", "0/1"), ("father", "0/0"), ("mother", "0/0")],
        );

        let res = super::passes(&query, &pedigree, &seqvar, &[]).unwrap();

        assert_eq!(res, expected);
    }

    #[test]
    fn recessive_mode_still_applies_other_sample_constraints() {
        let pedigree = Pedigree::from_ped_str(
            "FAM index father mother 1 2\n\
             FAM sibling father mother 2 1\n\
             FAM father 0 0 1 1\n\
             FAM mother 0 0 2 1\n",
        )
        .unwrap();
        let mut query = query_for(&pedigree);
        query.recessive_mode = Some(RecessiveMode::Recessive);
        query.recessive_index = Some("index".into());
        query
            .genotype
            .insert("sibling".into(), Some(GenotypeChoice::Ref));
        let query = super::expand_recessive_markers(&query, &pedigree).unwrap();
        let genotypes = |gt_sibling: &str| {
            record_with_genotypes(
                "1",
                100,
                "A",
                "G",
                "HGNC:1100",
                &[
                    ("index", "1/1"),
                    ("sibling", gt_sibling),
                    ("father", "0/1"),
                    ("mother", "0/1"),
                ],
            )
        };

        let ref_sibling = super::passes(&query, &pedigree, &genotypes("0/0"), &[]).unwrap();
        let het_sibling = super::passes(&query, &pedigree, &genotypes("0/1"), &[]).unwrap();

        assert!(ref_sibling);
        assert!(!het_sibling);
    }

    #[test]
    fn passes_non_recessive_mode_skips_no_call_samples() {
        let mut query = CaseQuery::default();
        query
            .genotype
            .insert("index".into(), Some(GenotypeChoice::Het));
        let pedigree = crate::ped::test::trio();
        let seqvar =
            record_with_genotypes("1", 100, "A", "G", "HGNC:1100", &[("index", "1/1")]);

        assert!(!super::passes(&query, &pedigree, &seqvar, &[]).unwrap());
        assert!(super::passes(&query, &pedigree, &seqvar, &["index"]).unwrap());
    }
}
