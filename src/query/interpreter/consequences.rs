//! Variant type, consequence, and transcript filter.

use crate::common::canonical_chrom;
use crate::query::schema::data::{FeatureBiotype, VariantRecord, VariantType};
use crate::query::schema::query::CaseQuery;

/// Determine whether the `VariantRecord` passes the variant type,
/// consequence, transcript type, and exon distance filters.
pub fn passes(query: &CaseQuery, seqvar: &VariantRecord) -> Result<bool, anyhow::Error> {
    let var_type_ok = match seqvar.variant_type() {
        VariantType::Snv => query.var_type_snv,
        VariantType::Indel => query.var_type_indel,
        VariantType::Mnv => query.var_type_mnv,
    };
    if !var_type_ok {
        tracing::trace!(
            "variant {:?} fails variant type filter {:?}",
            &seqvar,
            seqvar.variant_type()
        );
        return Ok(false);
    }

    // If no consequences are specified, the variant passes.  Variants on
    // chrMT always pass the annotation-based filters.
    if query.effects.is_empty() || canonical_chrom(&seqvar.chrom) == "MT" {
        return Ok(true);
    }

    let query_csq = std::collections::BTreeSet::from_iter(query.effects.iter().cloned());
    for ann_field in &seqvar.ann_fields {
        let biotype_ok = match ann_field.feature_biotype {
            FeatureBiotype::Coding => query.transcripts_coding,
            FeatureBiotype::Noncoding => query.transcripts_noncoding,
        };
        if !biotype_ok {
            continue;
        }
        if let (Some(max_exon_dist), Some(exon_dist)) = (query.max_exon_dist, ann_field.exon_dist)
        {
            if exon_dist > max_exon_dist {
                continue;
            }
        }
        let seqvar_csq =
            std::collections::BTreeSet::from_iter(ann_field.consequences.iter().cloned());
        if query_csq.intersection(&seqvar_csq).count() > 0 {
            return Ok(true);
        }
    }

    tracing::trace!(
        "variant {:?} fails consequence filter {:?}",
        &seqvar,
        &query.effects
    );
    Ok(false)
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use crate::query::schema::data::{AnnField, FeatureBiotype, VariantRecord};
    use crate::query::schema::query::{CaseQuery, VariantEffect};

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn passes_consequence(#[case] c_equals_csq: bool) -> Result<(), anyhow::Error> {
        for csq in VariantEffect::iter() {
            let query = CaseQuery {
                effects: VariantEffect::iter()
                    .filter(|c| (*c == csq) == c_equals_csq)
                    .collect(),
                ..Default::default()
            };
            let seqvar = VariantRecord {
                reference: "G".into(),
                alternative: "A".into(),
                ann_fields: vec![AnnField {
                    allele: "A".into(),
                    consequences: vec![csq],
                    ..Default::default()
                }],
                ..Default::default()
            };

            assert_eq!(
                super::passes(&query, &seqvar)?,
                c_equals_csq,
                "csq = {:?}",
                &csq
            );
        }

        Ok(())
    }

    #[rstest]
    // SNV kept when enabled
    #[case("A", "G", true, true, true, true)]
    // SNV dropped when disabled
    #[case("A", "G", false, true, true, false)]
    // indel dropped when disabled
    #[case("AT", "A", true, false, true, false)]
    // MNV dropped when disabled
    #[case("AT", "GC", true, true, false, false)]
    fn passes_var_type(
        #[case] reference: &str,
        #[case] alternative: &str,
        #[case] var_type_snv: bool,
        #[case] var_type_indel: bool,
        #[case] var_type_mnv: bool,
        #[case] expected: bool,
    ) -> Result<(), anyhow::Error> {
        let query = CaseQuery {
            var_type_snv,
            var_type_indel,
            var_type_mnv,
            ..Default::default()
        };
        let seqvar = VariantRecord {
            reference: reference.into(),
            alternative: alternative.into(),
            ann_fields: vec![AnnField {
                consequences: vec![VariantEffect::MissenseVariant],
                ..Default::default()
            }],
            ..Default::default()
        };

        assert_eq!(super::passes(&query, &seqvar)?, expected);

        Ok(())
    }

    #[rstest]
    // coding annotation needs transcripts_coding
    #[case(FeatureBiotype::Coding, true, false, true)]
    #[case(FeatureBiotype::Coding, false, true, false)]
    // non-coding annotation needs transcripts_noncoding
    #[case(FeatureBiotype::Noncoding, false, true, true)]
    #[case(FeatureBiotype::Noncoding, true, false, false)]
    fn passes_transcript_type(
        #[case] feature_biotype: FeatureBiotype,
        #[case] transcripts_coding: bool,
        #[case] transcripts_noncoding: bool,
        #[case] expected: bool,
    ) -> Result<(), anyhow::Error> {
        let query = CaseQuery {
            transcripts_coding,
            transcripts_noncoding,
            ..Default::default()
        };
        let seqvar = VariantRecord {
            reference: "G".into(),
            alternative: "A".into(),
            ann_fields: vec![AnnField {
                consequences: vec![VariantEffect::MissenseVariant],
                feature_biotype,
                ..Default::default()
            }],
            ..Default::default()
        };

        assert_eq!(super::passes(&query, &seqvar)?, expected);

        Ok(())
    }

    #[rstest]
    // within distance
    #[case(Some(50), Some(10), true)]
    // at distance
    #[case(Some(50), Some(50), true)]
    // beyond distance
    #[case(Some(50), Some(51), false)]
    // no threshold
    #[case(None, Some(1000), true)]
    // no annotation distance: unconstrained
    #[case(Some(50), None, true)]
    fn passes_max_exon_dist(
        #[case] max_exon_dist: Option<i32>,
        #[case] exon_dist: Option<i32>,
        #[case] expected: bool,
    ) -> Result<(), anyhow::Error> {
        let query = CaseQuery {
            max_exon_dist,
            ..Default::default()
        };
        let seqvar = VariantRecord {
            reference: "G".into(),
            alternative: "A".into(),
            ann_fields: vec![AnnField {
                consequences: vec![VariantEffect::MissenseVariant],
                exon_dist,
                ..Default::default()
            }],
            ..Default::default()
        };

        assert_eq!(super::passes(&query, &seqvar)?, expected);

        Ok(())
    }
}
