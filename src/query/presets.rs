//! Category and quick presets for query construction.
//!
//! A quick preset is a named bundle of six category presets (inheritance,
//! frequency, impact, quality, chromosomes, flags etc.).  Resolving a quick
//! preset expands each category into concrete field values on a fresh
//! `CaseQuery`.  Precedence is: field-level overrides beat category preset
//! expansion beats quick preset defaults.

use indexmap::IndexMap;

use crate::ped::{Disease, Pedigree};
use crate::query::interpreter::genotype::expand_recessive_markers;
use crate::query::schema::query::{
    CaseQuery, ClinvarSettings, FailChoice, GenomicRegion, GenotypeChoice,
    InhouseFrequencySettings, MitochondrialFrequencySettings, NuclearFrequencySettings,
    QualitySettings, RecessiveMode, VariantEffect,
};

/// Inheritance category presets.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InheritancePreset {
    /// No genotype constraints.
    #[default]
    Any,
    /// De novo variants in the index.
    DeNovo,
    /// Dominant inheritance.
    Dominant,
    /// Homozygous recessive inheritance.
    HomozygousRecessive,
    /// Compound heterozygous inheritance.
    CompoundHeterozygous,
    /// Recessive inheritance.
    Recessive,
    /// X-linked recessive inheritance.
    XRecessive,
    /// All affected individuals carry the variant.
    AffectedCarriers,
}

/// Frequency category presets.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FrequencyPreset {
    /// No frequency filtration.
    #[default]
    Any,
    /// Super strict dominant thresholds.
    DominantSuperStrict,
    /// Strict dominant thresholds.
    DominantStrict,
    /// Relaxed dominant thresholds.
    DominantRelaxed,
    /// Strict recessive thresholds.
    RecessiveStrict,
    /// Relaxed recessive thresholds.
    RecessiveRelaxed,
}

/// Impact category presets.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImpactPreset {
    /// Null variants only.
    NullVariant,
    /// Amino acid changes and splicing.
    #[default]
    AaChangeSplicing,
    /// All coding variants and deep intronic ones.
    AllCodingDeepIntronic,
    /// Everything on a transcript.
    WholeTranscript,
    /// No impact filtration.
    Any,
}

/// Quality category presets.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QualityPreset {
    /// Super strict quality thresholds.
    SuperStrict,
    /// Strict quality thresholds.
    #[default]
    Strict,
    /// Relaxed quality thresholds.
    Relaxed,
    /// No quality thresholds.
    Ignore,
}

/// Chromosomes category presets.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChromosomesPreset {
    /// Whole genome.
    #[default]
    WholeGenome,
    /// Autosomes only.
    Autosomes,
    /// X chromosome only.
    XChromosome,
    /// Y chromosome only.
    YChromosome,
    /// Mitochondrial chromosome only.
    MtChromosome,
}

/// "Flags etc." category presets.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlagsEtcPreset {
    /// Default settings, ClinVar not required.
    #[default]
    Defaults,
    /// Require ClinVar membership, benign classifications excluded.
    ClinvarOnly,
    /// Like `ClinvarOnly` for (likely) pathogenic, also consulting
    /// per-submission classifications.
    ClinvarParanoid,
}

impl InheritancePreset {
    /// Apply the preset to the query, filling the per-sample genotype map
    /// from the pedigree.
    ///
    /// For the recessive presets this designates the index and runs the
    /// pedigree-aware marker expansion.
    fn apply(
        &self,
        query: CaseQuery,
        pedigree: &Pedigree,
        index: &str,
    ) -> Result<CaseQuery, crate::query::interpreter::compilation::Error> {
        let mut result = query;
        result.recessive_mode = None;
        result.recessive_index = None;
        let father = pedigree.father_of(index).map(|i| i.name.clone());
        let mother = pedigree.mother_of(index).map(|i| i.name.clone());
        for (name, individual) in &pedigree.individuals {
            let choice = match self {
                InheritancePreset::Any => GenotypeChoice::Any,
                InheritancePreset::DeNovo => {
                    if name == index {
                        GenotypeChoice::Het
                    } else if Some(name.clone()) == father || Some(name.clone()) == mother {
                        GenotypeChoice::Ref
                    } else {
                        GenotypeChoice::Any
                    }
                }
                InheritancePreset::Dominant => match individual.disease {
                    Disease::Affected => GenotypeChoice::Het,
                    Disease::Unaffected => GenotypeChoice::Ref,
                    Disease::Unknown => GenotypeChoice::Any,
                },
                InheritancePreset::AffectedCarriers => match individual.disease {
                    Disease::Affected => GenotypeChoice::Variant,
                    _ => GenotypeChoice::Any,
                },
                // The recessive presets start from unconstrained samples;
                // the marker expansion below fills in the structure.
                InheritancePreset::HomozygousRecessive
                | InheritancePreset::CompoundHeterozygous
                | InheritancePreset::Recessive
                | InheritancePreset::XRecessive => GenotypeChoice::Any,
            };
            result.genotype.insert(name.clone(), Some(choice));
        }
        match self {
            InheritancePreset::HomozygousRecessive
            | InheritancePreset::Recessive
            | InheritancePreset::XRecessive => {
                result.recessive_mode = Some(RecessiveMode::Recessive);
                result.recessive_index = Some(index.to_string());
                result = expand_recessive_markers(&result, pedigree)?;
            }
            InheritancePreset::CompoundHeterozygous => {
                result.recessive_mode = Some(RecessiveMode::CompoundRecessive);
                result.recessive_index = Some(index.to_string());
                result = expand_recessive_markers(&result, pedigree)?;
            }
            _ => (),
        }
        Ok(result)
    }
}

impl FrequencyPreset {
    /// Apply the preset's thresholds to the query.
    fn apply(&self, query: CaseQuery) -> CaseQuery {
        let mut result = query;
        let nuclear = |frequency: f32, het: i32, hom: Option<i32>| NuclearFrequencySettings {
            enabled: true,
            frequency: Some(frequency),
            heterozygous: Some(het),
            homozygous: hom,
            hemizygous: None,
        };
        let mito = |frequency: f32, hom: i32| MitochondrialFrequencySettings {
            enabled: true,
            frequency: Some(frequency),
            heteroplasmic: None,
            homoplasmic: Some(hom),
        };
        let inhouse = |carriers: i32| InhouseFrequencySettings {
            enabled: true,
            carriers: Some(carriers),
            heterozygous: None,
            homozygous: None,
            hemizygous: None,
        };
        result.frequency = match self {
            FrequencyPreset::Any => Default::default(),
            FrequencyPreset::DominantSuperStrict => crate::query::schema::query::QuerySettingsFrequency {
                gnomad_exomes: nuclear(0.002, 1, Some(0)),
                gnomad_genomes: nuclear(0.002, 1, Some(0)),
                helixmtdb: mito(0.01, 2),
                inhouse: inhouse(20),
            },
            FrequencyPreset::DominantStrict => crate::query::schema::query::QuerySettingsFrequency {
                gnomad_exomes: nuclear(0.002, 4, Some(0)),
                gnomad_genomes: nuclear(0.002, 4, Some(0)),
                helixmtdb: mito(0.01, 2),
                inhouse: inhouse(20),
            },
            FrequencyPreset::DominantRelaxed => crate::query::schema::query::QuerySettingsFrequency {
                gnomad_exomes: nuclear(0.01, 10, Some(0)),
                gnomad_genomes: nuclear(0.01, 10, Some(0)),
                helixmtdb: mito(0.15, 4),
                inhouse: inhouse(20),
            },
            FrequencyPreset::RecessiveStrict => crate::query::schema::query::QuerySettingsFrequency {
                gnomad_exomes: nuclear(0.001, 24, Some(0)),
                gnomad_genomes: nuclear(0.001, 24, Some(0)),
                helixmtdb: mito(0.01, 2),
                inhouse: inhouse(20),
            },
            FrequencyPreset::RecessiveRelaxed => crate::query::schema::query::QuerySettingsFrequency {
                gnomad_exomes: nuclear(0.01, 60, Some(4)),
                gnomad_genomes: nuclear(0.01, 60, Some(4)),
                helixmtdb: mito(0.15, 4),
                inhouse: inhouse(20),
            },
        };
        result
    }
}

impl ImpactPreset {
    /// The effects of null variants.
    fn null_variant_effects() -> Vec<VariantEffect> {
        vec![
            VariantEffect::TranscriptAblation,
            VariantEffect::ExonLossVariant,
            VariantEffect::SpliceAcceptorVariant,
            VariantEffect::SpliceDonorVariant,
            VariantEffect::StopGained,
            VariantEffect::FrameshiftVariant,
            VariantEffect::FrameshiftElongation,
            VariantEffect::FrameshiftTruncation,
            VariantEffect::StopLost,
            VariantEffect::StartLost,
            VariantEffect::FeatureTruncation,
            VariantEffect::StructuralVariant,
        ]
    }

    /// The additional effects of amino acid changes and splicing.
    fn aa_change_splicing_effects() -> Vec<VariantEffect> {
        vec![
            VariantEffect::MissenseVariant,
            VariantEffect::Mnv,
            VariantEffect::ComplexSubstitution,
            VariantEffect::InframeDeletion,
            VariantEffect::InframeInsertion,
            VariantEffect::DisruptiveInframeDeletion,
            VariantEffect::DisruptiveInframeInsertion,
            VariantEffect::DirectTandemDuplication,
            VariantEffect::InternalFeatureElongation,
            VariantEffect::SpliceRegionVariant,
        ]
    }

    /// Apply the preset's effect and transcript settings to the query.
    fn apply(&self, query: CaseQuery) -> CaseQuery {
        let mut result = query;
        match self {
            ImpactPreset::NullVariant => {
                result.effects = Self::null_variant_effects();
                result.transcripts_coding = true;
                result.transcripts_noncoding = false;
                result.max_exon_dist = None;
            }
            ImpactPreset::AaChangeSplicing => {
                let mut effects = Self::null_variant_effects();
                effects.extend(Self::aa_change_splicing_effects());
                result.effects = effects;
                result.transcripts_coding = true;
                result.transcripts_noncoding = false;
                result.max_exon_dist = None;
            }
            ImpactPreset::AllCodingDeepIntronic => {
                let mut effects = Self::null_variant_effects();
                effects.extend(Self::aa_change_splicing_effects());
                effects.extend(vec![
                    VariantEffect::SynonymousVariant,
                    VariantEffect::StopRetainedVariant,
                    VariantEffect::CodingTranscriptIntronVariant,
                ]);
                result.effects = effects;
                result.transcripts_coding = true;
                result.transcripts_noncoding = false;
                result.max_exon_dist = None;
            }
            ImpactPreset::WholeTranscript => {
                let mut effects = Self::null_variant_effects();
                effects.extend(Self::aa_change_splicing_effects());
                effects.extend(vec![
                    VariantEffect::SynonymousVariant,
                    VariantEffect::StopRetainedVariant,
                    VariantEffect::CodingTranscriptIntronVariant,
                    VariantEffect::ThreePrimeUtrExonVariant,
                    VariantEffect::ThreePrimeUtrIntronVariant,
                    VariantEffect::FivePrimeUtrExonVariant,
                    VariantEffect::FivePrimeUtrIntronVariant,
                    VariantEffect::NonCodingTranscriptExonVariant,
                    VariantEffect::NonCodingTranscriptIntronVariant,
                    VariantEffect::UpstreamGeneVariant,
                    VariantEffect::DownstreamGeneVariant,
                ]);
                result.effects = effects;
                result.transcripts_coding = true;
                result.transcripts_noncoding = true;
                result.max_exon_dist = None;
            }
            ImpactPreset::Any => {
                result.effects = VariantEffect::all();
                result.transcripts_coding = true;
                result.transcripts_noncoding = true;
                result.max_exon_dist = None;
            }
        }
        result
    }
}

impl QualityPreset {
    /// The per-sample settings of this preset.
    fn settings(&self) -> QualitySettings {
        match self {
            QualityPreset::SuperStrict => QualitySettings {
                dp_het: Some(10),
                dp_hom: Some(5),
                gq: Some(30),
                ab: Some(0.3),
                ad: Some(3),
                ad_max: None,
                fail: FailChoice::Drop,
            },
            QualityPreset::Strict => QualitySettings {
                dp_het: Some(10),
                dp_hom: Some(5),
                gq: Some(10),
                ab: Some(0.2),
                ad: Some(3),
                ad_max: None,
                fail: FailChoice::Drop,
            },
            QualityPreset::Relaxed => QualitySettings {
                dp_het: Some(8),
                dp_hom: Some(4),
                gq: Some(10),
                ab: Some(0.1),
                ad: Some(2),
                ad_max: None,
                fail: FailChoice::Drop,
            },
            QualityPreset::Ignore => QualitySettings {
                fail: FailChoice::Ignore,
                ..Default::default()
            },
        }
    }

    /// Apply the preset to the query, one entry per pedigree member.
    fn apply(&self, query: CaseQuery, pedigree: &Pedigree) -> CaseQuery {
        let mut result = query;
        result.quality = pedigree
            .sample_names()
            .into_iter()
            .map(|name| (name, self.settings()))
            .collect();
        result
    }
}

impl ChromosomesPreset {
    /// Apply the preset's genomic regions to the query.
    fn apply(&self, query: CaseQuery) -> CaseQuery {
        let mut result = query;
        result.genomic_regions = match self {
            ChromosomesPreset::WholeGenome => None,
            ChromosomesPreset::Autosomes => Some(
                (1..=22)
                    .map(|chrom| GenomicRegion::whole_chrom(&chrom.to_string()))
                    .collect(),
            ),
            ChromosomesPreset::XChromosome => Some(vec![GenomicRegion::whole_chrom("X")]),
            ChromosomesPreset::YChromosome => Some(vec![GenomicRegion::whole_chrom("Y")]),
            ChromosomesPreset::MtChromosome => Some(vec![GenomicRegion::whole_chrom("MT")]),
        };
        result
    }
}

impl FlagsEtcPreset {
    /// Apply the preset's ClinVar settings to the query.
    fn apply(&self, query: CaseQuery) -> CaseQuery {
        let mut result = query;
        result.clinvar = match self {
            FlagsEtcPreset::Defaults => ClinvarSettings::default(),
            FlagsEtcPreset::ClinvarOnly => ClinvarSettings {
                require_in_clinvar: true,
                include_benign: false,
                include_likely_benign: false,
                include_uncertain_significance: true,
                include_likely_pathogenic: true,
                include_pathogenic: true,
                paranoid_mode: false,
            },
            FlagsEtcPreset::ClinvarParanoid => ClinvarSettings {
                require_in_clinvar: true,
                include_benign: false,
                include_likely_benign: false,
                include_uncertain_significance: false,
                include_likely_pathogenic: true,
                include_pathogenic: true,
                paranoid_mode: true,
            },
        };
        result
    }
}

/// A quick preset: one selection per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuickPreset {
    /// Inheritance category selection.
    pub inheritance: InheritancePreset,
    /// Frequency category selection.
    pub frequency: FrequencyPreset,
    /// Impact category selection.
    pub impact: ImpactPreset,
    /// Quality category selection.
    pub quality: QualityPreset,
    /// Chromosomes category selection.
    pub chromosomes: ChromosomesPreset,
    /// Flags etc. category selection.
    pub flags_etc: FlagsEtcPreset,
}

/// Return the registry of named quick presets.
pub fn quick_presets() -> IndexMap<String, QuickPreset> {
    use ChromosomesPreset as C;
    use FlagsEtcPreset as Fl;
    use FrequencyPreset as F;
    use ImpactPreset as Im;
    use InheritancePreset as In;
    use QualityPreset as Q;

    let entry = |inheritance, frequency, impact, quality, chromosomes, flags_etc| QuickPreset {
        inheritance,
        frequency,
        impact,
        quality,
        chromosomes,
        flags_etc,
    };
    IndexMap::from([
        (
            "defaults".to_string(),
            entry(In::Any, F::DominantStrict, Im::AaChangeSplicing, Q::Strict, C::WholeGenome, Fl::Defaults),
        ),
        (
            "de_novo".to_string(),
            entry(In::DeNovo, F::DominantSuperStrict, Im::AaChangeSplicing, Q::SuperStrict, C::WholeGenome, Fl::Defaults),
        ),
        (
            "dominant".to_string(),
            entry(In::Dominant, F::DominantStrict, Im::AaChangeSplicing, Q::Strict, C::WholeGenome, Fl::Defaults),
        ),
        (
            "homozygous_recessive".to_string(),
            entry(In::HomozygousRecessive, F::RecessiveStrict, Im::AaChangeSplicing, Q::Strict, C::WholeGenome, Fl::Defaults),
        ),
        (
            "compound_heterozygous".to_string(),
            entry(In::CompoundHeterozygous, F::RecessiveStrict, Im::AaChangeSplicing, Q::Strict, C::WholeGenome, Fl::Defaults),
        ),
        (
            "recessive".to_string(),
            entry(In::Recessive, F::RecessiveStrict, Im::AaChangeSplicing, Q::Strict, C::WholeGenome, Fl::Defaults),
        ),
        (
            "x_recessive".to_string(),
            entry(In::XRecessive, F::RecessiveStrict, Im::AaChangeSplicing, Q::Strict, C::XChromosome, Fl::Defaults),
        ),
        (
            "clinvar_pathogenic".to_string(),
            entry(In::AffectedCarriers, F::Any, Im::Any, Q::Ignore, C::WholeGenome, Fl::ClinvarOnly),
        ),
        (
            "mitochondrial".to_string(),
            entry(In::AffectedCarriers, F::DominantStrict, Im::Any, Q::Strict, C::MtChromosome, Fl::Defaults),
        ),
        (
            "whole_exome".to_string(),
            entry(In::Any, F::Any, Im::Any, Q::Ignore, C::WholeGenome, Fl::Defaults),
        ),
    ])
}

/// Per-category and field-level overrides for `resolve`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PresetOverrides {
    /// Inheritance category override.
    pub inheritance: Option<InheritancePreset>,
    /// Frequency category override.
    pub frequency: Option<FrequencyPreset>,
    /// Impact category override.
    pub impact: Option<ImpactPreset>,
    /// Quality category override.
    pub quality: Option<QualityPreset>,
    /// Chromosomes category override.
    pub chromosomes: Option<ChromosomesPreset>,
    /// Flags etc. category override.
    pub flags_etc: Option<FlagsEtcPreset>,
    /// Field-level overrides, merged onto the expanded query document last
    /// and therefore winning over any preset expansion.
    pub fields: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Supporting code for `resolve`.
pub mod resolver {
    /// Error type for `resolve()`.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("unknown quick preset: {0:?}")]
        PresetNotFound(String),
        #[error("no index sample could be determined from the pedigree")]
        NoIndexSample,
        #[error("problem expanding inheritance preset: {0}")]
        Expansion(#[from] crate::query::interpreter::compilation::Error),
        #[error("problem applying field-level overrides: {0}")]
        FieldOverrides(#[from] serde_json::Error),
    }
}

/// Pick the default index sample: the first affected individual with
/// genotype data, falling back to the first individual with genotype data.
fn default_index(pedigree: &Pedigree) -> Option<String> {
    pedigree
        .individuals
        .values()
        .find(|individual| individual.disease == Disease::Affected && individual.has_gt_data)
        .or_else(|| {
            pedigree
                .individuals
                .values()
                .find(|individual| individual.has_gt_data)
        })
        .map(|individual| individual.name.clone())
}

/// Resolve a quick preset into a concrete `CaseQuery`.
///
/// The resolver is pure: the same inputs always produce the same query.  No
/// state is persisted.
///
/// # Errors
///
/// * `PresetNotFound` for unknown quick preset names.
/// * `NoIndexSample` when the pedigree has no usable index sample.
/// * Expansion/override errors are passed through.
pub fn resolve(
    quick_preset_name: &str,
    overrides: &PresetOverrides,
    pedigree: &Pedigree,
    index: Option<&str>,
) -> Result<CaseQuery, resolver::Error> {
    let quick_preset = quick_presets()
        .get(quick_preset_name)
        .copied()
        .ok_or_else(|| resolver::Error::PresetNotFound(quick_preset_name.to_string()))?;

    let inheritance = overrides.inheritance.unwrap_or(quick_preset.inheritance);
    let frequency = overrides.frequency.unwrap_or(quick_preset.frequency);
    let impact = overrides.impact.unwrap_or(quick_preset.impact);
    let quality = overrides.quality.unwrap_or(quick_preset.quality);
    let chromosomes = overrides.chromosomes.unwrap_or(quick_preset.chromosomes);
    let flags_etc = overrides.flags_etc.unwrap_or(quick_preset.flags_etc);

    let index = index
        .map(|s| s.to_string())
        .or_else(|| default_index(pedigree))
        .ok_or(resolver::Error::NoIndexSample)?;

    let query = CaseQuery::default();
    let query = quality.apply(query, pedigree);
    let query = inheritance.apply(query, pedigree, &index)?;
    let query = frequency.apply(query);
    let query = impact.apply(query);
    let query = chromosomes.apply(query);
    let query = flags_etc.apply(query);

    if let Some(fields) = &overrides.fields {
        let mut value = serde_json::to_value(&query)?;
        if let Some(object) = value.as_object_mut() {
            for (key, field_value) in fields {
                object.insert(key.clone(), field_value.clone());
            }
        }
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(query)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{resolve, InheritancePreset, PresetOverrides, QualityPreset};
    use crate::query::schema::query::{FailChoice, GenotypeChoice, RecessiveMode};

    #[test]
    fn resolve_unknown_preset_fails() {
        let pedigree = crate::ped::test::trio();

        let res = resolve("no_such_preset", &Default::default(), &pedigree, None);

        assert!(matches!(
            res,
            Err(super::resolver::Error::PresetNotFound(_))
        ));
    }

    #[test]
    fn resolve_defaults_fills_all_samples() {
        let pedigree = crate::ped::test::trio();

        let query = resolve("defaults", &Default::default(), &pedigree, None).unwrap();

        assert_eq!(
            query.quality.keys().cloned().collect::<Vec<_>>(),
            pedigree.sample_names()
        );
        assert_eq!(
            query.genotype.keys().cloned().collect::<Vec<_>>(),
            pedigree.sample_names()
        );
        assert_eq!(query.recessive_mode, None);
        assert!(query.frequency.gnomad_exomes.enabled);
    }

    #[test]
    fn resolve_compound_heterozygous_designates_index() {
        let pedigree = crate::ped::test::trio();

        let query =
            resolve("compound_heterozygous", &Default::default(), &pedigree, None).unwrap();

        assert_eq!(query.recessive_mode, Some(RecessiveMode::CompoundRecessive));
        assert_eq!(query.recessive_index.as_deref(), Some("index"));
        assert_eq!(
            query.genotype["index"],
            Some(GenotypeChoice::ComphetIndex)
        );
        assert_eq!(
            query.genotype["father"],
            Some(GenotypeChoice::RecessiveParent)
        );
    }

    #[test]
    fn resolve_de_novo_constrains_parents() {
        let pedigree = crate::ped::test::trio();

        let query = resolve("de_novo", &Default::default(), &pedigree, None).unwrap();

        assert_eq!(query.genotype["index"], Some(GenotypeChoice::Het));
        assert_eq!(query.genotype["father"], Some(GenotypeChoice::Ref));
        assert_eq!(query.genotype["mother"], Some(GenotypeChoice::Ref));
    }

    #[test]
    fn resolve_x_recessive_limits_regions() {
        let pedigree = crate::ped::test::trio();

        let query = resolve("x_recessive", &Default::default(), &pedigree, None).unwrap();

        let regions = query.genomic_regions.unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].chrom, "X");
        assert_eq!(regions[0].range, None);
    }

    #[test]
    fn resolve_category_override_beats_quick_preset() {
        let pedigree = crate::ped::test::trio();
        let overrides = PresetOverrides {
            quality: Some(QualityPreset::Ignore),
            ..Default::default()
        };

        let query = resolve("defaults", &overrides, &pedigree, None).unwrap();

        assert_eq!(query.quality["index"].fail, FailChoice::Ignore);
        assert_eq!(query.quality["index"].dp_het, None);
    }

    #[test]
    fn resolve_field_override_beats_category_expansion() {
        let pedigree = crate::ped::test::trio();
        let mut fields = serde_json::Map::new();
        fields.insert("max_exon_dist".into(), serde_json::json!(33));
        fields.insert("result_row_limit".into(), serde_json::json!(42));
        let overrides = PresetOverrides {
            fields: Some(fields),
            ..Default::default()
        };

        let query = resolve("defaults", &overrides, &pedigree, None).unwrap();

        // The impact category expansion sets max_exon_dist to None, the
        // field-level override must win regardless.
        assert_eq!(query.max_exon_dist, Some(33));
        assert_eq!(query.result_row_limit, 42);
    }

    #[rstest]
    #[case("defaults")]
    #[case("de_novo")]
    #[case("dominant")]
    #[case("homozygous_recessive")]
    #[case("compound_heterozygous")]
    #[case("recessive")]
    #[case("x_recessive")]
    #[case("clinvar_pathogenic")]
    #[case("mitochondrial")]
    #[case("whole_exome")]
    fn resolve_is_pure(#[case] name: &str) {
        let pedigree = crate::ped::test::trio();

        let first = resolve(name, &Default::default(), &pedigree, None).unwrap();
        let second = resolve(name, &Default::default(), &pedigree, None).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn resolved_queries_validate_against_pedigree() {
        let pedigree = crate::ped::test::trio();
        let gene_db = crate::genes::test::example_db();

        for name in super::quick_presets().keys() {
            let query = resolve(name, &Default::default(), &pedigree, None).unwrap();
            assert_eq!(
                query.validate(&pedigree, &gene_db),
                Ok(()),
                "preset = {}",
                name
            );
        }
    }

    #[test]
    fn resolve_inheritance_override_switches_mode() {
        let pedigree = crate::ped::test::trio();
        let overrides = PresetOverrides {
            inheritance: Some(InheritancePreset::HomozygousRecessive),
            ..Default::default()
        };

        let query = resolve("defaults", &overrides, &pedigree, None).unwrap();

        assert_eq!(query.recessive_mode, Some(RecessiveMode::Recessive));
        assert_eq!(
            query.genotype["index"],
            Some(GenotypeChoice::RecessiveIndex)
        );
    }
}
