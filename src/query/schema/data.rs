//! Code for representing annotated variants internally, corresponds to what
//! the ingest step writes out.

use noodles_vcf as vcf;

use super::query::{ClinvarSignificance, VariantEffect};

/// Information on the call as written out by ingest.
///
/// Corresponds to `FORMAT/*` in VCF.  Note that the ingested files have
/// exactly one alternate allele.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CallInfo {
    /// The genotype, if applicable, e.g., "0/1", "./1", "."
    pub genotype: Option<String>,
    /// Genotype quality score, if applicable.
    pub gq: Option<f32>,
    /// Total read coverage at site in the sample.
    pub dp: Option<i32>,
    /// Alternate allele depth for the single allele in the sample.
    pub ad: Option<i32>,
    /// Physical phasing ID for this sample.
    pub ps: Option<i32>,
}

impl Eq for CallInfo {}

/// Trait for total allele counts.
pub trait An {
    /// Number of covered alleles.
    fn an(&self) -> i32;
}

/// Trait for variant alternate allele counts.
pub trait Ac {
    /// Number of homozygous/homoplasmic carriers.
    fn hom(&self) -> i32;
    /// Number of heterozygous/heteroplasmic carriers.
    fn het(&self) -> i32;
    /// Number of total alternate alleles.
    fn ac(&self) -> i32;
}

/// Trait for allele frequency.
pub trait Af {
    /// Allele frequency.
    fn af(&self) -> f32;
}

/// Blanket implementation of `Af` for any type that implements `Ac` and
/// `An`.
impl<T: Ac + An> Af for T {
    fn af(&self) -> f32 {
        if self.an() == 0 {
            0.0
        } else {
            self.ac() as f32 / self.an() as f32
        }
    }
}

/// Population frequencies for variants on nuclear chromosomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NuclearFrequencies {
    /// Number of alleles.
    pub an: i32,
    /// Number of homozygous carriers.
    pub hom: i32,
    /// Number of heterozygous carriers.
    pub het: i32,
    /// Number of hemizygous carriers.
    pub hemi: i32,
}

impl An for NuclearFrequencies {
    fn an(&self) -> i32 {
        self.an
    }
}

impl Ac for NuclearFrequencies {
    fn hom(&self) -> i32 {
        self.hom
    }
    fn het(&self) -> i32 {
        self.het
    }
    fn ac(&self) -> i32 {
        2 * self.hom + self.het + self.hemi
    }
}

/// Population frequencies for variants on the mitochondrial chromosome.
///
/// Mitochondrial databases report homoplasmic/heteroplasmic carriers, there
/// is no hemizygous count.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MitochondrialFrequencies {
    /// Number of alleles.
    pub an: i32,
    /// Number of homoplasmic carriers.
    pub hom: i32,
    /// Number of heteroplasmic carriers.
    pub het: i32,
}

impl An for MitochondrialFrequencies {
    fn an(&self) -> i32 {
        self.an
    }
}

impl Ac for MitochondrialFrequencies {
    fn hom(&self) -> i32 {
        self.hom
    }
    fn het(&self) -> i32 {
        self.het
    }
    fn ac(&self) -> i32 {
        self.hom + self.het
    }
}

/// In-house cohort counts.
///
/// The in-house database tracks the total carrier count explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InhouseFrequencies {
    /// Total number of carriers.
    pub carriers: i32,
    /// Number of homozygous carriers.
    pub hom: i32,
    /// Number of heterozygous carriers.
    pub het: i32,
    /// Number of hemizygous carriers.
    pub hemi: i32,
}

/// Transcript feature biotype in an `ANN` field.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum FeatureBiotype {
    /// Coding transcript.
    #[default]
    Coding,
    /// Non-coding transcript.
    Noncoding,
}

/// Supporting code for `AnnField`.
pub(crate) mod ann_field {
    /// Error type for `AnnField::from_str()`.
    #[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
    pub enum Error {
        #[error("ANN field has {0} columns, expected at least 15")]
        MissingColumns(usize),
        #[error("invalid consequence in ANN field: {0:?}")]
        InvalidConsequence(String),
        #[error("invalid feature biotype in ANN field: {0:?}")]
        InvalidFeatureBiotype(String),
        #[error("invalid distance in ANN field: {0:?}")]
        InvalidDistance(String),
    }
}

/// One entry of the `ANN` INFO field, one record per affected gene.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnnField {
    /// The alternate allele that the annotation refers to.
    pub allele: String,
    /// Predicted consequences, most severe first.
    pub consequences: Vec<VariantEffect>,
    /// Gene symbol, if any.
    pub gene_symbol: String,
    /// Gene identifier (HGNC ID), if any.
    pub gene_id: String,
    /// Biotype of the annotated feature.
    pub feature_biotype: FeatureBiotype,
    /// Distance to the next exon, if any.
    pub exon_dist: Option<i32>,
}

impl std::str::FromStr for AnnField {
    type Err = ann_field::Error;

    /// Parse from the pipe-separated `ANN` layout
    /// `Allele|Annotation|Impact|Gene_Name|Gene_ID|Feature_Type|Feature_ID|\
    ///  Transcript_BioType|Rank|HGVS.c|HGVS.p|cDNA.pos|CDS.pos|AA.pos|\
    ///  Distance|ERRORS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s.split('|').collect::<Vec<_>>();
        if fields.len() < 15 {
            return Err(ann_field::Error::MissingColumns(fields.len()));
        }
        let consequences = fields[1]
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<VariantEffect>()
                    .map_err(|_| ann_field::Error::InvalidConsequence(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let feature_biotype = if fields[7].is_empty() {
            FeatureBiotype::default()
        } else {
            fields[7]
                .parse::<FeatureBiotype>()
                .map_err(|_| ann_field::Error::InvalidFeatureBiotype(fields[7].to_string()))?
        };
        let exon_dist = if fields[14].is_empty() {
            None
        } else {
            Some(
                fields[14]
                    .parse::<i32>()
                    .map_err(|_| ann_field::Error::InvalidDistance(fields[14].to_string()))?,
            )
        };
        Ok(Self {
            allele: fields[0].to_string(),
            consequences,
            gene_symbol: fields[3].to_string(),
            gene_id: fields[4].to_string(),
            feature_biotype,
            exon_dist,
        })
    }
}

/// Variant types, derived from reference/alternative allele lengths.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
)]
pub enum VariantType {
    /// SNV.
    Snv,
    /// Indel.
    Indel,
    /// MNV.
    Mnv,
}

/// Definition of a sequence variant with per-sample genotype calls and
/// denormalized annotation, as written out by ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VariantRecord {
    /// Chromosome name.
    pub chrom: String,
    /// 1-based start position of the variant.
    pub pos: i32,
    /// Reference allele.
    pub reference: String,
    /// Alternative allele.
    pub alternative: String,

    /// gnomAD exomes frequencies (not for chrMT).
    pub gnomad_exomes: NuclearFrequencies,
    /// gnomAD genomes frequencies (also for chrMT).
    pub gnomad_genomes: NuclearFrequencies,
    /// HelixMtDb frequencies (only chrMT).
    pub helixmtdb: MitochondrialFrequencies,
    /// In-house cohort counts.
    pub inhouse: InhouseFrequencies,

    /// Transcript annotation, one field per gene.
    pub ann_fields: Vec<AnnField>,

    /// ClinVar germline classifications; the first entry is the aggregate
    /// classification, the remainder are per-submission classifications.
    pub clinvar: Vec<ClinvarSignificance>,

    /// Mapping of sample to genotype information for the variant.
    pub call_info: indexmap::IndexMap<String, CallInfo>,
}

impl VariantRecord {
    /// Classify the variant type from the allele lengths.
    pub fn variant_type(&self) -> VariantType {
        if self.reference.len() == 1 && self.alternative.len() == 1 {
            VariantType::Snv
        } else if self.reference.len() == self.alternative.len() {
            VariantType::Mnv
        } else {
            VariantType::Indel
        }
    }

    /// Return the 1-based inclusive end position of the variant.
    pub fn end(&self) -> i32 {
        self.pos + self.reference.len() as i32 - 1
    }

    /// Return the HGNC ID of the first annotation field, if any.
    pub fn hgnc_id(&self) -> Option<&str> {
        self.ann_fields
            .first()
            .map(|ann_field| ann_field.gene_id.as_str())
            .filter(|gene_id| !gene_id.is_empty())
    }

    /// Convert from VCF record.
    pub fn from_vcf(record: &vcf::Record, header: &vcf::Header) -> Result<Self, anyhow::Error> {
        let chrom = record.chromosome().to_string();
        let pos: usize = record.position().into();
        let pos = pos as i32;

        let reference = record.reference_bases().to_string();
        let alternative = record.alternate_bases()[0].to_string();

        let call_info = Self::build_call_info(record, header)?;
        let ann_fields = Self::build_ann_fields(record)?;
        let clinvar = Self::build_clinvar(record)?;

        let result = Self {
            chrom,
            pos,
            reference,
            alternative,
            ann_fields,
            clinvar,
            call_info,
            ..Default::default()
        };

        Self::copy_freqs(result, record)
    }

    /// Build call information.
    fn build_call_info(
        record: &vcf::Record,
        header: &vcf::Header,
    ) -> Result<indexmap::IndexMap<String, CallInfo>, anyhow::Error> {
        let mut result = indexmap::IndexMap::new();

        for (name, sample) in header
            .sample_names()
            .iter()
            .zip(record.genotypes().values())
        {
            let genotype = if let Some(Some(vcf::record::genotypes::sample::Value::String(gt))) =
                sample.get(&vcf::record::genotypes::keys::key::GENOTYPE)
            {
                Some(gt.clone())
            } else {
                None
            };
            let gq = if let Some(Some(vcf::record::genotypes::sample::Value::Integer(gq))) =
                sample.get(&vcf::record::genotypes::keys::key::CONDITIONAL_GENOTYPE_QUALITY)
            {
                Some(*gq as f32)
            } else {
                None
            };
            let dp = if let Some(Some(vcf::record::genotypes::sample::Value::Integer(dp))) =
                sample.get(&vcf::record::genotypes::keys::key::READ_DEPTH)
            {
                Some(*dp)
            } else {
                None
            };
            let ad = if let Some(Some(vcf::record::genotypes::sample::Value::Array(
                vcf::record::genotypes::sample::value::Array::Integer(ad),
            ))) = sample.get(&vcf::record::genotypes::keys::key::READ_DEPTHS)
            {
                ad.get(1).copied().flatten()
            } else {
                None
            };
            let ps = if let Some(Some(vcf::record::genotypes::sample::Value::Integer(ps))) =
                sample.get(&vcf::record::genotypes::keys::key::PHASE_SET)
            {
                Some(*ps)
            } else {
                None
            };

            result.insert(
                name.clone(),
                CallInfo {
                    genotype,
                    gq,
                    dp,
                    ad,
                    ps,
                },
            );
        }

        Ok(result)
    }

    /// Build the `ANN` annotation fields.
    fn build_ann_fields(record: &vcf::Record) -> Result<Vec<AnnField>, anyhow::Error> {
        use vcf::record::info::field::{Key, Value};

        let key = "ANN"
            .parse::<Key>()
            .map_err(|_| anyhow::anyhow!("could not parse key ANN"))?;
        match record.info().get(&key) {
            Some(Some(Value::Array(vcf::record::info::field::value::Array::String(values)))) => {
                values
                    .iter()
                    .flatten()
                    .map(|value| {
                        value
                            .parse::<AnnField>()
                            .map_err(|e| anyhow::anyhow!("problem parsing ANN field: {}", e))
                    })
                    .collect()
            }
            Some(Some(Value::String(value))) => Ok(vec![value
                .parse::<AnnField>()
                .map_err(|e| anyhow::anyhow!("problem parsing ANN field: {}", e))?]),
            _ => Ok(Vec::new()),
        }
    }

    /// Build the ClinVar classification list.
    fn build_clinvar(record: &vcf::Record) -> Result<Vec<ClinvarSignificance>, anyhow::Error> {
        use vcf::record::info::field::{Key, Value};

        let key = "clinvar"
            .parse::<Key>()
            .map_err(|_| anyhow::anyhow!("could not parse key clinvar"))?;
        let parse_one = |value: &str| {
            value
                .parse::<ClinvarSignificance>()
                .map_err(|_| anyhow::anyhow!("invalid ClinVar classification: {:?}", value))
        };
        match record.info().get(&key) {
            Some(Some(Value::Array(vcf::record::info::field::value::Array::String(values)))) => {
                values
                    .iter()
                    .flatten()
                    .map(|value| parse_one(value))
                    .collect()
            }
            Some(Some(Value::String(value))) => Ok(vec![parse_one(value)?]),
            _ => Ok(Vec::new()),
        }
    }

    /// Copy the frequencies from `record` to `result`.
    fn copy_freqs(
        result: VariantRecord,
        record: &vcf::Record,
    ) -> Result<VariantRecord, anyhow::Error> {
        use vcf::record::info::field::Key;
        use vcf::record::info::field::Value;

        macro_rules! extract_key {
            ($key:ident) => {
                let $key = if let Some(Some(Value::Integer($key))) = record.info().get(
                    &stringify!($key)
                        .parse::<Key>()
                        .map_err(|_| anyhow::anyhow!("could not parse key {}", stringify!($key)))?,
                ) {
                    *$key
                } else {
                    0
                };
            };
        }

        extract_key!(gnomad_exomes_an);
        extract_key!(gnomad_exomes_hom);
        extract_key!(gnomad_exomes_het);
        extract_key!(gnomad_exomes_hemi);

        extract_key!(gnomad_genomes_an);
        extract_key!(gnomad_genomes_hom);
        extract_key!(gnomad_genomes_het);
        extract_key!(gnomad_genomes_hemi);

        extract_key!(helix_an);
        extract_key!(helix_hom);
        extract_key!(helix_het);

        extract_key!(inhouse_carriers);
        extract_key!(inhouse_hom);
        extract_key!(inhouse_het);
        extract_key!(inhouse_hemi);

        Ok(VariantRecord {
            gnomad_exomes: NuclearFrequencies {
                an: gnomad_exomes_an,
                hom: gnomad_exomes_hom,
                het: gnomad_exomes_het,
                hemi: gnomad_exomes_hemi,
            },
            gnomad_genomes: NuclearFrequencies {
                an: gnomad_genomes_an,
                hom: gnomad_genomes_hom,
                het: gnomad_genomes_het,
                hemi: gnomad_genomes_hemi,
            },
            helixmtdb: MitochondrialFrequencies {
                an: helix_an,
                hom: helix_hom,
                het: helix_het,
            },
            inhouse: InhouseFrequencies {
                carriers: inhouse_carriers,
                hom: inhouse_hom,
                het: inhouse_het,
                hemi: inhouse_hemi,
            },
            ..result
        })
    }
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::super::query::VariantEffect;
    use super::{
        Af as _, AnnField, CallInfo, FeatureBiotype, NuclearFrequencies, VariantRecord, VariantType,
    };

    /// Build a `VariantRecord` with the given coordinates, gene, and
    /// genotypes.
    pub fn record_with_genotypes(
        chrom: &str,
        pos: i32,
        reference: &str,
        alternative: &str,
        gene_id: &str,
        genotypes: &[(&str, &str)],
    ) -> VariantRecord {
        VariantRecord {
            chrom: chrom.to_string(),
            pos,
            reference: reference.to_string(),
            alternative: alternative.to_string(),
            ann_fields: vec![AnnField {
                allele: alternative.to_string(),
                consequences: vec![VariantEffect::MissenseVariant],
                gene_symbol: format!("GENE-{}", gene_id),
                gene_id: gene_id.to_string(),
                feature_biotype: FeatureBiotype::Coding,
                exon_dist: Some(0),
            }],
            call_info: genotypes
                .iter()
                .map(|(sample, gt)| {
                    (
                        sample.to_string(),
                        CallInfo {
                            genotype: Some(gt.to_string()),
                            ..Default::default()
                        },
                    )
                })
                .collect(),
            ..Default::default()
        }
    }

    #[rstest]
    #[case("A", "G", super::VariantType::Snv)]
    #[case("AT", "A", super::VariantType::Indel)]
    #[case("A", "AT", super::VariantType::Indel)]
    #[case("AT", "GC", super::VariantType::Mnv)]
    fn variant_type(
        #[case] reference: &str,
        #[case] alternative: &str,
        #[case] expected: super::VariantType,
    ) {
        let record = VariantRecord {
            reference: reference.to_string(),
            alternative: alternative.to_string(),
            ..Default::default()
        };

        assert_eq!(record.variant_type(), expected);
    }

    #[test]
    fn end_position_spans_reference() {
        let record = VariantRecord {
            pos: 100,
            reference: "ATGC".to_string(),
            alternative: "A".to_string(),
            ..Default::default()
        };

        assert_eq!(record.end(), 103);
    }

    #[test]
    fn nuclear_af_counts_hom_twice() {
        let freqs = NuclearFrequencies {
            an: 1000,
            hom: 2,
            het: 3,
            hemi: 1,
        };

        assert!(float_cmp::approx_eq!(f32, freqs.af(), 0.008, ulps = 2));
    }

    #[test]
    fn af_with_zero_an_is_zero() {
        let freqs = NuclearFrequencies::default();

        assert!(float_cmp::approx_eq!(f32, freqs.af(), 0.0, ulps = 2));
    }

    #[test]
    fn ann_field_from_str() {
        let text = "A|missense_variant&splice_region_variant|MODERATE|BRCA1|HGNC:1100|\
                    transcript|NM_007294.4|Coding|10/23|c.181T>G|p.Cys61Gly|181/5592|\
                    181/5592|61/1863|0|";

        let ann_field: AnnField = text.parse().unwrap();

        assert_eq!(
            ann_field,
            AnnField {
                allele: "A".to_string(),
                consequences: vec![
                    VariantEffect::MissenseVariant,
                    VariantEffect::SpliceRegionVariant
                ],
                gene_symbol: "BRCA1".to_string(),
                gene_id: "HGNC:1100".to_string(),
                feature_biotype: FeatureBiotype::Coding,
                exon_dist: Some(0),
            }
        );
    }

    #[test]
    fn ann_field_from_str_empty_distance() {
        let text = "A|intergenic_variant||||||||||||||";

        let ann_field: AnnField = text.parse().unwrap();

        assert_eq!(ann_field.exon_dist, None);
        assert_eq!(ann_field.feature_biotype, FeatureBiotype::Coding);
    }

    #[test]
    fn ann_field_from_str_rejects_unknown_consequence() {
        let text = "A|not_a_consequence|||||||||||||0|";

        assert!(text.parse::<AnnField>().is_err());
    }
}
