//! Code for representing query definitions.
//!
//! Queries are stored as versioned JSON documents.  After deserialization
//! (and a possible schema upgrade on read), they are represented by the
//! data structures defined here.  A `CaseQuery` is immutable once
//! validated; every transformation produces a new value.

use std::collections::HashSet;

use strum::IntoEnumIterator;

use crate::common::canonical_chrom;
use crate::genes::GeneDb;
use crate::ped::Pedigree;

/// Transcript annotation database to evaluate a query against.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Database {
    /// RefSeq transcripts.
    #[default]
    RefSeq,
    /// ENSEMBL transcripts.
    Ensembl,
}

/// Variant effects.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Clone,
    Copy,
    strum::EnumIter,
    strum::EnumString,
    strum::Display,
)]
pub enum VariantEffect {
    /// 3' UTR exon variant.
    #[serde(rename = "3_prime_UTR_exon_variant")]
    #[strum(serialize = "3_prime_UTR_exon_variant")]
    ThreePrimeUtrExonVariant,
    /// 3' UTR intron variant.
    #[serde(rename = "3_prime_UTR_intron_variant")]
    #[strum(serialize = "3_prime_UTR_intron_variant")]
    ThreePrimeUtrIntronVariant,
    /// 5' UTR exon variant.
    #[serde(rename = "5_prime_UTR_exon_variant")]
    #[strum(serialize = "5_prime_UTR_exon_variant")]
    FivePrimeUtrExonVariant,
    /// 5' UTR intron variant.
    #[serde(rename = "5_prime_UTR_intron_variant")]
    #[strum(serialize = "5_prime_UTR_intron_variant")]
    FivePrimeUtrIntronVariant,
    /// Coding transcript intron variant.
    #[serde(rename = "coding_transcript_intron_variant")]
    #[strum(serialize = "coding_transcript_intron_variant")]
    CodingTranscriptIntronVariant,
    /// Complex substitution.
    #[serde(rename = "complex_substitution")]
    #[strum(serialize = "complex_substitution")]
    ComplexSubstitution,
    /// Direct tandem duplication.
    #[serde(rename = "direct_tandem_duplication")]
    #[strum(serialize = "direct_tandem_duplication")]
    DirectTandemDuplication,
    /// Disruptive in-frame deletion.
    #[serde(rename = "disruptive_inframe_deletion")]
    #[strum(serialize = "disruptive_inframe_deletion")]
    DisruptiveInframeDeletion,
    /// Disruptive in-frame insertion.
    #[serde(rename = "disruptive_inframe_insertion")]
    #[strum(serialize = "disruptive_inframe_insertion")]
    DisruptiveInframeInsertion,
    /// Downstream gene variant.
    #[serde(rename = "downstream_gene_variant")]
    #[strum(serialize = "downstream_gene_variant")]
    DownstreamGeneVariant,
    /// Exon loss variant.
    #[serde(rename = "exon_loss_variant")]
    #[strum(serialize = "exon_loss_variant")]
    ExonLossVariant,
    /// Feature truncation.
    #[serde(rename = "feature_truncation")]
    #[strum(serialize = "feature_truncation")]
    FeatureTruncation,
    /// Frameshift elongation.
    #[serde(rename = "frameshift_elongation")]
    #[strum(serialize = "frameshift_elongation")]
    FrameshiftElongation,
    /// Frameshift truncation.
    #[serde(rename = "frameshift_truncation")]
    #[strum(serialize = "frameshift_truncation")]
    FrameshiftTruncation,
    /// Frameshift variant.
    #[serde(rename = "frameshift_variant")]
    #[strum(serialize = "frameshift_variant")]
    FrameshiftVariant,
    /// In-frame deletion.
    #[serde(rename = "inframe_deletion")]
    #[strum(serialize = "inframe_deletion")]
    InframeDeletion,
    /// In-frame insertion.
    #[serde(rename = "inframe_insertion")]
    #[strum(serialize = "inframe_insertion")]
    InframeInsertion,
    /// Intergenic variant.
    #[serde(rename = "intergenic_variant")]
    #[strum(serialize = "intergenic_variant")]
    IntergenicVariant,
    /// Internal feature elongation.
    #[serde(rename = "internal_feature_elongation")]
    #[strum(serialize = "internal_feature_elongation")]
    InternalFeatureElongation,
    /// Missense variant.
    #[serde(rename = "missense_variant")]
    #[strum(serialize = "missense_variant")]
    MissenseVariant,
    /// MNV.
    #[serde(rename = "mnv")]
    #[strum(serialize = "mnv")]
    Mnv,
    /// Non-coding transcript exon variant.
    #[serde(rename = "non_coding_transcript_exon_variant")]
    #[strum(serialize = "non_coding_transcript_exon_variant")]
    NonCodingTranscriptExonVariant,
    /// Non-coding transcript intron variant.
    #[serde(rename = "non_coding_transcript_intron_variant")]
    #[strum(serialize = "non_coding_transcript_intron_variant")]
    NonCodingTranscriptIntronVariant,
    /// Splice acceptor variant.
    #[serde(rename = "splice_acceptor_variant")]
    #[strum(serialize = "splice_acceptor_variant")]
    SpliceAcceptorVariant,
    /// Splice donor variant.
    #[serde(rename = "splice_donor_variant")]
    #[strum(serialize = "splice_donor_variant")]
    SpliceDonorVariant,
    /// Splice region variant.
    #[serde(rename = "splice_region_variant")]
    #[strum(serialize = "splice_region_variant")]
    SpliceRegionVariant,
    /// Start lost.
    #[serde(rename = "start_lost")]
    #[strum(serialize = "start_lost")]
    StartLost,
    /// Stop gained.
    #[serde(rename = "stop_gained")]
    #[strum(serialize = "stop_gained")]
    StopGained,
    /// Stop lost.
    #[serde(rename = "stop_lost")]
    #[strum(serialize = "stop_lost")]
    StopLost,
    /// Stop retained variant.
    #[serde(rename = "stop_retained_variant")]
    #[strum(serialize = "stop_retained_variant")]
    StopRetainedVariant,
    /// Structural variant.
    #[serde(rename = "structural_variant")]
    #[strum(serialize = "structural_variant")]
    StructuralVariant,
    /// Synonymous variant.
    #[serde(rename = "synonymous_variant")]
    #[strum(serialize = "synonymous_variant")]
    SynonymousVariant,
    /// Transcript ablation.
    #[serde(rename = "transcript_ablation")]
    #[strum(serialize = "transcript_ablation")]
    TranscriptAblation,
    /// Upstream gene variant.
    #[serde(rename = "upstream_gene_variant")]
    #[strum(serialize = "upstream_gene_variant")]
    UpstreamGeneVariant,
}

impl VariantEffect {
    /// Return vector of all values of `VariantEffect`.
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}

/// Enumeration for recessive mode queries.
#[derive(
    serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy,
)]
pub enum RecessiveMode {
    /// Recessive (homozygous or hemizygous index, carrier parents).
    #[serde(rename = "recessive")]
    Recessive,
    /// Compound recessive (two heterozygous hits in the same gene).
    #[serde(rename = "compound-recessive")]
    CompoundRecessive,
}

/// Choices for failing quality thresholds on genotypes.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Clone,
    Copy,
    Default,
)]
pub enum FailChoice {
    /// Ignore failure.
    #[default]
    #[serde(rename = "ignore")]
    Ignore,
    /// Drop whole variant.
    #[serde(rename = "drop-variant")]
    Drop,
    /// Interpret as "no-call".
    #[serde(rename = "no-call")]
    NoCall,
}

/// Choice for genotype.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Clone,
    Copy,
    Default,
)]
pub enum GenotypeChoice {
    /// Any genotype.
    #[default]
    #[serde(rename = "any")]
    Any,
    /// Ref. genotype.
    #[serde(rename = "ref")]
    Ref,
    /// Het. genotype.
    #[serde(rename = "het")]
    Het,
    /// Hom. genotype.
    #[serde(rename = "hom")]
    Hom,
    /// Non-hom. genotype.
    #[serde(rename = "non-hom")]
    NonHom,
    /// Variant genotype.
    #[serde(rename = "variant")]
    Variant,
    /// Non-variant genotype.
    #[serde(rename = "non-variant")]
    NonVariant,
    /// Non-reference genotype.
    #[serde(rename = "non-reference")]
    NonReference,
    /// Index in comp. het. recessive inheritance.
    #[serde(rename = "comphet-index")]
    ComphetIndex,
    /// Index in recessive inheritance.
    #[serde(rename = "recessive-index")]
    RecessiveIndex,
    /// Parent in recessive inheritance.
    #[serde(rename = "recessive-parent")]
    RecessiveParent,
}

/// Returns whether the given genotype string is treated as no-call.
///
/// This is the case if the genotype string contains at least one ".".
pub fn considered_no_call(gt_str: &str) -> bool {
    gt_str.contains('.')
}

/// Supporting code for `GenotypeChoice`.
pub(crate) mod genotype_choice {
    /// Error type for `GenotypeChoice::matches()`.
    #[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
    pub enum MatchesError {
        #[error("Cannot use genotype matches on recessive indicator: {0:?}")]
        RecessiveIndicator(super::GenotypeChoice),
    }
}

/// Trait that describes whether a genotype string matches a value.
///
/// Note that we assume properly ingested VCFs with only one alternate
/// allele.  The valid genotype strings have the form "<VAL>/<VAL>",
/// "<VAL>|<VAL>" or "<VAL>" with "<VAL>" being one of "0", "1", and ".".
pub trait MatchesGenotypeStr {
    type Error;

    /// Whether `self` matches `gt_str`.
    ///
    /// No-call genotypes match only the `NonVariant` and `NonReference`
    /// choices.
    ///
    /// # Errors
    ///
    /// * When `self` is a recessive marker and cannot be matched directly.
    fn matches(&self, gt_str: &str) -> Result<bool, Self::Error>;
}

impl MatchesGenotypeStr for GenotypeChoice {
    type Error = genotype_choice::MatchesError;

    fn matches(&self, gt_str: &str) -> Result<bool, Self::Error> {
        let gt_str = crate::common::strip_gt_leading_slash(gt_str);
        Ok(match self {
            // atoms
            GenotypeChoice::Ref => ["0", "0|0", "0/0"].contains(&gt_str),
            GenotypeChoice::Het => ["0/1", "0|1", "1/0", "1|0"].contains(&gt_str),
            GenotypeChoice::Hom => ["1", "1/1", "1|1"].contains(&gt_str),
            // combinations
            GenotypeChoice::Variant => {
                GenotypeChoice::Het.matches(gt_str)? || GenotypeChoice::Hom.matches(gt_str)?
            }
            GenotypeChoice::Any => {
                GenotypeChoice::Ref.matches(gt_str)? || GenotypeChoice::Variant.matches(gt_str)?
            }
            GenotypeChoice::NonHom => {
                GenotypeChoice::Ref.matches(gt_str)? || GenotypeChoice::Het.matches(gt_str)?
            }
            GenotypeChoice::NonVariant => {
                GenotypeChoice::Ref.matches(gt_str)? || considered_no_call(gt_str)
            }
            GenotypeChoice::NonReference => {
                GenotypeChoice::Variant.matches(gt_str)? || considered_no_call(gt_str)
            }
            // recessive markers
            GenotypeChoice::ComphetIndex
            | GenotypeChoice::RecessiveIndex
            | GenotypeChoice::RecessiveParent => {
                return Err(Self::Error::RecessiveIndicator(*self))
            }
        })
    }
}

/// Quality settings for one sample.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug, Clone, Default)]
pub struct QualitySettings {
    /// Minimal coverage for het. sites.
    pub dp_het: Option<i32>,
    /// Minimal coverage for hom. sites.
    pub dp_hom: Option<i32>,
    /// Minimal genotype quality.
    pub gq: Option<i32>,
    /// Minimal allele balance.
    pub ab: Option<f32>,
    /// Minimal number of alternate reads.
    pub ad: Option<i32>,
    /// Maximal number of alternate reads.
    pub ad_max: Option<i32>,
    /// Behaviour on failing quality thresholds.
    pub fail: FailChoice,
}

impl Eq for QualitySettings {}

/// Data structure to hold a half-open range `[start, end)`.
#[derive(
    serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone,
)]
pub struct Range {
    /// Start of range.
    pub start: i32,
    /// End of range (exclusive).
    pub end: i32,
}

/// Data structure to hold a genomic region.
#[derive(
    serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone,
)]
pub struct GenomicRegion {
    /// Chromosome.
    pub chrom: String,
    /// Range of region; `None` means the whole chromosome.
    pub range: Option<Range>,
}

/// Supporting code for `GenomicRegion`.
pub(crate) mod genomic_region {
    /// Error type for `GenomicRegion::from_str()`.
    #[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
    pub enum Error {
        #[error("invalid genomic region: {0:?}")]
        InvalidFormat(String),
        #[error("invalid integer coordinate in genomic region: {0:?}")]
        InvalidInt(String),
        #[error("genomic region range must satisfy 0 <= start <= end: {0:?}")]
        InvalidRange(String),
    }
}

impl GenomicRegion {
    /// Construct with the given chromosome and half-open range.
    pub fn new(chrom: &str, start: i32, end: i32) -> Self {
        GenomicRegion {
            chrom: chrom.to_owned(),
            range: Some(Range { start, end }),
        }
    }

    /// Construct for a whole chromosome.
    pub fn whole_chrom(chrom: &str) -> Self {
        GenomicRegion {
            chrom: chrom.to_owned(),
            range: None,
        }
    }

    /// Return a copy with the chromosome name canonicalized (any `chr`
    /// prefix stripped, `M` normalized to `MT`).
    pub fn with_canonical_chrom(&self) -> Self {
        GenomicRegion {
            chrom: canonical_chrom(&self.chrom),
            range: self.range.clone(),
        }
    }

    /// Check the range invariant `0 <= start <= end`.
    pub fn check_range(&self) -> Result<(), genomic_region::Error> {
        if let Some(Range { start, end }) = &self.range {
            if *start < 0 || start > end {
                return Err(genomic_region::Error::InvalidRange(format!(
                    "{}:{}-{}",
                    self.chrom, start, end
                )));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for GenomicRegion {
    type Err = genomic_region::Error;

    /// Parse a region from `chr? ID (":" INT ("," INT)* "-" INT ("," INT)*)?`.
    ///
    /// Thousands separators are accepted and stripped; a bare chromosome
    /// name means "whole chromosome".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(genomic_region::Error::InvalidFormat(s.to_string()));
        }
        let (chrom, range) = match s.split_once(':') {
            None => (s, None),
            Some((chrom, range_str)) => {
                let (start_str, end_str) = range_str
                    .split_once('-')
                    .ok_or_else(|| genomic_region::Error::InvalidFormat(s.to_string()))?;
                let parse_coord = |coord: &str| {
                    let cleaned = coord.replace(',', "");
                    if cleaned.is_empty() {
                        return Err(genomic_region::Error::InvalidFormat(s.to_string()));
                    }
                    cleaned
                        .parse::<i32>()
                        .map_err(|_| genomic_region::Error::InvalidInt(coord.to_string()))
                };
                (
                    chrom,
                    Some(Range {
                        start: parse_coord(start_str)?,
                        end: parse_coord(end_str)?,
                    }),
                )
            }
        };
        if chrom.is_empty() {
            return Err(genomic_region::Error::InvalidFormat(s.to_string()));
        }
        let result = GenomicRegion {
            chrom: canonical_chrom(chrom),
            range,
        };
        result.check_range()?;
        Ok(result)
    }
}

/// Nuclear population frequency filter settings (gnomAD style).
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug, Clone, Default)]
pub struct NuclearFrequencySettings {
    /// Whether to enable filtration by this database.
    pub enabled: bool,
    /// Maximal allele frequency.
    pub frequency: Option<f32>,
    /// Maximal number of heterozygous carriers.
    pub heterozygous: Option<i32>,
    /// Maximal number of homozygous carriers.
    pub homozygous: Option<i32>,
    /// Maximal number of hemizygous carriers.
    pub hemizygous: Option<i32>,
}

impl Eq for NuclearFrequencySettings {}

/// Mitochondrial population frequency filter settings (HelixMtDb style).
///
/// Mitochondrial databases report homoplasmic/heteroplasmic carriers
/// rather than a zygosity breakdown.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug, Clone, Default)]
pub struct MitochondrialFrequencySettings {
    /// Whether to enable filtration by this database.
    pub enabled: bool,
    /// Maximal allele frequency.
    pub frequency: Option<f32>,
    /// Maximal number of heteroplasmic carriers.
    pub heteroplasmic: Option<i32>,
    /// Maximal number of homoplasmic carriers.
    pub homoplasmic: Option<i32>,
}

impl Eq for MitochondrialFrequencySettings {}

/// In-house cohort frequency filter settings.
///
/// The in-house database exposes a total carrier count in addition to the
/// zygosity breakdown.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct InhouseFrequencySettings {
    /// Whether to enable filtration by the in-house cohort.
    pub enabled: bool,
    /// Maximal number of total carriers.
    pub carriers: Option<i32>,
    /// Maximal number of heterozygous carriers.
    pub heterozygous: Option<i32>,
    /// Maximal number of homozygous carriers.
    pub homozygous: Option<i32>,
    /// Maximal number of hemizygous carriers.
    pub hemizygous: Option<i32>,
}

/// Query settings for population frequencies.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct QuerySettingsFrequency {
    /// gnomAD-exomes filter.
    pub gnomad_exomes: NuclearFrequencySettings,
    /// gnomAD-genomes filter.
    pub gnomad_genomes: NuclearFrequencySettings,
    /// HelixMtDb filter.
    pub helixmtdb: MitochondrialFrequencySettings,
    /// In-house filter.
    pub inhouse: InhouseFrequencySettings,
}

/// ClinVar aggregate germline classification.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Clone,
    Copy,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum ClinvarSignificance {
    /// Benign.
    #[serde(rename = "benign")]
    #[strum(serialize = "benign")]
    Benign,
    /// Likely benign.
    #[serde(rename = "likely_benign")]
    #[strum(serialize = "likely_benign")]
    LikelyBenign,
    /// Uncertain significance.
    #[serde(rename = "uncertain_significance")]
    #[strum(serialize = "uncertain_significance")]
    UncertainSignificance,
    /// Likely pathogenic.
    #[serde(rename = "likely_pathogenic")]
    #[strum(serialize = "likely_pathogenic")]
    LikelyPathogenic,
    /// Pathogenic.
    #[serde(rename = "pathogenic")]
    #[strum(serialize = "pathogenic")]
    Pathogenic,
}

/// Query settings for ClinVar membership.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct ClinvarSettings {
    /// Whether to require ClinVar membership.
    pub require_in_clinvar: bool,
    /// Whether to include benign ClinVar variants.
    pub include_benign: bool,
    /// Whether to include likely benign ClinVar variants.
    pub include_likely_benign: bool,
    /// Whether to include uncertain significance ClinVar variants.
    pub include_uncertain_significance: bool,
    /// Whether to include likely pathogenic ClinVar variants.
    pub include_likely_pathogenic: bool,
    /// Whether to include pathogenic ClinVar variants.
    pub include_pathogenic: bool,
    /// Whether to also consider non-aggregate (per-submission)
    /// classifications.
    pub paranoid_mode: bool,
}

impl Default for ClinvarSettings {
    fn default() -> Self {
        Self {
            require_in_clinvar: false,
            include_benign: true,
            include_likely_benign: true,
            include_uncertain_significance: true,
            include_likely_pathogenic: true,
            include_pathogenic: true,
            paranoid_mode: false,
        }
    }
}

impl ClinvarSettings {
    /// Return whether the given classification is included.
    pub fn includes(&self, significance: ClinvarSignificance) -> bool {
        match significance {
            ClinvarSignificance::Benign => self.include_benign,
            ClinvarSignificance::LikelyBenign => self.include_likely_benign,
            ClinvarSignificance::UncertainSignificance => self.include_uncertain_significance,
            ClinvarSignificance::LikelyPathogenic => self.include_likely_pathogenic,
            ClinvarSignificance::Pathogenic => self.include_pathogenic,
        }
    }
}

/// Settings for phenotype-based prioritization.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct PhenotypePrioSettings {
    /// Whether phenotype-based prioritization is enabled.
    pub enabled: bool,
    /// Name of the prioritization algorithm to use.
    pub algorithm: Option<String>,
    /// HPO terms to prioritize against.
    pub hpo_terms: Vec<String>,
}

/// Settings for pathogenicity-based prioritization.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct PathogenicityPrioSettings {
    /// Whether pathogenicity-based prioritization is enabled.
    pub enabled: bool,
    /// Name of the pathogenicity score to use.
    pub score: Option<String>,
}

/// Data structure with a single case query.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct CaseQuery {
    /// The transcript database to use.
    pub database: Database,

    /// Whether to include SNVs.
    pub var_type_snv: bool,
    /// Whether to include indels.
    pub var_type_indel: bool,
    /// Whether to include MNVs.
    pub var_type_mnv: bool,

    /// Effects to consider.
    pub effects: Vec<VariantEffect>,
    /// Whether to include coding transcripts.
    pub transcripts_coding: bool,
    /// Whether to include non-coding transcripts.
    pub transcripts_noncoding: bool,
    /// Maximal distance to next exon, if any.
    pub max_exon_dist: Option<i32>,

    /// Population frequency filter settings.
    pub frequency: QuerySettingsFrequency,

    /// ClinVar filter settings.
    pub clinvar: ClinvarSettings,

    /// List of HGNC symbols, HGNC:<ID>s, ENSG<ID>s, or NCBI gene IDs to
    /// restrict the resulting variants to.
    pub gene_allowlist: Option<Vec<String>>,
    /// List of gene identifiers to remove from the result; wins over the
    /// allowlist.
    pub gene_blocklist: Option<Vec<String>>,
    /// List of genomic regions to restrict the resulting variants to.
    pub genomic_regions: Option<Vec<GenomicRegion>>,

    /// Quality settings for each individual.
    pub quality: indexmap::IndexMap<String, QualitySettings>,
    /// Genotype choice for each individual.
    pub genotype: indexmap::IndexMap<String, Option<GenotypeChoice>>,

    /// Recessive mode, if any.
    pub recessive_mode: Option<RecessiveMode>,
    /// Name of the index sample for recessive modes.
    pub recessive_index: Option<String>,

    /// Phenotype-based prioritization settings.
    pub prio_phenotype: PhenotypePrioSettings,
    /// Pathogenicity-based prioritization settings.
    pub prio_pathogenicity: PathogenicityPrioSettings,

    /// Maximal number of rows to materialize into the result set.
    pub result_row_limit: usize,
}

impl Default for CaseQuery {
    /// Returns default values for a `CaseQuery` which makes all variants
    /// pass.
    fn default() -> Self {
        Self {
            database: Default::default(),
            var_type_snv: true,
            var_type_indel: true,
            var_type_mnv: true,
            effects: VariantEffect::all(),
            transcripts_coding: true,
            transcripts_noncoding: true,
            max_exon_dist: Default::default(),
            frequency: Default::default(),
            clinvar: Default::default(),
            gene_allowlist: Default::default(),
            gene_blocklist: Default::default(),
            genomic_regions: Default::default(),
            quality: Default::default(),
            genotype: Default::default(),
            recessive_mode: Default::default(),
            recessive_index: Default::default(),
            prio_phenotype: Default::default(),
            prio_pathogenicity: Default::default(),
            result_row_limit: 200,
        }
    }
}

/// Supporting code for `CaseQuery`.
pub mod case_query {
    /// Error type for `CaseQuery::validate()`.
    #[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
    pub enum ValidationError {
        #[error(
            "sample names in {section} settings do not match the pedigree \
             (pedigree: {pedigree:?}, query: {query:?})"
        )]
        SampleMismatch {
            section: &'static str,
            pedigree: Vec<String>,
            query: Vec<String>,
        },
        #[error("invalid genomic region: {0}")]
        InvalidRegion(#[from] super::genomic_region::Error),
        #[error("gene identifiers could not be resolved: {0:?}")]
        UnknownGeneIdentifier(Vec<String>),
        #[error("multiple samples designated as recessive index: {0:?}")]
        MultipleRecessiveIndexSamples(Vec<String>),
        #[error("recessive mode requires a designated index sample")]
        RecessiveModeWithoutIndex,
        #[error("recessive marker on sample {0:?} without a recessive mode")]
        RecessiveMarkerWithoutMode(String),
        #[error(
            "designated recessive index {index:?} disagrees with marker sample {marker:?}"
        )]
        RecessiveIndexMismatch { index: String, marker: String },
    }
}

impl CaseQuery {
    /// Return the samples marked as recessive or comp.-het. index in the
    /// genotype settings.
    pub fn index_marker_samples(&self) -> Vec<String> {
        self.genotype
            .iter()
            .filter(|(_, choice)| {
                matches!(
                    choice,
                    Some(GenotypeChoice::RecessiveIndex) | Some(GenotypeChoice::ComphetIndex)
                )
            })
            .map(|(sample, _)| sample.clone())
            .collect()
    }

    /// Return the samples marked as recessive parent in the genotype
    /// settings.
    pub fn recessive_parent_samples(&self) -> Vec<String> {
        self.genotype
            .iter()
            .filter(|(_, choice)| matches!(choice, Some(GenotypeChoice::RecessiveParent)))
            .map(|(sample, _)| sample.clone())
            .collect()
    }

    /// Validate the query against the given pedigree and gene table.
    ///
    /// # Errors
    ///
    /// * `SampleMismatch` when quality/genotype sample sets differ from the
    ///   pedigree's member names.
    /// * `InvalidRegion` when a genomic region violates `0 <= start <= end`.
    /// * `UnknownGeneIdentifier` when an allow-/block-list entry does not
    ///   resolve against the gene table.
    /// * The recessive index errors when invariant (at most one designated
    ///   index) is violated.
    pub fn validate(
        &self,
        pedigree: &Pedigree,
        gene_db: &GeneDb,
    ) -> Result<(), case_query::ValidationError> {
        let pedigree_samples: HashSet<&str> = pedigree
            .individuals
            .keys()
            .map(|name| name.as_str())
            .collect();
        for (section, samples) in [
            (
                "quality",
                self.quality.keys().map(|s| s.as_str()).collect::<HashSet<_>>(),
            ),
            (
                "genotype",
                self.genotype.keys().map(|s| s.as_str()).collect::<HashSet<_>>(),
            ),
        ] {
            if samples != pedigree_samples {
                return Err(case_query::ValidationError::SampleMismatch {
                    section,
                    pedigree: pedigree.sample_names(),
                    query: {
                        let mut names =
                            samples.iter().map(|s| s.to_string()).collect::<Vec<_>>();
                        names.sort();
                        names
                    },
                });
            }
        }

        if let Some(regions) = &self.genomic_regions {
            for region in regions {
                region.check_range()?;
            }
        }

        let mut unresolved = Vec::new();
        for gene_list in [&self.gene_allowlist, &self.gene_blocklist].into_iter().flatten() {
            let (_, mut missing) = gene_db.translate_gene_list(gene_list);
            unresolved.append(&mut missing);
        }
        if !unresolved.is_empty() {
            return Err(case_query::ValidationError::UnknownGeneIdentifier(
                unresolved,
            ));
        }

        let markers = self.index_marker_samples();
        if markers.len() > 1 {
            return Err(case_query::ValidationError::MultipleRecessiveIndexSamples(
                markers,
            ));
        }
        if self.recessive_mode.is_none() {
            if let Some(marker) = markers.first() {
                return Err(case_query::ValidationError::RecessiveMarkerWithoutMode(
                    marker.clone(),
                ));
            }
            let parents = self.recessive_parent_samples();
            if let Some(parent) = parents.first() {
                return Err(case_query::ValidationError::RecessiveMarkerWithoutMode(
                    parent.clone(),
                ));
            }
        } else {
            let index = self
                .recessive_index
                .clone()
                .or_else(|| markers.first().cloned())
                .ok_or(case_query::ValidationError::RecessiveModeWithoutIndex)?;
            if let Some(marker) = markers.first() {
                if marker != &index {
                    return Err(case_query::ValidationError::RecessiveIndexMismatch {
                        index,
                        marker: marker.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Return a copy with all genomic regions canonicalized.
    pub fn with_canonical_regions(&self) -> Self {
        let mut result = self.clone();
        result.genomic_regions = self.genomic_regions.as_ref().map(|regions| {
            regions
                .iter()
                .map(GenomicRegion::with_canonical_chrom)
                .collect()
        });
        result
    }
}

/// Current major version of the query schema.
pub const SCHEMA_MAJOR: u32 = 2;
/// Current minor version of the query schema.
pub const SCHEMA_MINOR: u32 = 1;

/// Schema version of a persisted query document.
#[derive(
    serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy,
)]
pub struct SchemaVersion {
    /// Major version; incompatible on mismatch.
    pub major: u32,
    /// Minor version; older minors are upgraded on read.
    pub minor: u32,
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self {
            major: SCHEMA_MAJOR,
            minor: SCHEMA_MINOR,
        }
    }
}

/// Supporting code for `QueryDocument`.
pub(crate) mod query_document {
    /// Error type for `QueryDocument::decode()`.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("unsupported query schema version {major}.{minor}")]
        UnsupportedVersion { major: u32, minor: u32 },
        #[error("problem deserializing query document: {0}")]
        Deserialize(#[from] serde_json::Error),
    }
}

/// Persisted form of a `CaseQuery`, versioned with `(major, minor)`.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug, Clone)]
pub struct QueryDocument {
    /// Version of the document schema.
    pub version: SchemaVersion,
    /// The query payload as structured document.
    pub query: serde_json::Value,
}

impl QueryDocument {
    /// Encode a `CaseQuery` into a document with the current schema
    /// version.
    pub fn encode(query: &CaseQuery) -> Result<Self, serde_json::Error> {
        Ok(Self {
            version: SchemaVersion::default(),
            query: serde_json::to_value(query)?,
        })
    }

    /// Decode into a `CaseQuery`, upgrading older minor versions on read.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown major versions, for minor versions newer
    /// than this build, and for malformed payloads.
    pub fn decode(&self) -> Result<CaseQuery, query_document::Error> {
        if self.version.major != SCHEMA_MAJOR || self.version.minor > SCHEMA_MINOR {
            return Err(query_document::Error::UnsupportedVersion {
                major: self.version.major,
                minor: self.version.minor,
            });
        }
        let mut value = self.query.clone();
        if self.version.minor < 1 {
            // 2.0 -> 2.1: `gene_blacklist` was renamed to `gene_blocklist`.
            if let Some(object) = value.as_object_mut() {
                if let Some(blocklist) = object.remove("gene_blacklist") {
                    object.entry("gene_blocklist").or_insert(blocklist);
                }
            }
        }
        Ok(serde_json::from_value(value)?)
    }
}
