//! Data structures for materialized result sets.

use crate::common::chrom_no;

use super::schema::data::VariantRecord;

/// Gene-related information for the gene.
pub mod gene_related {
    use crate::query::schema::data::VariantRecord;
    use crate::query::schema::query::VariantEffect;

    /// Gene-related information for a `ResultPayload`.
    #[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, derive_new::new)]
    pub struct Record {
        /// Gene identity related (for display of gene symbol).
        pub identity: Identity,
        /// Gene-related consequences of the variant.
        pub consequences: Consequences,
    }

    impl Record {
        /// Construct given a `VariantRecord` if the information is given in
        /// the annotation.
        ///
        /// Note that we will only look at the first annotation record as the
        /// ingest creates one `VariantRecord` record per gene.
        pub fn with_seqvar(seqvar: &VariantRecord) -> Option<Self> {
            seqvar.ann_fields.first().and_then(|ann| {
                if !ann.gene_id.is_empty() && !ann.gene_symbol.is_empty() {
                    Some(Self {
                        identity: Identity::new(ann.gene_id.clone(), ann.gene_symbol.clone()),
                        consequences: Consequences::new(ann.consequences.clone()),
                    })
                } else {
                    None
                }
            })
        }
    }

    /// Result information for gene identity.
    #[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, derive_new::new)]
    pub struct Identity {
        /// HGNC gene ID.
        pub hgnc_id: String,
        /// HGNC gene symbol.
        pub hgnc_symbol: String,
    }

    /// Consequences related to a gene.
    #[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, derive_new::new)]
    pub struct Consequences {
        /// The predicted variant consequences.
        pub consequences: Vec<VariantEffect>,
    }
}

/// Variant-related information.
pub mod variant_related {
    use crate::query::schema::data::{Af as _, VariantRecord};
    use crate::query::schema::query::ClinvarSignificance;

    /// Record for variant-related annotation.
    #[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize, derive_new::new)]
    pub struct Record {
        /// Frequency information.
        pub frequency: Frequency,
        /// ClinVar classifications, aggregate first.
        pub clinvar: Vec<ClinvarSignificance>,
    }

    impl Eq for Record {}

    impl Record {
        /// Construct given a `VariantRecord`.
        pub fn with_seqvar(seqvar: &VariantRecord) -> Self {
            Self {
                frequency: Frequency {
                    gnomad_exomes_af: seqvar.gnomad_exomes.af(),
                    gnomad_exomes_het: seqvar.gnomad_exomes.het,
                    gnomad_exomes_hom: seqvar.gnomad_exomes.hom,
                    gnomad_exomes_hemi: seqvar.gnomad_exomes.hemi,
                    gnomad_genomes_af: seqvar.gnomad_genomes.af(),
                    gnomad_genomes_het: seqvar.gnomad_genomes.het,
                    gnomad_genomes_hom: seqvar.gnomad_genomes.hom,
                    gnomad_genomes_hemi: seqvar.gnomad_genomes.hemi,
                    helixmtdb_af: seqvar.helixmtdb.af(),
                    helixmtdb_het: seqvar.helixmtdb.het,
                    helixmtdb_hom: seqvar.helixmtdb.hom,
                    inhouse_carriers: seqvar.inhouse.carriers,
                },
                clinvar: seqvar.clinvar.clone(),
            }
        }
    }

    /// Snapshot of the population frequencies at materialization time.
    #[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize, derive_new::new)]
    pub struct Frequency {
        /// gnomAD exomes allele frequency.
        pub gnomad_exomes_af: f32,
        /// gnomAD exomes heterozygous carriers.
        pub gnomad_exomes_het: i32,
        /// gnomAD exomes homozygous carriers.
        pub gnomad_exomes_hom: i32,
        /// gnomAD exomes hemizygous carriers.
        pub gnomad_exomes_hemi: i32,
        /// gnomAD genomes allele frequency.
        pub gnomad_genomes_af: f32,
        /// gnomAD genomes heterozygous carriers.
        pub gnomad_genomes_het: i32,
        /// gnomAD genomes homozygous carriers.
        pub gnomad_genomes_hom: i32,
        /// gnomAD genomes hemizygous carriers.
        pub gnomad_genomes_hemi: i32,
        /// HelixMtDb allele frequency.
        pub helixmtdb_af: f32,
        /// HelixMtDb heteroplasmic carriers.
        pub helixmtdb_het: i32,
        /// HelixMtDb homoplasmic carriers.
        pub helixmtdb_hom: i32,
        /// In-house carriers.
        pub inhouse_carriers: i32,
    }

    impl Eq for Frequency {}
}

/// Call-related information.
pub mod call_related {
    use crate::query::schema::data::{CallInfo, VariantRecord};

    /// Record with the genotype block for a `ResultPayload`.
    #[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, derive_new::new)]
    pub struct Record {
        /// Mapping from sample name to call information.
        pub call_infos: indexmap::IndexMap<String, CallInfo>,
    }

    impl Record {
        /// Construct given a `VariantRecord`.
        pub fn with_seqvar(seqvar: &VariantRecord) -> Self {
            Self {
                call_infos: seqvar.call_info.clone(),
            }
        }
    }
}

/// Denormalized annotation payload of one result row.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct ResultPayload {
    /// Gene-related information, if annotated.
    pub gene_related: Option<gene_related::Record>,
    /// Variant-related information.
    pub variant_related: variant_related::Record,
    /// Genotype block.
    pub call_related: call_related::Record,
}

impl ResultPayload {
    /// Construct given a `VariantRecord`.
    pub fn with_seqvar(seqvar: &VariantRecord) -> Self {
        Self {
            gene_related: gene_related::Record::with_seqvar(seqvar),
            variant_related: variant_related::Record::with_seqvar(seqvar),
            call_related: call_related::Record::with_seqvar(seqvar),
        }
    }
}

/// One materialized row of a result set.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResultRow {
    /// UUID of the row.
    pub uuid: uuid::Uuid,
    /// Genome release of the coordinate.
    pub release: String,
    /// Chromosome name.
    pub chrom: String,
    /// Chromosome number for sorting.
    pub chrom_no: i32,
    /// 1-based start position.
    pub start: i32,
    /// 1-based inclusive end position.
    pub end: i32,
    /// Reference allele.
    pub reference: String,
    /// Alternative allele.
    pub alternative: String,
    /// UUID of the case that contributed the row.
    pub case_uuid: uuid::Uuid,
    /// Sample that this logical row refers to (project-wide queries
    /// materialize one row per sample with genotype data).
    pub sample: Option<String>,
    /// Number of affected cases with a variant in the row's gene, computed
    /// over the whole (pre-pagination) result; project-wide queries only.
    pub affected_cases_in_gene: Option<i32>,
    /// The annotation payload snapshot.
    pub payload: ResultPayload,
}

impl ResultRow {
    /// Construct from a `VariantRecord` for the given case.
    pub fn with_seqvar(seqvar: &VariantRecord, release: &str, case_uuid: uuid::Uuid) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4(),
            release: release.to_string(),
            chrom: seqvar.chrom.clone(),
            chrom_no: chrom_no(&seqvar.chrom) as i32,
            start: seqvar.pos,
            end: seqvar.end(),
            reference: seqvar.reference.clone(),
            alternative: seqvar.alternative.clone(),
            case_uuid,
            sample: None,
            affected_cases_in_gene: None,
            payload: ResultPayload::with_seqvar(seqvar),
        }
    }
}

/// The stable, materialized outcome of executing a query.
///
/// A query has at most one live result set; creating a new one supersedes
/// the previous one.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResultSet {
    /// UUID of the result set.
    pub uuid: uuid::Uuid,
    /// UUID of the query this result set belongs to.
    pub query_uuid: uuid::Uuid,
    /// Time of materialization.
    pub created: chrono::DateTime<chrono::Utc>,
    /// Total number of matches, may exceed `rows.len()`.
    pub total_count: usize,
    /// The materialized rows, at most the query's row limit.
    pub rows: Vec<ResultRow>,
}

impl ResultSet {
    /// Return one page of rows together with the total match count.
    pub fn page(&self, offset: usize, limit: usize) -> (&[ResultRow], usize) {
        let begin = offset.min(self.rows.len());
        let end = offset.saturating_add(limit).min(self.rows.len());
        (&self.rows[begin..end], self.total_count)
    }
}
