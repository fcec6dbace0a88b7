//! Variant store abstraction.
//!
//! The engine only ever reads from the store; the store is keyed by case.
//! Lookups return `Option` instead of raising on missing entities.

use indexmap::IndexMap;
use noodles_vcf as vcf;
use thousands::Separable;

use crate::ped::Pedigree;

use super::schema::data::VariantRecord;

/// One case with its pedigree.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Case {
    /// UUID of the case.
    pub uuid: uuid::Uuid,
    /// Human-readable case name.
    pub name: String,
    /// The pedigree of the case.
    pub pedigree: Pedigree,
}

/// Read-only access to the variants of cases.
pub trait VariantStore: Send + Sync {
    /// Return the case with the given UUID, if known.
    fn case(&self, case_uuid: uuid::Uuid) -> Option<Case>;

    /// Return the variants of the given case, if known.
    fn variants_for_case(&self, case_uuid: uuid::Uuid) -> Option<Vec<VariantRecord>>;
}

/// In-memory variant store.
#[derive(Debug, Default)]
pub struct MemoryVariantStore {
    /// The registered cases.
    cases: IndexMap<uuid::Uuid, Case>,
    /// The variants per case.
    variants: IndexMap<uuid::Uuid, Vec<VariantRecord>>,
}

impl MemoryVariantStore {
    /// Register a case together with its variants.
    pub fn register_case(&mut self, case: Case, variants: Vec<VariantRecord>) {
        self.variants.insert(case.uuid, variants);
        self.cases.insert(case.uuid, case);
    }

    /// Return the UUIDs of all registered cases, in registration order.
    pub fn case_uuids(&self) -> Vec<uuid::Uuid> {
        self.cases.keys().copied().collect()
    }
}

impl VariantStore for MemoryVariantStore {
    fn case(&self, case_uuid: uuid::Uuid) -> Option<Case> {
        self.cases.get(&case_uuid).cloned()
    }

    fn variants_for_case(&self, case_uuid: uuid::Uuid) -> Option<Vec<VariantRecord>> {
        self.variants.get(&case_uuid).cloned()
    }
}

/// Load the variants of one case from an ingested VCF file.
///
/// The case name is derived from the file name; the pedigree is passed in
/// explicitly (the pedigree provider is an external collaborator).
pub fn load_case_vcf(
    path_input: &str,
    pedigree: Pedigree,
) -> Result<(Case, Vec<VariantRecord>), anyhow::Error> {
    tracing::debug!("loading ingested VCF from {}", path_input);
    let mut vcf_reader = vcf::reader::Builder::default()
        .build_from_path(path_input)
        .map_err(|e| anyhow::anyhow!("problem opening VCF file {}: {}", path_input, e))?;
    let header = vcf_reader.read_header()?;

    let mut variants = Vec::new();
    for record in vcf_reader.records(&header) {
        let record = record?;
        variants.push(VariantRecord::from_vcf(&record, &header)?);
    }
    tracing::debug!(
        "loaded {} variant records from {}",
        variants.len().separate_with_commas(),
        path_input
    );

    let name = std::path::Path::new(path_input)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| path_input.to_string());
    let case = Case {
        uuid: uuid::Uuid::new_v4(),
        name,
        pedigree,
    };
    Ok((case, variants))
}
