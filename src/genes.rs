//! Gene cross-link table for allow-/block-list resolution.

use std::collections::HashSet;
use std::path::Path;

use multimap::MultiMap;
use thousands::Separable;

/// One gene cross-link record.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeneRecord {
    /// HGNC identifier, e.g., `HGNC:1100`.
    pub hgnc_id: String,
    /// Official gene symbol, e.g., `BRCA1`.
    pub symbol: String,
    /// ENSEMBL gene identifier, e.g., `ENSG00000012048`.
    pub ensembl_gene_id: String,
    /// NCBI Entrez gene identifier.
    pub entrez_id: u32,
}

/// Supporting code for `GeneDb`.
pub(crate) mod gene_db {
    /// Error type for `GeneDb::load_tsv()`.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("problem opening gene TSV file: {0}")]
        Open(#[from] std::io::Error),
        #[error("problem parsing gene TSV record: {0}")]
        Parse(#[from] csv::Error),
    }
}

/// In-memory gene cross-link table with lookup by all supported identifiers.
///
/// All lookups are case-sensitive, mirroring how the identifiers are stored
/// in the upstream reference table.
#[derive(Debug, Clone, Default)]
pub struct GeneDb {
    /// The cross-link records.
    pub records: Vec<GeneRecord>,
    /// Mapping from gene symbol to index into `records`.
    by_symbol: MultiMap<String, usize>,
    /// Mapping from HGNC ID to index into `records`.
    by_hgnc: MultiMap<String, usize>,
    /// Mapping from ENSEMBL gene ID to index into `records`.
    by_ensembl: MultiMap<String, usize>,
    /// Mapping from Entrez gene ID to index into `records`.
    by_entrez: MultiMap<u32, usize>,
}

impl GeneDb {
    /// Construct from the given records, building all lookup indices.
    pub fn from_records(records: Vec<GeneRecord>) -> Self {
        let mut result = Self {
            records,
            ..Default::default()
        };
        for (idx, record) in result.records.iter().enumerate() {
            result.by_symbol.insert(record.symbol.clone(), idx);
            result.by_hgnc.insert(record.hgnc_id.clone(), idx);
            result
                .by_ensembl
                .insert(record.ensembl_gene_id.clone(), idx);
            result.by_entrez.insert(record.entrez_id, idx);
        }
        result
    }

    /// Load the cross-link table from a TSV file with header
    /// `hgnc_id gene_symbol ensembl_gene_id entrez_id`.
    pub fn load_tsv<P: AsRef<Path>>(path: P) -> Result<Self, gene_db::Error> {
        #[derive(Debug, serde::Deserialize)]
        struct Record {
            pub hgnc_id: Option<String>,
            pub gene_symbol: Option<String>,
            pub ensembl_gene_id: Option<String>,
            pub entrez_id: Option<u32>,
        }

        let mut records = Vec::new();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b'\t')
            .from_reader(std::fs::File::open(path)?);
        for record in reader.deserialize() {
            let record: Record = record?;
            if let (Some(hgnc_id), Some(symbol), Some(ensembl_gene_id), Some(entrez_id)) = (
                record.hgnc_id,
                record.gene_symbol,
                record.ensembl_gene_id,
                record.entrez_id,
            ) {
                records.push(GeneRecord {
                    hgnc_id,
                    symbol,
                    ensembl_gene_id,
                    entrez_id,
                });
            }
        }
        tracing::debug!(
            "loaded {} gene cross-link records",
            records.len().separate_with_commas()
        );
        Ok(Self::from_records(records))
    }

    /// Resolve a single identifier (symbol, HGNC ID, ENSG ID, or Entrez ID)
    /// to the matching records.
    ///
    /// Returns an empty vector if the identifier does not resolve.
    pub fn resolve(&self, identifier: &str) -> Vec<&GeneRecord> {
        let identifier = identifier.trim();
        let indices = if identifier.starts_with("HGNC:") {
            self.by_hgnc.get_vec(identifier)
        } else if identifier.starts_with("ENSG") {
            self.by_ensembl.get_vec(identifier)
        } else if let Ok(entrez_id) = identifier.parse::<u32>() {
            self.by_entrez.get_vec(&entrez_id)
        } else {
            self.by_symbol.get_vec(identifier)
        };
        indices
            .map(|indices| indices.iter().map(|&idx| &self.records[idx]).collect())
            .unwrap_or_default()
    }

    /// Translate a gene list into the set of HGNC IDs that it resolves to.
    ///
    /// Identifiers that do not resolve are returned in the second element so
    /// that callers can reject them.
    pub fn translate_gene_list(&self, genes: &[String]) -> (HashSet<String>, Vec<String>) {
        let mut hgnc_ids = HashSet::new();
        let mut unresolved = Vec::new();
        for gene in genes {
            let records = self.resolve(gene);
            if records.is_empty() {
                unresolved.push(gene.clone());
            } else {
                hgnc_ids.extend(records.iter().map(|record| record.hgnc_id.clone()));
            }
        }
        (hgnc_ids, unresolved)
    }
}
