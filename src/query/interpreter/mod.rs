//! Apply settings from a `CaseQuery` to `VariantRecord`s.

use std::collections::HashSet;

pub mod clinvar;
pub mod consequences;
pub mod frequency;
pub mod genes;
pub mod genotype;
pub mod quality;
pub mod regions;

use crate::genes::GeneDb;
use crate::ped::Pedigree;
use crate::query::schema::data::VariantRecord;
use crate::query::schema::query::CaseQuery;

/// Supporting code for `QueryInterpreter`.
pub mod compilation {
    /// Error type for `QueryInterpreter::new()`.
    ///
    /// These indicate internal invariant violations that validation should
    /// have rejected already.
    #[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
    pub enum Error {
        #[error("recessive mode requires a designated index sample")]
        MissingRecessiveIndex,
        #[error("index sample {0:?} not found in pedigree")]
        UnknownIndexSample(String),
    }
}

/// Result type for `QueryInterpreter::passes()`.
#[derive(Debug, Default)]
pub struct PassesResult {
    /// Whether all row-level filters pass.
    pub pass_all: bool,
    /// For which samples the genotype was interpreted as no-call because of
    /// quality failures.
    pub no_call_samples: Vec<String>,
}

/// Hold data structures that support the interpretation of one `CaseQuery`
/// against multiple `VariantRecord`s.
#[derive(Debug, Default)]
pub struct QueryInterpreter {
    /// The case query settings, with recessive markers expanded.
    pub query: CaseQuery,
    /// The pedigree of the case.
    pub pedigree: Pedigree,
    /// Gene allowlist, translated to HGNC IDs.
    pub hgnc_allowlist: Option<HashSet<String>>,
    /// Gene blocklist, translated to HGNC IDs.
    pub hgnc_blocklist: HashSet<String>,
}

impl QueryInterpreter {
    /// Construct a new `QueryInterpreter`, compiling the query.
    ///
    /// This canonicalizes genomic regions, translates the gene allow-/block-
    /// lists into HGNC ID sets, and expands the inheritance mode into
    /// per-sample recessive markers using the pedigree.
    ///
    /// # Errors
    ///
    /// Returns an error when the query violates invariants that validation
    /// enforces, e.g., a recessive mode without designated index.
    pub fn new(
        query: CaseQuery,
        pedigree: Pedigree,
        gene_db: &GeneDb,
    ) -> Result<Self, compilation::Error> {
        let query = query.with_canonical_regions();
        let query = genotype::expand_recessive_markers(&query, &pedigree)?;

        let hgnc_allowlist = query.gene_allowlist.as_ref().map(|gene_allowlist| {
            let (hgnc_ids, unresolved) = gene_db.translate_gene_list(gene_allowlist);
            for gene in unresolved {
                tracing::warn!("could not map gene identifier {} in allowlist", gene);
            }
            hgnc_ids
        });
        let hgnc_blocklist = query
            .gene_blocklist
            .as_ref()
            .map(|gene_blocklist| {
                let (hgnc_ids, unresolved) = gene_db.translate_gene_list(gene_blocklist);
                for gene in unresolved {
                    tracing::warn!("could not map gene identifier {} in blocklist", gene);
                }
                hgnc_ids
            })
            .unwrap_or_default();

        Ok(QueryInterpreter {
            query,
            pedigree,
            hgnc_allowlist,
            hgnc_blocklist,
        })
    }

    /// Determine whether the annotated `VariantRecord` passes all row-level
    /// criteria.
    ///
    /// Note that in compound-recessive mode a second pass over the row-level
    /// candidates is required, see `crate::query::comphet`.
    pub fn passes(&self, seqvar: &VariantRecord) -> Result<PassesResult, anyhow::Error> {
        let pass_frequency = frequency::passes(&self.query, seqvar)?;
        let pass_consequences = consequences::passes(&self.query, seqvar)?;
        let res_quality = quality::passes(&self.query, seqvar)?;
        let pass_genotype = genotype::passes(
            &self.query,
            &self.pedigree,
            seqvar,
            &res_quality
                .no_call_samples
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>(),
        )?;
        let pass_genes = genes::passes(&self.hgnc_allowlist, &self.hgnc_blocklist, seqvar);
        let pass_regions = regions::passes(&self.query, seqvar);
        let pass_clinvar = clinvar::passes(&self.query, seqvar)?;
        let pass_all = pass_frequency
            && pass_consequences
            && res_quality.pass
            && pass_genotype
            && pass_genes
            && pass_regions
            && pass_clinvar;
        Ok(PassesResult {
            pass_all,
            no_call_samples: res_quality.no_call_samples,
        })
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::genes;
    use crate::query::schema::data::test::record_with_genotypes;
    use crate::query::schema::query::test::query_for;
    use crate::query::schema::query::{GenotypeChoice, RecessiveMode};

    #[test]
    fn new_expands_recessive_markers() {
        let pedigree = crate::ped::test::trio();
        let mut query = query_for(&pedigree);
        query.recessive_mode = Some(RecessiveMode::CompoundRecessive);
        query.recessive_index = Some("index".into());

        let interpreter =
            super::QueryInterpreter::new(query, pedigree, &genes::test::example_db()).unwrap();

        assert_eq!(
            interpreter.query.genotype["index"],
            Some(GenotypeChoice::ComphetIndex)
        );
        assert_eq!(
            interpreter.query.genotype["father"],
            Some(GenotypeChoice::RecessiveParent)
        );
        assert_eq!(
            interpreter.query.genotype["mother"],
            Some(GenotypeChoice::RecessiveParent)
        );
    }

    #[test]
    fn new_rejects_recessive_mode_without_index() {
        let pedigree = crate::ped::test::trio();
        let mut query = query_for(&pedigree);
        query.recessive_mode = Some(RecessiveMode::Recessive);

        let res = super::QueryInterpreter::new(query, pedigree, &genes::test::example_db());

        assert_eq!(
            res.err(),
            Some(super::compilation::Error::MissingRecessiveIndex)
        );
    }

    #[test]
    fn passes_combines_all_dimensions() {
        let pedigree = crate::ped::test::trio();
        let query = query_for(&pedigree);
        let interpreter =
            super::QueryInterpreter::new(query, pedigree, &genes::test::example_db()).unwrap();
        let seqvar = record_with_genotypes(
            "1",
            100,
            "A",
            "G",
            "HGNC:1100",
            &[("index", "0/1"), ("father", "0/0"), ("mother", "0/0")],
        );

        let res = interpreter.passes(&seqvar).unwrap();

        assert!(res.pass_all);
        assert!(res.no_call_samples.is_empty());
    }
}
