//! Query executor and result materializer.
//!
//! This is the only place that writes result rows; everything else reads
//! them or attaches annotations keyed by genomic coordinate.

use std::collections::{HashMap, HashSet};

use itertools::Itertools as _;
use thousands::Separable;

use crate::genes::GeneDb;
use crate::ped::Pedigree;

use super::comphet::{self, Candidate};
use super::interpreter::QueryInterpreter;
use super::output::{ResultRow, ResultSet};
use super::schema::data::VariantRecord;
use super::schema::query::{CaseQuery, RecessiveMode};
use super::sorting::ByHgncId;
use super::store::Case;

/// Statistics on the executed query.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryStats {
    /// Number of records that were read.
    pub count_total: usize,
    /// Number of records that passed the filter.
    pub count_passed: usize,
}

/// Collect the row-level candidates for one case.
fn collect_candidates(
    interpreter: &QueryInterpreter,
    variants: &[VariantRecord],
    stats: &mut QueryStats,
) -> Result<Vec<Candidate>, anyhow::Error> {
    let mut candidates = Vec::new();
    for seqvar in variants {
        stats.count_total += 1;
        let res = interpreter.passes(seqvar)?;
        if res.pass_all {
            candidates.push(Candidate {
                seqvar: seqvar.clone(),
                no_call_samples: res.no_call_samples,
            });
        }
    }
    Ok(candidates)
}

/// Apply the compound heterozygous grouping pass if the query requires it.
fn apply_comphet(
    interpreter: &QueryInterpreter,
    candidates: Vec<Candidate>,
) -> Result<Vec<Candidate>, anyhow::Error> {
    if interpreter.query.recessive_mode == Some(RecessiveMode::CompoundRecessive) {
        comphet::filter_comphet(&interpreter.query, &interpreter.pedigree, candidates)
    } else {
        Ok(candidates)
    }
}

/// Sort candidates by HGNC ID, then coordinate, for stable result ordering.
fn sort_candidates(candidates: Vec<Candidate>) -> Vec<VariantRecord> {
    candidates
        .into_iter()
        .map(|candidate| ByHgncId::from(candidate.seqvar))
        .sorted()
        .map(|wrapper| wrapper.seqvar)
        .collect()
}

/// Execute the compiled query for a single case and materialize the result
/// set.
///
/// At most `query.result_row_limit` rows are materialized; the total match
/// count is reported separately and may exceed the number of rows.
pub fn run_query(
    interpreter: &QueryInterpreter,
    case: &Case,
    variants: &[VariantRecord],
    release: &str,
    query_uuid: uuid::Uuid,
) -> Result<(ResultSet, QueryStats), anyhow::Error> {
    let mut stats = QueryStats::default();
    let candidates = collect_candidates(interpreter, variants, &mut stats)?;
    let candidates = apply_comphet(interpreter, candidates)?;
    let sorted = sort_candidates(candidates);
    stats.count_passed = sorted.len();

    let row_limit = interpreter.query.result_row_limit;
    let rows = sorted
        .iter()
        .take(row_limit)
        .map(|seqvar| ResultRow::with_seqvar(seqvar, release, case.uuid))
        .collect::<Vec<_>>();

    tracing::info!(
        "query {} matched {} of {} records, materializing {}",
        query_uuid,
        sorted.len().separate_with_commas(),
        stats.count_total.separate_with_commas(),
        rows.len().separate_with_commas()
    );
    Ok((
        ResultSet {
            uuid: uuid::Uuid::new_v4(),
            query_uuid,
            created: chrono::Utc::now(),
            total_count: sorted.len(),
            rows,
        },
        stats,
    ))
}

/// Derive the per-case query from a project-wide query.
///
/// The per-sample maps are restricted to the case's pedigree; the recessive
/// structure only applies to the case that contains the index sample.
fn query_for_case(query: &CaseQuery, pedigree: &Pedigree) -> CaseQuery {
    let mut result = query.clone();
    result.quality = query
        .quality
        .iter()
        .filter(|(sample, _)| pedigree.individuals.contains_key(*sample))
        .map(|(sample, settings)| (sample.clone(), settings.clone()))
        .collect();
    result.genotype = query
        .genotype
        .iter()
        .filter(|(sample, _)| pedigree.individuals.contains_key(*sample))
        .map(|(sample, choice)| (sample.clone(), *choice))
        .collect();
    let index_in_case = query
        .recessive_index
        .as_ref()
        .map(|index| pedigree.individuals.contains_key(index))
        .unwrap_or(false);
    if !index_in_case {
        result.recessive_mode = None;
        result.recessive_index = None;
        for (_, choice) in result.genotype.iter_mut() {
            if matches!(
                choice,
                Some(
                    super::schema::query::GenotypeChoice::RecessiveIndex
                        | super::schema::query::GenotypeChoice::ComphetIndex
                        | super::schema::query::GenotypeChoice::RecessiveParent
                )
            ) {
                *choice = Some(super::schema::query::GenotypeChoice::Any);
            }
        }
    }
    result
}

/// Execute the query jointly over all cases of a project.
///
/// One physical match explodes into one logical row per sample with
/// genotype data, and every row is enriched with the number of cases that
/// have a match in the row's gene.  The gene counts require a full pass
/// over all matches, so project-wide queries never early-terminate.
pub fn run_project_query(
    query: &CaseQuery,
    cases: &[(Case, Vec<VariantRecord>)],
    gene_db: &GeneDb,
    release: &str,
    query_uuid: uuid::Uuid,
) -> Result<(ResultSet, QueryStats), anyhow::Error> {
    let mut stats = QueryStats::default();

    // First pass: collect all physical matches of all cases.
    let mut matches: Vec<(Case, VariantRecord)> = Vec::new();
    for (case, variants) in cases {
        let case_query = query_for_case(query, &case.pedigree);
        let interpreter =
            QueryInterpreter::new(case_query, case.pedigree.clone(), gene_db)
                .map_err(|e| anyhow::anyhow!("problem compiling query: {}", e))?;
        let candidates = collect_candidates(&interpreter, variants, &mut stats)?;
        let candidates = apply_comphet(&interpreter, candidates)?;
        for seqvar in sort_candidates(candidates) {
            matches.push((case.clone(), seqvar));
        }
    }

    // Build the gene -> cases map over the whole result before pagination.
    let mut cases_per_gene: HashMap<String, HashSet<uuid::Uuid>> = HashMap::new();
    for (case, seqvar) in &matches {
        if let Some(hgnc_id) = seqvar.hgnc_id() {
            cases_per_gene
                .entry(hgnc_id.to_string())
                .or_default()
                .insert(case.uuid);
        }
    }

    // Order matches deterministically across cases.
    let mut sortable = matches
        .into_iter()
        .map(|(case, seqvar)| (ByHgncId::from(seqvar), case))
        .collect::<Vec<_>>();
    sortable.sort_by(|(lhs, lhs_case), (rhs, rhs_case)| {
        lhs.cmp(rhs).then_with(|| lhs_case.name.cmp(&rhs_case.name))
    });

    // Second pass: explode into per-sample logical rows.
    let mut rows = Vec::new();
    for (wrapper, case) in &sortable {
        let seqvar = &wrapper.seqvar;
        let affected_cases = seqvar
            .hgnc_id()
            .and_then(|hgnc_id| cases_per_gene.get(hgnc_id))
            .map(|case_uuids| case_uuids.len() as i32);
        for (sample, individual) in &case.pedigree.individuals {
            if !individual.has_gt_data || !seqvar.call_info.contains_key(sample) {
                continue;
            }
            let mut row = ResultRow::with_seqvar(seqvar, release, case.uuid);
            row.sample = Some(sample.clone());
            row.affected_cases_in_gene = affected_cases;
            rows.push(row);
        }
    }
    stats.count_passed = sortable.len();

    let total_count = rows.len();
    let row_limit = query.result_row_limit;
    rows.truncate(row_limit);

    tracing::info!(
        "project query {} matched {} records ({} logical rows) out of {}, materializing {}",
        query_uuid,
        stats.count_passed.separate_with_commas(),
        total_count.separate_with_commas(),
        stats.count_total.separate_with_commas(),
        rows.len().separate_with_commas()
    );
    Ok((
        ResultSet {
            uuid: uuid::Uuid::new_v4(),
            query_uuid,
            created: chrono::Utc::now(),
            total_count,
            rows,
        },
        stats,
    ))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::genes;
    use crate::query::interpreter::QueryInterpreter;
    use crate::query::schema::data::test::record_with_genotypes;
    use crate::query::schema::query::test::query_for;
    use crate::query::schema::query::{FailChoice, RecessiveMode};
    use crate::query::store::test::trio_store;
    use crate::query::store::VariantStore as _;

    /// End-to-end compound heterozygous scenario: variants A and B form a
    /// pair, C shares the parent of A and is excluded.
    #[test]
    fn run_query_comphet_scenario() {
        let variants = vec![
            // A: from father
            record_with_genotypes(
                "1",
                100,
                "A",
                "G",
                "HGNC:1100",
                &[("index", "0/1"), ("father", "0/1"), ("mother", "0/0")],
            ),
            // B: from mother
            record_with_genotypes(
                "1",
                200,
                "A",
                "G",
                "HGNC:1100",
                &[("index", "0/1"), ("father", "0/0"), ("mother", "0/1")],
            ),
            // C: from father, same parent as A
            record_with_genotypes(
                "1",
                300,
                "A",
                "G",
                "HGNC:1100",
                &[("index", "0/1"), ("father", "0/1"), ("mother", "0/0")],
            ),
        ];
        let (store, case) = trio_store(variants.clone());
        let mut query = query_for(&case.pedigree);
        query.recessive_mode = Some(RecessiveMode::CompoundRecessive);
        query.recessive_index = Some("index".into());
        let interpreter = QueryInterpreter::new(
            query,
            case.pedigree.clone(),
            &genes::test::example_db(),
        )
        .unwrap();

        let (result_set, stats) = super::run_query(
            &interpreter,
            &case,
            &store.variants_for_case(case.uuid).unwrap(),
            "GRCh37",
            uuid::Uuid::new_v4(),
        )
        .unwrap();

        assert_eq!(stats.count_total, 3);
        assert_eq!(stats.count_passed, 2);
        assert_eq!(result_set.total_count, 2);
        assert_eq!(
            result_set
                .rows
                .iter()
                .map(|row| row.start)
                .collect::<Vec<_>>(),
            vec![100, 200]
        );
    }

    #[test]
    fn run_query_truncates_to_row_limit() {
        let variants = (0..5)
            .map(|i| {
                record_with_genotypes(
                    "1",
                    100 + i,
                    "A",
                    "G",
                    "HGNC:1100",
                    &[("index", "0/1"), ("father", "0/0"), ("mother", "0/0")],
                )
            })
            .collect::<Vec<_>>();
        let (_, case) = trio_store(vec![]);
        let mut query = query_for(&case.pedigree);
        query.result_row_limit = 2;
        let interpreter = QueryInterpreter::new(
            query,
            case.pedigree.clone(),
            &genes::test::example_db(),
        )
        .unwrap();

        let (result_set, stats) =
            super::run_query(&interpreter, &case, &variants, "GRCh37", uuid::Uuid::new_v4())
                .unwrap();

        assert_eq!(stats.count_passed, 5);
        assert_eq!(result_set.total_count, 5);
        assert_eq!(result_set.rows.len(), 2);
    }

    /// `drop-variant` removes the row, `no-call` keeps it.
    #[test]
    fn run_query_quality_fail_choices() {
        let mut variants = vec![record_with_genotypes(
            "1",
            100,
            "A",
            "G",
            "HGNC:1100",
            &[("index", "0/1"), ("father", "0/0"), ("mother", "0/0")],
        )];
        // Fails any dp_het threshold for the index.
        variants[0].call_info.get_mut("index").unwrap().dp = Some(1);
        let (_, case) = trio_store(vec![]);

        for (fail, expected_rows) in [(FailChoice::Drop, 0), (FailChoice::NoCall, 1)] {
            let mut query = query_for(&case.pedigree);
            let settings = query.quality.get_mut("index").unwrap();
            settings.dp_het = Some(10);
            settings.fail = fail;
            let interpreter = QueryInterpreter::new(
                query,
                case.pedigree.clone(),
                &genes::test::example_db(),
            )
            .unwrap();

            let (result_set, _) = super::run_query(
                &interpreter,
                &case,
                &variants,
                "GRCh37",
                uuid::Uuid::new_v4(),
            )
            .unwrap();

            assert_eq!(result_set.rows.len(), expected_rows, "fail = {:?}", fail);
        }
    }

    #[test]
    fn run_project_query_explodes_and_counts_cases() {
        let (_, case_a) = trio_store(vec![]);
        let mut case_b = case_a.clone();
        case_b.uuid = uuid::Uuid::new_v4();
        case_b.name = "trio-b".into();
        let variants_a = vec![record_with_genotypes(
            "1",
            100,
            "A",
            "G",
            "HGNC:1100",
            &[("index", "0/1"), ("father", "0/0"), ("mother", "0/0")],
        )];
        let variants_b = vec![record_with_genotypes(
            "1",
            150,
            "A",
            "G",
            "HGNC:1100",
            &[("index", "0/1"), ("father", "0/1"), ("mother", "0/0")],
        )];
        let query = query_for(&case_a.pedigree);

        let (result_set, stats) = super::run_project_query(
            &query,
            &[(case_a.clone(), variants_a), (case_b.clone(), variants_b)],
            &genes::test::example_db(),
            "GRCh37",
            uuid::Uuid::new_v4(),
        )
        .unwrap();

        assert_eq!(stats.count_total, 2);
        assert_eq!(stats.count_passed, 2);
        // Two physical matches, three samples with genotype data each.
        assert_eq!(result_set.total_count, 6);
        assert_eq!(result_set.rows.len(), 6);
        for row in &result_set.rows {
            assert!(row.sample.is_some());
            assert_eq!(row.affected_cases_in_gene, Some(2));
        }
    }

    #[test]
    fn run_project_query_counts_affected_cases_per_gene() {
        let (_, case_a) = trio_store(vec![]);
        let mut case_b = case_a.clone();
        case_b.uuid = uuid::Uuid::new_v4();
        case_b.name = "trio-b".into();
        // Gene HGNC:1100 occurs in both cases, HGNC:1101 only in case A.
        let variants_a = vec![
            record_with_genotypes(
                "1",
                100,
                "A",
                "G",
                "HGNC:1100",
                &[("index", "0/1"), ("father", "0/0"), ("mother", "0/0")],
            ),
            record_with_genotypes(
                "2",
                100,
                "A",
                "G",
                "HGNC:1101",
                &[("index", "0/1"), ("father", "0/0"), ("mother", "0/0")],
            ),
        ];
        let variants_b = vec![record_with_genotypes(
            "1",
            150,
            "A",
            "G",
            "HGNC:1100",
            &[("index", "0/1"), ("father", "0/0"), ("mother", "0/0")],
        )];
        let query = query_for(&case_a.pedigree);

        let (result_set, _) = super::run_project_query(
            &query,
            &[(case_a.clone(), variants_a), (case_b.clone(), variants_b)],
            &genes::test::example_db(),
            "GRCh37",
            uuid::Uuid::new_v4(),
        )
        .unwrap();

        for row in &result_set.rows {
            let gene = row
                .payload
                .gene_related
                .as_ref()
                .map(|gene_related| gene_related.identity.hgnc_id.clone())
                .unwrap();
            let expected = if gene == "HGNC:1100" { 2 } else { 1 };
            assert_eq!(
                row.affected_cases_in_gene,
                Some(expected),
                "gene = {}",
                gene
            );
        }
    }
}
