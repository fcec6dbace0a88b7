//! Code implementing the `query` sub commands.

pub mod comphet;
pub mod executor;
pub mod interpreter;
pub mod output;
pub mod presets;
pub mod schema;
pub mod sorting;
pub mod store;

use std::io::Write as _;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use crate::engine::jobs::ImmediateTaskQueue;
use crate::engine::{ExecutionContext, FilterEngine, QueryTarget};
use crate::genes::GeneDb;
use crate::ped::Pedigree;

use self::schema::query::{CaseQuery, QueryDocument};

/// Command line arguments for `query run` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Run a variant filter query", long_about = None)]
pub struct RunArgs {
    /// Genome release that the input coordinates refer to.
    #[arg(long, default_value = "GRCh37")]
    pub genome_release: String,
    /// Path to the PED file(s), one per input VCF.
    #[arg(long, required = true)]
    pub path_ped: Vec<String>,
    /// Path to the ingested input VCF file(s), one per case.
    #[arg(long, required = true)]
    pub path_input: Vec<String>,
    /// Path to the query JSON file (versioned document or bare query).
    #[arg(long, required = true)]
    pub path_query_json: String,
    /// Path to the gene cross-link TSV file.
    #[arg(long)]
    pub path_genes_tsv: Option<String>,
    /// Path to the output JSONL file.
    #[arg(long, required = true)]
    pub path_output: String,
    /// Optional maximal number of result rows to materialize.
    #[arg(long)]
    pub max_results: Option<usize>,
    /// Execute jointly over all inputs (project-wide) instead of over the
    /// first input only.
    #[arg(long, default_value_t = false)]
    pub project: bool,
    /// Name of the submitting user recorded on the query.
    #[arg(long, default_value = "cli")]
    pub user: String,
}

/// Load a query from JSON: either a versioned document or a bare query
/// (which is treated as current-version).
fn load_query_json(path: &str) -> Result<CaseQuery, anyhow::Error> {
    let value: serde_json::Value = serde_json::from_reader(std::fs::File::open(path)?)?;
    if value.get("version").is_some() {
        let document: QueryDocument = serde_json::from_value(value)?;
        Ok(document.decode()?)
    } else {
        Ok(serde_json::from_value(value)?)
    }
}

/// Load the pedigree from the PED file at `path`.
fn load_pedigree(path: &str) -> Result<Pedigree, anyhow::Error> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("problem reading PED file {}: {}", path, e))?;
    Pedigree::from_ped_str(&text)
        .map_err(|e| anyhow::anyhow!("problem parsing PED file {}: {}", path, e))
}

/// Main entry point for `query run` sub command.
pub fn run(args_common: &crate::common::Args, args: &RunArgs) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    if args.path_ped.len() != args.path_input.len() {
        anyhow::bail!(
            "number of PED files ({}) must match number of inputs ({})",
            args.path_ped.len(),
            args.path_input.len()
        );
    }

    tracing::info!("Loading gene table...");
    let gene_db = if let Some(path_genes_tsv) = &args.path_genes_tsv {
        GeneDb::load_tsv(path_genes_tsv)?
    } else {
        tracing::warn!("no gene table given, gene allow-/block-lists will not resolve");
        GeneDb::default()
    };

    tracing::info!("Loading query...");
    let mut query = load_query_json(&args.path_query_json)?;
    if let Some(max_results) = args.max_results {
        query.result_row_limit = max_results;
    }

    tracing::info!("Loading cases...");
    let before_loading = Instant::now();
    let mut store = store::MemoryVariantStore::default();
    for (path_ped, path_input) in args.path_ped.iter().zip(args.path_input.iter()) {
        let pedigree = load_pedigree(path_ped)?;
        let (case, variants) = store::load_case_vcf(path_input, pedigree)?;
        store.register_case(case, variants);
    }
    tracing::info!("...done loading cases in {:?}", before_loading.elapsed());

    let case_uuids = store.case_uuids();
    let target = if args.project {
        QueryTarget::Project(case_uuids)
    } else {
        QueryTarget::Case(
            case_uuids
                .first()
                .copied()
                .ok_or_else(|| anyhow::anyhow!("no input cases"))?,
        )
    };

    tracing::info!("Running query...");
    let before_query = Instant::now();
    let engine = FilterEngine::new(
        Arc::new(store),
        Arc::new(gene_db),
        Arc::new(ImmediateTaskQueue),
        &args.genome_release,
    );
    let ctx = ExecutionContext {
        user: args.user.clone(),
        feature_flags: Vec::new(),
    };
    let submitted = engine
        .submit(&ctx, target, query)
        .map_err(|e| anyhow::anyhow!("query submission failed: {}", e))?;

    let status = engine
        .job_status(submitted.job_uuid)
        .ok_or_else(|| anyhow::anyhow!("job {} not found", submitted.job_uuid))?;
    for message in &status.log_messages {
        tracing::info!("job: {}", message);
    }
    if let Some(error) = &status.error {
        anyhow::bail!("query job failed: {}", error);
    }
    tracing::info!("...done running query in {:?}", before_query.elapsed());

    tracing::info!("Writing results...");
    let page = engine
        .result_page(submitted.query_uuid, 0, usize::MAX)
        .ok_or_else(|| anyhow::anyhow!("no result set for query {}", submitted.query_uuid))?;
    let mut writer = std::io::BufWriter::new(std::fs::File::create(&args.path_output)?);
    for row in &page.rows {
        serde_json::to_writer(&mut writer, row)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    tracing::info!(
        "wrote {} rows (total matches: {})",
        page.rows.len(),
        page.total_count
    );

    tracing::info!(
        "All of `query run` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

/// Command line arguments for `query resolve-preset` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Resolve a quick preset into a query", long_about = None)]
pub struct ResolvePresetArgs {
    /// Name of the quick preset to resolve.
    #[arg(long, required = true)]
    pub quick_preset: String,
    /// Path to the PED file describing the pedigree.
    #[arg(long, required = true)]
    pub path_ped: String,
    /// Name of the index sample; default is the first affected individual.
    #[arg(long)]
    pub index: Option<String>,
    /// Override for the inheritance category.
    #[arg(long)]
    pub inheritance: Option<presets::InheritancePreset>,
    /// Override for the frequency category.
    #[arg(long)]
    pub frequency: Option<presets::FrequencyPreset>,
    /// Override for the impact category.
    #[arg(long)]
    pub impact: Option<presets::ImpactPreset>,
    /// Override for the quality category.
    #[arg(long)]
    pub quality: Option<presets::QualityPreset>,
    /// Override for the chromosomes category.
    #[arg(long)]
    pub chromosomes: Option<presets::ChromosomesPreset>,
    /// Override for the flags etc. category.
    #[arg(long)]
    pub flags_etc: Option<presets::FlagsEtcPreset>,
}

/// Main entry point for `query resolve-preset` sub command.
pub fn run_resolve_preset(
    args_common: &crate::common::Args,
    args: &ResolvePresetArgs,
) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let pedigree = load_pedigree(&args.path_ped)?;
    let overrides = presets::PresetOverrides {
        inheritance: args.inheritance,
        frequency: args.frequency,
        impact: args.impact,
        quality: args.quality,
        chromosomes: args.chromosomes,
        flags_etc: args.flags_etc,
        fields: None,
    };
    let query = presets::resolve(
        &args.quick_preset,
        &overrides,
        &pedigree,
        args.index.as_deref(),
    )?;

    println!("{}", serde_json::to_string_pretty(&QueryDocument::encode(&query)?)?);
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    #[test]
    fn load_query_json_bare_and_versioned() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let query = crate::query::schema::query::CaseQuery::default();

        let bare_path = dir.path().join("bare.json");
        std::fs::write(&bare_path, serde_json::to_string(&query)?)?;
        let document = super::QueryDocument::encode(&query)?;
        let versioned_path = dir.path().join("versioned.json");
        std::fs::write(&versioned_path, serde_json::to_string(&document)?)?;

        let bare = super::load_query_json(bare_path.to_str().unwrap())?;
        let versioned = super::load_query_json(versioned_path.to_str().unwrap())?;

        assert_eq!(bare, query);
        assert_eq!(versioned, query);

        Ok(())
    }

    #[test]
    fn load_pedigree_from_file() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("trio.ped");
        std::fs::write(
            &path,
            "FAM index father mother 1 2\n\
             FAM father 0 0 1 1\n\
             FAM mother 0 0 2 1\n",
        )?;

        let pedigree = super::load_pedigree(path.to_str().unwrap())?;

        assert_eq!(pedigree.individuals.len(), 3);

        Ok(())
    }
}
