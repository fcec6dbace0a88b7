//! Engine facade: query submission, job orchestration, and result access.
//!
//! The submitting caller never blocks on execution: `submit` validates,
//! persists the query together with its job in one atomic step, and hands
//! the execution closure to the task queue.  Execution errors surface as
//! job failures, never to the submitting caller.

pub mod jobs;

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use crate::genes::GeneDb;
use crate::ped::Pedigree;
use crate::query::executor::{run_project_query, run_query};
use crate::query::interpreter::QueryInterpreter;
use crate::query::output::{ResultRow, ResultSet};
use crate::query::presets::{self, PresetOverrides};
use crate::query::schema::data::VariantRecord;
use crate::query::schema::query::{case_query, CaseQuery, QueryDocument};
use crate::query::store::{Case, VariantStore};

use self::jobs::{Job, JobState, TaskHandle, TaskQueue};

/// Explicit execution context: the current user and feature flags.
///
/// Passed into `submit`/`resolve_preset`, never read from ambient state.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionContext {
    /// Name of the current user.
    pub user: String,
    /// Enabled feature flags.
    pub feature_flags: Vec<String>,
}

/// What a query runs against: one case or all cases of a project.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum QueryTarget {
    /// A single case.
    #[serde(rename = "case")]
    Case(uuid::Uuid),
    /// All listed cases of a project, jointly.
    #[serde(rename = "project")]
    Project(Vec<uuid::Uuid>),
}

/// A persisted, user-attributed query.
///
/// The criteria document never changes after creation; resubmission creates
/// a new query.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QueryRecord {
    /// UUID of the query.
    pub uuid: uuid::Uuid,
    /// The originating case or project.
    pub target: QueryTarget,
    /// Name of the submitting user.
    pub user: String,
    /// Creation time.
    pub created: chrono::DateTime<chrono::Utc>,
    /// Whether the query is visible to other project members.
    pub public: bool,
    /// The criteria, serialized verbatim for reproducibility.
    pub document: QueryDocument,
}

/// Supporting code for `FilterEngine::submit()`.
pub mod submit {
    /// Error type for `FilterEngine::submit()`.
    ///
    /// These are returned synchronously; no job is created for them.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("unknown case: {0}")]
        UnknownCase(uuid::Uuid),
        #[error("invalid query: {0}")]
        Validation(#[from] super::case_query::ValidationError),
        #[error("problem serializing query document: {0}")]
        Document(#[from] serde_json::Error),
    }
}

/// Result of a successful submission.
#[derive(Debug)]
pub struct SubmitResult {
    /// UUID of the created query.
    pub query_uuid: uuid::Uuid,
    /// UUID of the created job.
    pub job_uuid: uuid::Uuid,
    /// Handle to the enqueued task.
    pub task: TaskHandle,
}

/// Snapshot of a job's state for polling callers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct JobStatus {
    /// Current state.
    pub state: JobState,
    /// Progress log messages.
    pub log_messages: Vec<String>,
    /// Terminal error payload, if failed.
    pub error: Option<String>,
}

/// One page of result rows.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResultPage {
    /// The rows of the page.
    pub rows: Vec<ResultRow>,
    /// Total number of matches of the query, may exceed the number of
    /// materialized rows.
    pub total_count: usize,
}

/// Mutable state of the repository.
#[derive(Debug, Default)]
struct RepositoryInner {
    /// Queries by UUID.
    queries: IndexMap<uuid::Uuid, QueryRecord>,
    /// Jobs by UUID.
    jobs: IndexMap<uuid::Uuid, Job>,
    /// Live result sets, keyed by query UUID (at most one per query).
    result_sets: IndexMap<uuid::Uuid, ResultSet>,
}

/// Repository for queries, jobs, and result sets.
///
/// Every method takes the lock exactly once, so each call is one atomic
/// transaction.
#[derive(Debug, Default)]
pub struct Repository {
    inner: Mutex<RepositoryInner>,
}

impl Repository {
    /// Persist a query together with its job in one transaction, so that a
    /// query is never observed without a job.
    pub fn create_query_with_job(&self, query: QueryRecord, job: Job) {
        let mut inner = self.inner.lock().expect("repository lock poisoned");
        inner.queries.insert(query.uuid, query);
        inner.jobs.insert(job.uuid, job);
    }

    /// Return the query with the given UUID, if any.
    pub fn query(&self, query_uuid: uuid::Uuid) -> Option<QueryRecord> {
        let inner = self.inner.lock().expect("repository lock poisoned");
        inner.queries.get(&query_uuid).cloned()
    }

    /// Return the job with the given UUID, if any.
    pub fn job(&self, job_uuid: uuid::Uuid) -> Option<Job> {
        let inner = self.inner.lock().expect("repository lock poisoned");
        inner.jobs.get(&job_uuid).cloned()
    }

    /// Apply a mutation to the job with the given UUID.  Returns whether
    /// the job exists.
    pub fn with_job_mut(&self, job_uuid: uuid::Uuid, f: impl FnOnce(&mut Job)) -> bool {
        let mut inner = self.inner.lock().expect("repository lock poisoned");
        if let Some(job) = inner.jobs.get_mut(&job_uuid) {
            f(job);
            true
        } else {
            false
        }
    }

    /// Install the result set as the live one of its query, superseding any
    /// previous result set in the same transaction.
    pub fn replace_result_set(&self, result_set: ResultSet) {
        let mut inner = self.inner.lock().expect("repository lock poisoned");
        inner.result_sets.insert(result_set.query_uuid, result_set);
    }

    /// Return the live result set of the given query, if any.
    pub fn result_set(&self, query_uuid: uuid::Uuid) -> Option<ResultSet> {
        let inner = self.inner.lock().expect("repository lock poisoned");
        inner.result_sets.get(&query_uuid).cloned()
    }

    /// Number of jobs in the repository.
    pub fn job_count(&self) -> usize {
        let inner = self.inner.lock().expect("repository lock poisoned");
        inner.jobs.len()
    }
}

/// The variant filter query engine.
///
/// Bundles the repository, the variant store, the gene table, and the task
/// queue behind the external interface.
pub struct FilterEngine<S> {
    /// The repository of queries, jobs, and result sets.
    repo: Arc<Repository>,
    /// The read-only variant store.
    store: Arc<S>,
    /// The gene cross-link table.
    gene_db: Arc<GeneDb>,
    /// The task queue boundary.
    queue: Arc<dyn TaskQueue>,
    /// Genome release that the store's coordinates refer to.
    release: String,
}

impl<S> FilterEngine<S>
where
    S: VariantStore + 'static,
{
    /// Construct a new engine.
    pub fn new(store: Arc<S>, gene_db: Arc<GeneDb>, queue: Arc<dyn TaskQueue>, release: &str) -> Self {
        Self {
            repo: Arc::new(Repository::default()),
            store,
            gene_db,
            queue,
            release: release.to_string(),
        }
    }

    /// Access to the repository, e.g., for status endpoints.
    pub fn repo(&self) -> &Arc<Repository> {
        &self.repo
    }

    /// Return the pedigree that the target's sample maps must match: the
    /// case pedigree, or the union across the project's cases.
    fn pedigree_for_target(&self, target: &QueryTarget) -> Result<Pedigree, submit::Error> {
        match target {
            QueryTarget::Case(case_uuid) => Ok(self
                .store
                .case(*case_uuid)
                .ok_or(submit::Error::UnknownCase(*case_uuid))?
                .pedigree),
            QueryTarget::Project(case_uuids) => {
                let mut pedigree = Pedigree::default();
                for case_uuid in case_uuids {
                    let case = self
                        .store
                        .case(*case_uuid)
                        .ok_or(submit::Error::UnknownCase(*case_uuid))?;
                    pedigree = pedigree.union(&case.pedigree);
                }
                Ok(pedigree)
            }
        }
    }

    /// Validate and persist the query, enqueue its execution.
    ///
    /// Validation errors are returned synchronously and never reach the
    /// task queue; on success the caller gets the query and job UUIDs and
    /// a task handle.
    pub fn submit(
        &self,
        ctx: &ExecutionContext,
        target: QueryTarget,
        query: CaseQuery,
    ) -> Result<SubmitResult, submit::Error> {
        let pedigree = self.pedigree_for_target(&target)?;
        query.validate(&pedigree, &self.gene_db)?;

        let document = QueryDocument::encode(&query)?;
        let query_record = QueryRecord {
            uuid: uuid::Uuid::new_v4(),
            target,
            user: ctx.user.clone(),
            created: chrono::Utc::now(),
            public: false,
            document,
        };
        let job = Job::new(query_record.uuid);
        let (query_uuid, job_uuid) = (query_record.uuid, job.uuid);
        self.repo.create_query_with_job(query_record, job);
        tracing::info!(
            "user {} submitted query {} (job {})",
            &ctx.user,
            query_uuid,
            job_uuid
        );

        let repo = self.repo.clone();
        let store = self.store.clone();
        let gene_db = self.gene_db.clone();
        let release = self.release.clone();
        let task = self.queue.enqueue(
            job_uuid,
            Box::new(move || run_job(&repo, store.as_ref(), &gene_db, &release, job_uuid)),
        );

        Ok(SubmitResult {
            query_uuid,
            job_uuid,
            task,
        })
    }

    /// Return the state and log of the given job, if any.
    pub fn job_status(&self, job_uuid: uuid::Uuid) -> Option<JobStatus> {
        self.repo.job(job_uuid).map(|job| JobStatus {
            state: job.state,
            log_messages: job.log.clone(),
            error: job.error,
        })
    }

    /// Return one page of the query's live result set, if any.
    pub fn result_page(
        &self,
        query_uuid: uuid::Uuid,
        offset: usize,
        limit: usize,
    ) -> Option<ResultPage> {
        self.repo.result_set(query_uuid).map(|result_set| {
            let (rows, total_count) = result_set.page(offset, limit);
            ResultPage {
                rows: rows.to_vec(),
                total_count,
            }
        })
    }

    /// Resolve a quick preset against the given case's pedigree.
    ///
    /// Read-only; nothing is persisted.
    pub fn resolve_preset(
        &self,
        _ctx: &ExecutionContext,
        case_uuid: uuid::Uuid,
        quick_preset_name: &str,
        overrides: &PresetOverrides,
        index: Option<&str>,
    ) -> Result<CaseQuery, anyhow::Error> {
        let case = self
            .store
            .case(case_uuid)
            .ok_or_else(|| anyhow::anyhow!("unknown case: {}", case_uuid))?;
        Ok(presets::resolve(
            quick_preset_name,
            overrides,
            &case.pedigree,
            index,
        )?)
    }
}

/// Execute the job with the given UUID, recording progress and outcome on
/// the job.
///
/// Errors are caught here, written to the job's log and error payload, and
/// the job transitions to `Failed`.  A failed run leaves the previous live
/// result set untouched.
pub(crate) fn run_job<S: VariantStore>(
    repo: &Arc<Repository>,
    store: &S,
    gene_db: &GeneDb,
    release: &str,
    job_uuid: uuid::Uuid,
) {
    repo.with_job_mut(job_uuid, |job| {
        job.advance(JobState::Running);
        job.push_log("job started");
    });

    match execute_job(repo, store, gene_db, release, job_uuid) {
        Ok((result_set, log_messages)) => {
            repo.replace_result_set(result_set);
            repo.with_job_mut(job_uuid, |job| {
                for message in log_messages {
                    job.push_log(message);
                }
                job.push_log("job finished");
                job.advance(JobState::Done);
            });
        }
        Err(e) => {
            tracing::warn!("job {} failed: {}", job_uuid, e);
            repo.with_job_mut(job_uuid, |job| {
                job.push_log(format!("job failed: {}", e));
                job.error = Some(e.to_string());
                job.advance(JobState::Failed);
            });
        }
    }
}

/// Run the query of the given job and materialize its result set.
fn execute_job<S: VariantStore>(
    repo: &Arc<Repository>,
    store: &S,
    gene_db: &GeneDb,
    release: &str,
    job_uuid: uuid::Uuid,
) -> Result<(ResultSet, Vec<String>), anyhow::Error> {
    use thousands::Separable as _;

    let job = repo
        .job(job_uuid)
        .ok_or_else(|| anyhow::anyhow!("job {} not found", job_uuid))?;
    let query_record = repo
        .query(job.query_uuid)
        .ok_or_else(|| anyhow::anyhow!("query {} not found", job.query_uuid))?;
    let query = query_record.document.decode()?;

    let (result_set, stats) = match &query_record.target {
        QueryTarget::Case(case_uuid) => {
            let case = store
                .case(*case_uuid)
                .ok_or_else(|| anyhow::anyhow!("case {} not found", case_uuid))?;
            let variants = store
                .variants_for_case(*case_uuid)
                .ok_or_else(|| anyhow::anyhow!("no variants for case {}", case_uuid))?;
            let interpreter = QueryInterpreter::new(query, case.pedigree.clone(), gene_db)
                .map_err(|e| anyhow::anyhow!("problem compiling query: {}", e))?;
            run_query(&interpreter, &case, &variants, release, query_record.uuid)?
        }
        QueryTarget::Project(case_uuids) => {
            let mut cases: Vec<(Case, Vec<VariantRecord>)> = Vec::new();
            for case_uuid in case_uuids {
                let case = store
                    .case(*case_uuid)
                    .ok_or_else(|| anyhow::anyhow!("case {} not found", case_uuid))?;
                let variants = store
                    .variants_for_case(*case_uuid)
                    .ok_or_else(|| anyhow::anyhow!("no variants for case {}", case_uuid))?;
                cases.push((case, variants));
            }
            run_project_query(&query, &cases, gene_db, release, query_record.uuid)?
        }
    };

    let log_messages = vec![
        format!(
            "processed {} records, {} passed the filter",
            stats.count_total.separate_with_commas(),
            stats.count_passed.separate_with_commas()
        ),
        format!(
            "materialized {} of {} result rows",
            result_set.rows.len().separate_with_commas(),
            result_set.total_count.separate_with_commas()
        ),
    ];
    Ok((result_set, log_messages))
}
