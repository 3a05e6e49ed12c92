// Phase 11: 全ジョブ実行

use rayon::prelude::*;

use crate::pipeline::job_runner::{JobConfig, JobResult, run_job};

/// Run multiple jobs in parallel, collecting results in input order.
/// One job failure does NOT prevent other jobs from running.
///
/// Jobs share no state: each builds its own document and layer directory.
/// `workers == 0` uses rayon's default pool.
pub fn run_all_jobs(jobs: &[JobConfig], workers: usize) -> Vec<crate::error::Result<JobResult>> {
    if workers == 0 {
        return jobs.par_iter().map(run_job).collect();
    }
    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(|| jobs.par_iter().map(run_job).collect()),
        Err(e) => {
            tracing::warn!("falling back to the default thread pool: {e}");
            jobs.par_iter().map(run_job).collect()
        }
    }
}
