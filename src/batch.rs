use crate::audio::{MediaTool, Options};
use crate::error::{CondenseError, Result};
use crate::metadata::{Metadata, TagWriter};
use crate::pipeline::{convert_job, CancelFlag, Job, JobContext, JobSummary, Progress};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How one job of a batch ended.
#[derive(Debug)]
pub struct JobOutcome {
    pub job: Job,
    pub result: Result<JobSummary>,
}

/// Result of running a batch.
#[derive(Debug)]
pub struct BatchReport {
    /// Outcomes of every job that was attempted, in input order.
    pub outcomes: Vec<JobOutcome>,
    /// Jobs never attempted because of cancellation or fail-fast.
    pub skipped: usize,
    pub cancelled: bool,
    pub total_time: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// True when every job produced its output.
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.skipped == 0 && self.failed() == 0
    }
}

/// Runs jobs one after another on a single worker.
pub struct BatchRunner {
    tool: Arc<dyn MediaTool>,
    options: Options,
    tags: TagWriter,
    fail_fast: bool,
    cancel: CancelFlag,
}

impl BatchRunner {
    /// Create a runner. Invalid options reject the whole batch.
    pub fn new(tool: Arc<dyn MediaTool>, options: Options, metadata: &Metadata) -> Result<Self> {
        options.validate()?;

        Ok(Self {
            tool,
            options,
            tags: TagWriter::new(metadata),
            fail_fast: false,
            cancel: CancelFlag::new(),
        })
    }

    /// Stop at the first failed job instead of moving on to the next.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run the batch on a background task, streaming progress values.
    pub fn spawn(
        self: Arc<Self>,
        jobs: Vec<Job>,
    ) -> (JoinHandle<BatchReport>, mpsc::UnboundedReceiver<Progress>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            self.run(&jobs, move |progress| {
                // The receiver may already be gone; progress is advisory.
                let _ = tx.send(progress);
            })
            .await
        });

        (handle, rx)
    }

    /// Run every job in order, reporting progress before each segment.
    pub async fn run<F>(&self, jobs: &[Job], mut on_progress: F) -> BatchReport
    where
        F: FnMut(Progress) + Send,
    {
        let start_time = Instant::now();
        let num_jobs = jobs.len();

        // Formats are checked for every job before the first one starts.
        let mut preflight: Vec<Option<CondenseError>> =
            jobs.iter().map(|job| job.check_formats().err()).collect();

        let mut outcomes = Vec::with_capacity(num_jobs);
        let mut cancelled = false;

        if self.fail_fast {
            if let Some(index) = preflight.iter().position(Option::is_some) {
                if let Some(e) = preflight[index].take() {
                    error!("{}: {e}", jobs[index].subtitle_file.display());
                    outcomes.push(JobOutcome {
                        job: jobs[index].clone(),
                        result: Err(e),
                    });
                }
                return self.report(outcomes, num_jobs, false, start_time);
            }
        }

        let ctx = JobContext {
            tool: self.tool.as_ref(),
            options: &self.options,
            tags: &self.tags,
            cancel: &self.cancel,
        };

        info!(
            "Converting {} job(s) with {} (join {:.2}s, pad -{:.2}s/+{:.2}s)",
            num_jobs,
            self.tool.name(),
            self.options.join_secs,
            self.options.pre_pad,
            self.options.post_pad
        );

        for (job_index, job) in jobs.iter().enumerate() {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let result = match preflight[job_index].take() {
                Some(e) => Err(e),
                None => convert_job(&ctx, job, job_index, num_jobs, &mut on_progress).await,
            };

            let stop = match &result {
                Ok(summary) => {
                    info!(
                        "[{}/{}] Wrote {} ({} segments)",
                        job_index + 1,
                        num_jobs,
                        summary.output_path.display(),
                        summary.segments
                    );
                    false
                }
                Err(CondenseError::Cancelled) => {
                    warn!("[{}/{}] Cancelled", job_index + 1, num_jobs);
                    cancelled = true;
                    true
                }
                Err(e) => {
                    error!(
                        "[{}/{}] {} failed: {e}",
                        job_index + 1,
                        num_jobs,
                        job.media_file.display()
                    );
                    self.fail_fast
                }
            };

            outcomes.push(JobOutcome {
                job: job.clone(),
                result,
            });

            if stop {
                break;
            }
        }

        self.report(outcomes, num_jobs, cancelled, start_time)
    }

    fn report(
        &self,
        outcomes: Vec<JobOutcome>,
        num_jobs: usize,
        cancelled: bool,
        start_time: Instant,
    ) -> BatchReport {
        let skipped = num_jobs - outcomes.len();
        if skipped > 0 {
            warn!("{} job(s) were not attempted", skipped);
        }

        BatchReport {
            outcomes,
            skipped,
            cancelled,
            total_time: start_time.elapsed(),
        }
    }
}
