pub mod audio;
pub mod batch;
pub mod config;
pub mod error;
pub mod interactive;
pub mod jobs;
pub mod metadata;
pub mod pipeline;
pub mod subtitle;

pub use audio::{Ffmpeg, Interval, MediaTool, Options};
pub use batch::{BatchReport, BatchRunner, JobOutcome};
pub use config::Config;
pub use error::{CondenseError, Result};
pub use metadata::Metadata;
pub use pipeline::{convert_job, CancelFlag, Job, JobSummary, Progress};
