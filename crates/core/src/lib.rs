pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod format;
pub mod intake;
pub mod lecture;
pub mod provider;
pub mod queue;
pub mod resolver;
pub mod stages;
pub mod store;
pub mod types;
pub mod worker;

pub use cache::{get_root_data_dir, get_scratch_dir, get_spool_dir, get_store_dir};
pub use config::PipelineConfig;
pub use error::{LectureError, Result};
pub use executor::{PipelineExecutor, Stages};
pub use format::{format_lecture_readable, format_timestamp, format_transcript_with_timestamps};
pub use intake::{Intake, Submission};
pub use lecture::LectureRecord;
pub use provider::{Provider, ProviderConfig};
pub use queue::{JobQueue, JobReason, LectureJob, MemoryQueue, QueueError, SpoolQueue};
pub use resolver::InputResolver;
pub use store::{FileStore, LectureStore, MemoryStore, StoreError};
pub use types::{Frame, LectureStatus, RawSources, Segment, Stage};
pub use worker::Worker;
