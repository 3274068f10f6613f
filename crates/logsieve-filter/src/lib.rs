//! Record filtering for logsieve
//!
//! This crate provides keyword matching, the wait queue that smooths bursts
//! of matching records, and the pipeline that ties them to a reloadable
//! config.

mod clock;
mod matcher;
mod pipeline;
mod queue;
mod scheduler;
mod shared;

pub use clock::{Clock, ManualClock, SystemClock};
pub use matcher::KeywordMatcher;
pub use pipeline::{FilterPipeline, PipelineStats, RecordFilter};
pub use queue::{QueuedEntry, WaitQueue};
pub use scheduler::ReloadScheduler;
pub use shared::SharedPipeline;

// Re-export types used in our public API
pub use logsieve_config::{ConfigError, ConfigProvider, FileConfigProvider, Properties};
pub use logsieve_types::{FilterConfig, Record, ReloadMode, WaitPolicy};
