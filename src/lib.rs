pub mod audio;
pub mod config;
pub mod cutter;
pub mod error;
pub mod interactive;
pub mod pipeline;
pub mod report;
pub mod split;

pub use config::Config;
pub use error::{Result, SplitError};
pub use pipeline::{print_summary, split_media, PipelineConfig, PipelineResult, PipelineStats};
pub use split::{plan, select, CutPointSet, Segment, ShortfallPolicy, SplitRequest};
