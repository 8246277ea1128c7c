pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod record;
pub mod render;

pub use config::Config;
pub use error::{PipelineError, UnparseableValue};
pub use pipeline::{process_tables, run, RunOutput};
pub use record::{CanonicalRecord, PartialRecord, RawTable, RawValue};
