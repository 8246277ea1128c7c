// src/normalize/mod.rs
//! Field normalizers: free text in, canonical scalars out.

pub mod category;
pub mod magnitude;
pub mod rules;
pub mod year;

pub use category::{
    normalize_category, normalize_category_from_description, CategoryNormalizer, SynonymCluster,
};
pub use magnitude::normalize_magnitude;
pub use year::{normalize_year, YearNormalizer, YearValue};

use serde::{Deserialize, Serialize};

/// What to do when a cell cannot be parsed. One policy covers every field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Treat the cell as missing; the row is dropped later.
    #[default]
    Lenient,
    /// Abort the run.
    Strict,
}
