// src/pipeline.rs

use tracing::{info, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::extract::extract_tables;
use crate::merge::{MergeStats, Merger};
use crate::normalize::{CategoryNormalizer, YearNormalizer};
use crate::reconcile::Reconciler;
use crate::record::{CanonicalRecord, RawTable};

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub tables: usize,
    pub records: Vec<CanonicalRecord>,
    pub stats: MergeStats,
}

/// Reconcile and merge already-extracted tables.
#[instrument(level = "info", skip_all, fields(tables = tables.len()))]
pub fn process_tables(tables: &[RawTable], config: &Config) -> Result<RunOutput> {
    let categories = CategoryNormalizer::new(config.normalize.synonyms.clone());
    let reconciled = Reconciler::new(&config.columns, &categories).reconcile_all(tables)?;

    let merger = Merger::new(YearNormalizer::new(config.normalize.present_year), config.filter);
    let (records, stats) = merger.merge(&reconciled)?;
    Ok(RunOutput {
        tables: tables.len(),
        records,
        stats,
    })
}

/// Full core run over an HTML document: extract → reconcile → merge.
/// The config is validated first.
pub fn run(document: &str, config: &Config) -> Result<RunOutput> {
    config.validate()?;
    let tables = extract_tables(document, &config.extract)?;
    let out = process_tables(&tables, config)?;
    info!(tables = out.tables, records = out.records.len(), "pipeline done");
    Ok(out)
}
