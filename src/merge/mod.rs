// src/merge/mod.rs

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use crate::config::FilterSettings;
use crate::error::{Result, UnparseableValue};
use crate::normalize::{normalize_magnitude, ErrorPolicy, YearNormalizer, YearValue};
use crate::record::{CanonicalRecord, PartialRecord, RawValue};

/// Row counts through the merge, for the run summary.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub rows_in: usize,
    /// Cells that failed to parse and were treated as missing.
    pub unparseable: usize,
    pub missing_year: usize,
    pub before_common_era: usize,
    pub out_of_range: usize,
    pub duplicates: usize,
    /// Rows dropped at the final check for a missing field.
    pub incomplete: usize,
    pub rows_out: usize,
}

/// Row whose year is settled; the rest is still raw.
struct Dated {
    year: i64,
    magnitude: Option<RawValue>,
    event: Option<String>,
    category: Option<String>,
}

pub struct Merger {
    years: YearNormalizer,
    filter: FilterSettings,
}

impl Merger {
    pub fn new(years: YearNormalizer, filter: FilterSettings) -> Self {
        Self { years, filter }
    }

    /// Apply the run's error policy to one normalizer result.
    fn recover<T>(
        &self,
        result: std::result::Result<Option<T>, UnparseableValue>,
        stats: &mut MergeStats,
    ) -> Result<Option<T>> {
        match result {
            Ok(v) => Ok(v),
            Err(e) if self.filter.policy == ErrorPolicy::Strict => Err(e.into()),
            Err(e) => {
                warn!(field = e.field, value = %e.value, "unparseable value treated as missing");
                stats.unparseable += 1;
                Ok(None)
            }
        }
    }

    /// Concatenate the reconciled tables (document order), settle years,
    /// filter, sort, settle magnitudes, lowercase, dedupe, and keep only
    /// complete records.
    #[instrument(level = "info", skip_all, fields(tables = tables.len()))]
    pub fn merge(
        &self,
        tables: &[Vec<PartialRecord>],
    ) -> Result<(Vec<CanonicalRecord>, MergeStats)> {
        let mut stats = MergeStats::default();
        let (min, max) = (self.filter.min_year, self.filter.max_year);

        let mut dated = Vec::new();
        for record in tables.iter().flatten() {
            stats.rows_in += 1;
            let year = self.recover(self.years.normalize(record.year.as_ref()), &mut stats)?;
            let year = match year {
                None => {
                    stats.missing_year += 1;
                    continue;
                }
                Some(YearValue::BeforeCommonEra) => {
                    stats.before_common_era += 1;
                    continue;
                }
                Some(YearValue::Year(y)) if y < min || y > max => {
                    debug!(year = y, event = ?record.event, "out of range");
                    stats.out_of_range += 1;
                    continue;
                }
                Some(YearValue::Year(y)) => y,
            };
            dated.push(Dated {
                year,
                magnitude: record.magnitude.clone(),
                event: record.event.clone(),
                category: record.category.clone(),
            });
        }

        // stable: equal years keep document order
        dated.sort_by_key(|r| r.year);

        let mut seen: HashSet<(i64, Option<String>, Option<String>)> = HashSet::new();
        let mut out = Vec::with_capacity(dated.len());
        for row in dated {
            let magnitude = match normalize_magnitude(row.magnitude.as_ref()) {
                Ok(Some(m)) if m < 0 => Err(UnparseableValue::new("magnitude", m.to_string())),
                other => other,
            };
            let magnitude = self.recover(magnitude, &mut stats)?;
            let event = row.event.map(|e| e.to_lowercase());
            let category = row.category.map(|c| c.to_lowercase());

            if !seen.insert((row.year, event.clone(), category.clone())) {
                debug!(year = row.year, ?event, ?category, "duplicate dropped");
                stats.duplicates += 1;
                continue;
            }
            match (magnitude, event, category) {
                (Some(magnitude), Some(event), Some(category)) => out.push(CanonicalRecord {
                    year: row.year,
                    magnitude,
                    event,
                    category,
                }),
                _ => stats.incomplete += 1,
            }
        }

        stats.rows_out = out.len();
        info!(?stats, "merged");
        Ok((out, stats))
    }
}
