// src/reconcile/mod.rs

use tracing::{debug, info, instrument};

use crate::config::ColumnAliases;
use crate::error::{PipelineError, Result};
use crate::normalize::CategoryNormalizer;
use crate::record::{CanonicalRecord, PartialRecord, RawTable, RawValue};

pub const YEAR: &str = "year";
pub const MAGNITUDE: &str = "magnitude";
pub const EVENT: &str = "event";
pub const CATEGORY: &str = "category";

/// Canonical column order of every reconciled table.
pub const CANONICAL: [&str; 4] = [YEAR, MAGNITUDE, EVENT, CATEGORY];

/// Aligns heterogeneous tables onto the four canonical columns.
pub struct Reconciler<'a> {
    aliases: &'a ColumnAliases,
    categories: &'a CategoryNormalizer,
}

/// Where a table's category values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CategorySource<'t> {
    Column(usize),
    Section(&'t str),
    Description,
}

impl<'a> Reconciler<'a> {
    pub fn new(aliases: &'a ColumnAliases, categories: &'a CategoryNormalizer) -> Self {
        Self {
            aliases,
            categories,
        }
    }

    /// Reconcile every table, failing on the first one with an unusable shape.
    #[instrument(level = "info", skip_all, fields(tables = tables.len()))]
    pub fn reconcile_all(&self, tables: &[RawTable]) -> Result<Vec<Vec<PartialRecord>>> {
        let out = tables
            .iter()
            .map(|t| self.reconcile(t))
            .collect::<Result<Vec<_>>>()?;
        info!(rows = out.iter().map(Vec::len).sum::<usize>(), "reconciled");
        Ok(out)
    }

    pub fn reconcile(&self, table: &RawTable) -> Result<Vec<PartialRecord>> {
        let columns = self.canonical_columns(&table.headers);
        let index_of = |name: &str| columns.iter().position(|c| *c == Some(name));

        let source = match (index_of(CATEGORY), table.section.as_deref()) {
            (Some(i), _) => CategorySource::Column(i),
            (None, Some(label)) => CategorySource::Section(label),
            (None, None) => CategorySource::Description,
        };

        let found = (index_of(YEAR), index_of(MAGNITUDE), index_of(EVENT));
        let (year_idx, magnitude_idx, event_idx) = match found {
            (Some(y), Some(m), Some(e)) => (y, m, e),
            (y, m, e) => {
                let mut missing = Vec::new();
                for (name, idx) in [(YEAR, y), (MAGNITUDE, m), (EVENT, e)] {
                    if idx.is_none() {
                        missing.push(name);
                    }
                }
                // a description-derived category needs the event column too
                if e.is_none() && source == CategorySource::Description {
                    missing.push(CATEGORY);
                }
                return Err(PipelineError::SchemaShape {
                    table: table.describe(),
                    missing,
                    columns: table.headers.clone(),
                });
            }
        };
        debug!(table = %table.describe(), ?source, ?columns, "column mapping");

        let section_category = match source {
            CategorySource::Section(label) => self.categories.normalize(Some(label)),
            _ => None,
        };

        let records = table
            .rows
            .iter()
            .map(|row| {
                let cell = |i: usize| row.get(i).cloned().flatten();
                let event = cell(event_idx).map(|v| v.as_text());
                let category = match source {
                    CategorySource::Column(i) => {
                        self.categories.normalize(cell(i).map(|v| v.as_text()).as_deref())
                    }
                    CategorySource::Section(_) => section_category.clone(),
                    CategorySource::Description => {
                        self.categories.from_description(event.as_deref())
                    }
                };
                PartialRecord {
                    year: cell(year_idx),
                    magnitude: cell(magnitude_idx),
                    event,
                    category,
                }
            })
            .collect();
        Ok(records)
    }

    /// Canonical name for each header (or `None` when the column is not
    /// needed). Headers are lowercased; `date` is dropped when `year`
    /// exists; each canonical name is claimed by at most one column.
    pub fn canonical_columns(&self, headers: &[String]) -> Vec<Option<&'static str>> {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let has_year = lowered.iter().any(|h| h == "year");
        let mut columns: Vec<Option<&'static str>> = vec![None; lowered.len()];
        let usable = |i: usize| !(has_year && lowered[i] == "date");

        for (canonical, aliases) in [
            (YEAR, &self.aliases.year),
            (MAGNITUDE, &self.aliases.magnitude),
            (EVENT, &self.aliases.event),
            (CATEGORY, &self.aliases.category),
        ] {
            // exact name first, then alias substrings in priority order
            let exact = lowered
                .iter()
                .position(|h| h == canonical)
                .filter(|&i| columns[i].is_none());
            let found = exact.or_else(|| {
                aliases.iter().find_map(|alias| {
                    let alias = alias.to_lowercase();
                    (0..lowered.len()).find(|&i| {
                        columns[i].is_none() && usable(i) && lowered[i].contains(alias.as_str())
                    })
                })
            });
            if let Some(i) = found {
                columns[i] = Some(canonical);
            }
        }
        columns
    }
}

/// Turn canonical records back into a single table with canonical headers.
/// Handy for re-running the pipeline over its own output.
pub fn table_from_records<'r>(
    records: impl IntoIterator<Item = &'r CanonicalRecord>,
    section: Option<String>,
) -> RawTable {
    RawTable {
        position: 0,
        section,
        headers: CANONICAL.iter().map(|c| c.to_string()).collect(),
        rows: records
            .into_iter()
            .map(|r| {
                vec![
                    Some(RawValue::Integer(r.year)),
                    Some(RawValue::Integer(r.magnitude)),
                    Some(RawValue::Text(r.event.clone())),
                    Some(RawValue::Text(r.category.clone())),
                ]
            })
            .collect(),
    }
}
