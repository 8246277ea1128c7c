// src/config.rs

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::ConfigError;
use crate::normalize::{category::default_synonyms, year::DEFAULT_PRESENT_YEAR};
use crate::normalize::{ErrorPolicy, SynonymCluster};

pub const DEFAULT_URL: &str = "https://en.wikipedia.org/wiki/List_of_natural_disasters_by_death_toll";

/// Everything tunable about a run. Every field has a default, so a YAML
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub url: String,
    pub fetch: FetchSettings,
    pub extract: ExtractSettings,
    pub columns: ColumnAliases,
    pub normalize: NormalizeSettings,
    pub filter: FilterSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            fetch: FetchSettings::default(),
            extract: ExtractSettings::default(),
            columns: ColumnAliases::default(),
            normalize: NormalizeSettings::default(),
            filter: FilterSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub retries: u32,
    pub initial_backoff_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            retries: 2,
            initial_backoff_ms: 500,
            timeout_secs: 30,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractSettings {
    /// CSS selector for the data tables.
    pub table_selector: String,
    /// Heading tags whose label is inherited by the following tables.
    pub heading_levels: Vec<String>,
    /// Keep only tables under these sections (case-insensitive). The
    /// unlabelled first table is always kept.
    pub sections: Option<Vec<String>>,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            table_selector: "table.wikitable".to_string(),
            heading_levels: vec!["h3".to_string()],
            sections: None,
        }
    }
}

/// Header substrings that identify each canonical column, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnAliases {
    pub year: Vec<String>,
    pub magnitude: Vec<String>,
    pub event: Vec<String>,
    pub category: Vec<String>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        fn owned(v: &[&str]) -> Vec<String> {
            v.iter().map(|s| s.to_string()).collect()
        }
        Self {
            year: owned(&["year", "date"]),
            magnitude: owned(&["death toll", "deaths", "fatalities"]),
            event: owned(&["event", "name"]),
            category: owned(&["category", "type"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeSettings {
    pub present_year: i64,
    pub synonyms: Vec<SynonymCluster>,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            present_year: DEFAULT_PRESENT_YEAR,
            synonyms: default_synonyms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub min_year: i64,
    pub max_year: i64,
    pub policy: ErrorPolicy,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            min_year: 1900,
            max_year: 2025,
            policy: ErrorPolicy::Lenient,
        }
    }
}

impl Config {
    /// Defaults, overlaid with the YAML file at `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let cfg = match path {
            None => Config::default(),
            Some(p) => {
                let text = fs::read_to_string(p).map_err(|source| ConfigError::Io {
                    path: p.display().to_string(),
                    source,
                })?;
                Self::from_yaml(&text).map_err(|e| match e {
                    ConfigError::Yaml { source, .. } => ConfigError::Yaml {
                        path: p.display().to_string(),
                        source,
                    },
                    other => other,
                })?
            }
        };
        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
            path: "<inline>".to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filter.min_year > self.filter.max_year {
            return Err(ConfigError::Invalid(format!(
                "min_year {} is after max_year {}",
                self.filter.min_year, self.filter.max_year
            )));
        }
        if let Some(bad) = self
            .extract
            .heading_levels
            .iter()
            .find(|h| !matches!(h.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
        {
            return Err(ConfigError::Invalid(format!("not a heading tag: {:?}", bad)));
        }
        if scraper::Selector::parse(&self.extract.table_selector).is_err() {
            return Err(ConfigError::Invalid(format!(
                "bad table selector {:?}",
                self.extract.table_selector
            )));
        }
        let aliases = &self.columns;
        for (name, list) in [
            ("year", &aliases.year),
            ("magnitude", &aliases.magnitude),
            ("event", &aliases.event),
            ("category", &aliases.category),
        ] {
            if list.is_empty() {
                return Err(ConfigError::Invalid(format!("no aliases for column {}", name)));
            }
        }
        Ok(())
    }
}
