// src/normalize/category.rs

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::rules::ANNOTATIONS;

/// Any label containing one of `needles` collapses to `canonical`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymCluster {
    pub needles: Vec<String>,
    pub canonical: String,
}

impl SynonymCluster {
    pub fn new(needles: &[&str], canonical: &str) -> Self {
        Self {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            canonical: canonical.to_string(),
        }
    }

    fn matches(&self, label: &str) -> bool {
        self.needles.iter().any(|n| label.contains(n.as_str()))
    }
}

pub fn default_synonyms() -> Vec<SynonymCluster> {
    vec![
        SynonymCluster::new(&["avalanche", "landslip"], "landslide"),
        SynonymCluster::new(&["cyclone"], "tropical cyclone"),
    ]
}

static DEFAULT: Lazy<CategoryNormalizer> = Lazy::new(CategoryNormalizer::default);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNormalizer {
    synonyms: Vec<SynonymCluster>,
}

impl Default for CategoryNormalizer {
    fn default() -> Self {
        Self::new(default_synonyms())
    }
}

impl CategoryNormalizer {
    pub fn new(synonyms: Vec<SynonymCluster>) -> Self {
        let synonyms = synonyms
            .into_iter()
            .map(|c| SynonymCluster {
                needles: c.needles.iter().map(|n| n.to_lowercase()).collect(),
                canonical: c.canonical,
            })
            .collect();
        Self { synonyms }
    }

    /// Lowercase, `_` → space, synonym clusters, then drop one trailing `s`.
    ///
    /// The `s` strip is naive: "mass" becomes "mas". Canonical labels of
    /// synonym clusters are returned untouched.
    pub fn normalize(&self, raw: Option<&str>) -> Option<String> {
        let label = raw?.trim().to_lowercase().replace('_', " ");
        if label.is_empty() {
            return None;
        }
        if let Some(cluster) = self.synonyms.iter().find(|c| c.matches(&label)) {
            return Some(cluster.canonical.clone());
        }
        match label.strip_suffix('s') {
            Some(stem) if !stem.is_empty() => Some(stem.to_string()),
            _ => Some(label),
        }
    }

    /// Category from the last word of an event description,
    /// e.g. "1931 China floods" → "flood".
    pub fn from_description(&self, text: Option<&str>) -> Option<String> {
        let cleaned = ANNOTATIONS.apply(text?);
        let last = cleaned.split_whitespace().last()?;
        self.normalize(Some(last))
    }
}

/// [`CategoryNormalizer::normalize`] with the default synonym clusters.
pub fn normalize_category(raw: Option<&str>) -> Option<String> {
    DEFAULT.normalize(raw)
}

/// [`CategoryNormalizer::from_description`] with the default synonym clusters.
pub fn normalize_category_from_description(text: Option<&str>) -> Option<String> {
    DEFAULT.from_description(text)
}
