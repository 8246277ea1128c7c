// src/normalize/rules.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use tracing::trace;

/// One regex substitution, applied to every match.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pub name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

impl RewriteRule {
    /// Rules are built from literals, so an invalid pattern is a bug.
    pub fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("rewrite rule pattern should compile"),
            replacement,
        }
    }

    pub fn apply<'a>(&self, input: &'a str) -> Cow<'a, str> {
        self.pattern.replace_all(input, self.replacement)
    }
}

/// Ordered list of rules, applied left to right.
#[derive(Debug, Clone, Default)]
pub struct RuleChain {
    rules: Vec<RewriteRule>,
}

impl RuleChain {
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    /// Extend this chain with every rule of `other`, after its own.
    pub fn then(mut self, other: &RuleChain) -> Self {
        self.rules.extend(other.rules.iter().cloned());
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    pub fn apply(&self, input: &str) -> String {
        let mut out = input.to_string();
        for rule in &self.rules {
            if let Cow::Owned(rewritten) = rule.apply(&out) {
                trace!(rule = rule.name, before = %out, after = %rewritten, "rewrite");
                out = rewritten;
            }
        }
        out.trim().to_string()
    }
}

/// `[3]`, `[note 1]`, `(est.)` and friends.
pub static ANNOTATIONS: Lazy<RuleChain> = Lazy::new(|| {
    RuleChain::new(vec![
        RewriteRule::new("brackets", r"\[[^\]]*\]", ""),
        RewriteRule::new("parentheses", r"\([^)]*\)", ""),
    ])
});

/// Cleanup applied to a magnitude once the `million` marker is gone.
pub static MAGNITUDE: Lazy<RuleChain> = Lazy::new(|| {
    ANNOTATIONS.clone().then(&RuleChain::new(vec![
        RewriteRule::new("thousands_separator", ",", ""),
        RewriteRule::new("approximation", "~", ""),
        RewriteRule::new("dash", "[\u{2212}\u{2013}\u{2014}]", "-"),
        RewriteRule::new("dash_spacing", r"\s*-\s*", "-"),
        RewriteRule::new("whitespace", r"\s+", " "),
    ]))
});

/// Matches any range separator accepted in free text.
pub static RANGE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new("[-\u{2013}\u{2014}]").expect("separator regex should compile"));

/// `million` / `millions`, any case.
pub static MILLION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)millions?").expect("million regex should compile"));
