// src/normalize/year.rs

use crate::error::UnparseableValue;
use crate::record::RawValue;

use super::rules::{ANNOTATIONS, RANGE_SEPARATOR};

/// Value written in place of an open-ended "… – present" span.
pub const DEFAULT_PRESENT_YEAR: i64 = 2024;

/// Outcome of year normalization for a present cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearValue {
    Year(i64),
    /// The source marks the date as BC; such rows are discarded.
    BeforeCommonEra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearNormalizer {
    pub present_year: i64,
}

impl Default for YearNormalizer {
    fn default() -> Self {
        Self {
            present_year: DEFAULT_PRESENT_YEAR,
        }
    }
}

impl YearNormalizer {
    pub fn new(present_year: i64) -> Self {
        Self { present_year }
    }

    pub fn normalize(
        &self,
        raw: Option<&RawValue>,
    ) -> Result<Option<YearValue>, UnparseableValue> {
        let text = match raw {
            None => return Ok(None),
            Some(RawValue::Integer(n)) => return Ok(Some(YearValue::Year(*n))),
            Some(RawValue::Text(s)) => s,
        };
        let token = match self.year_token(text) {
            Some(t) => t,
            None => return Ok(None),
        };
        if token == "BC" {
            return Ok(Some(YearValue::BeforeCommonEra));
        }
        token
            .parse::<i64>()
            .map(|y| Some(YearValue::Year(y)))
            .map_err(|_| UnparseableValue::new("year", text.as_str()))
    }

    /// The textual year a cell stands for: the end of a span, or the last
    /// word of a date. `None` for blank cells.
    pub fn year_token(&self, text: &str) -> Option<String> {
        // annotations first: "1931 (est. 1930-31)" must not read as a span
        let cleaned = ANNOTATIONS.apply(text);
        let relevant = match RANGE_SEPARATOR.find(&cleaned) {
            Some(sep) => {
                let end = cleaned[sep.end()..].trim();
                if end.eq_ignore_ascii_case("present") {
                    return Some(self.present_year.to_string());
                }
                end
            }
            None => cleaned.as_str(),
        };
        relevant.split_whitespace().last().map(str::to_string)
    }
}

/// [`YearNormalizer::normalize`] with the default present-year.
pub fn normalize_year(raw: Option<&RawValue>) -> Result<Option<YearValue>, UnparseableValue> {
    YearNormalizer::default().normalize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawValue {
        RawValue::from(s)
    }

    fn year(s: &str) -> Option<YearValue> {
        normalize_year(Some(&text(s))).unwrap()
    }

    #[test]
    fn span_takes_end_year() {
        assert_eq!(year("1920\u{2013}1922"), Some(YearValue::Year(1922)));
        assert_eq!(year("1918-1920[12]"), Some(YearValue::Year(1920)));
        assert_eq!(year("1958 \u{2013} 1962 (est.)"), Some(YearValue::Year(1962)));
    }

    #[test]
    fn present_maps_to_fixed_year() {
        assert_eq!(year("2019 \u{2013} present"), Some(YearValue::Year(2024)));
        assert_eq!(
            YearNormalizer::new(2030)
                .normalize(Some(&text("2020-Present")))
                .unwrap(),
            Some(YearValue::Year(2030))
        );
    }

    #[test]
    fn full_date_takes_last_token() {
        assert_eq!(year("December 26, 2004"), Some(YearValue::Year(2004)));
        assert_eq!(year("1931"), Some(YearValue::Year(1931)));
        assert_eq!(year("July 1930 \u{2013} August 5, 1931"), Some(YearValue::Year(1931)));
        assert_eq!(year("January 12, 2010[7]"), Some(YearValue::Year(2010)));
    }

    #[test]
    fn bc_is_a_sentinel() {
        assert_eq!(year("1600 BC"), Some(YearValue::BeforeCommonEra));
    }

    #[test]
    fn hyphen_inside_annotation_is_not_a_span() {
        assert_eq!(year("1931 (est. 1930-31)"), Some(YearValue::Year(1931)));
        assert_eq!(year("1976[note-4]"), Some(YearValue::Year(1976)));
    }

    #[test]
    fn integers_and_missing_pass_through() {
        assert_eq!(
            normalize_year(Some(&RawValue::Integer(1883))).unwrap(),
            Some(YearValue::Year(1883))
        );
        assert_eq!(normalize_year(None).unwrap(), None);
        assert_eq!(year("  "), None);
    }

    #[test]
    fn garbage_is_unparseable() {
        let err = normalize_year(Some(&text("sometime"))).unwrap_err();
        assert_eq!(err.field, "year");
        assert_eq!(err.value, "sometime");
    }
}
