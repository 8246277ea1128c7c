// src/normalize/magnitude.rs

use crate::error::UnparseableValue;
use crate::record::RawValue;

use super::rules::{ANNOTATIONS, MAGNITUDE, MILLION};

const MILLION_FACTOR: f64 = 1_000_000.0;

/// Turn a death-toll cell into one integer.
///
/// Rules, in order:
/// 1. a `million(s)` marker outside annotations is removed and remembered as
///    a ×1,000,000 factor;
/// 2. annotations, thousands separators and `~` are stripped, dashes unified;
/// 3. a trailing `+` is dropped and the bound itself is kept (`20000+` → 20000);
/// 4. `L-H` yields ⌊(L+H)/2⌋, scaled once afterwards if a factor is pending;
///    decimal bounds (`1.5-2 million`) are scaled first, then floored;
/// 5. otherwise the plain number, scaled in floating point if needed.
///
/// Because step 3 runs before step 4, `6000-12000+` reads as the range
/// `6000-12000`. Non-finite numbers and values past `i64` are unparseable.
pub fn normalize_magnitude(raw: Option<&RawValue>) -> Result<Option<i64>, UnparseableValue> {
    let original = match raw {
        None => return Ok(None),
        Some(RawValue::Integer(n)) => return Ok(Some(*n)),
        Some(RawValue::Text(s)) => s.as_str(),
    };
    let unparseable = || UnparseableValue::new("magnitude", original);

    // "500,000 (1 million est.)" is not in millions
    let bare = ANNOTATIONS.apply(original);
    let pending_million = MILLION.is_match(&bare);
    let unscaled = MILLION.replace_all(&bare, "");
    let cleaned = MAGNITUDE.apply(&unscaled);
    let text = cleaned.strip_suffix('+').unwrap_or(&cleaned).trim();
    if text.is_empty() {
        return Ok(None);
    }

    let value = if let Some((low, high)) = text.split_once('-') {
        let (low, high) = (low.trim(), high.trim());
        match (low.parse::<i64>(), high.parse::<i64>()) {
            (Ok(low), Ok(high)) => {
                let midpoint = low.checked_add(high).ok_or_else(unparseable)?.div_euclid(2);
                if pending_million {
                    midpoint.checked_mul(1_000_000).ok_or_else(unparseable)?
                } else {
                    midpoint
                }
            }
            _ if pending_million => {
                let low = parse_finite(low).ok_or_else(unparseable)?;
                let high = parse_finite(high).ok_or_else(unparseable)?;
                to_count((low + high) / 2.0 * MILLION_FACTOR).ok_or_else(unparseable)?
            }
            _ => return Err(unparseable()),
        }
    } else if pending_million {
        let n = parse_finite(text).ok_or_else(unparseable)?;
        to_count(n * MILLION_FACTOR).ok_or_else(unparseable)?
    } else {
        parse_plain(text).ok_or_else(unparseable)?
    };

    if value < 0 {
        return Err(unparseable());
    }
    Ok(Some(value))
}

/// Integer, or a decimal truncated toward zero.
fn parse_plain(text: &str) -> Option<i64> {
    text.parse::<i64>()
        .ok()
        .or_else(|| parse_finite(text).and_then(|f| to_count(f.trunc())))
}

/// `inf` and `NaN` parse as `f64` but are not tolls.
fn parse_finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Floor to an integer; `None` when `i64` cannot hold it.
fn to_count(value: f64) -> Option<i64> {
    let floored = value.floor();
    (floored.is_finite() && floored.abs() < i64::MAX as f64).then_some(floored as i64)
}
