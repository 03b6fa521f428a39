use crate::error::ValidationError;
use serde_json::Value;
use strsim::normalized_levenshtein;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Checks that an untyped parameter holds a string and returns it.
///
/// A missing (`null`) value passes as `None`; callers decide whether the
/// parameter was optional.
pub fn require_string<'a>(
    param: &str,
    value: Option<&'a Value>,
) -> Result<Option<&'a str>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ValidationError::InvalidType {
            param: format!("{param} ({other})"),
        }),
    }
}

pub fn require_known_stat<S: AsRef<str>>(
    param: &str,
    stat: &str,
    allowed: &[S],
) -> Result<(), ValidationError> {
    if allowed.iter().any(|a| a.as_ref() == stat) {
        return Ok(());
    }
    Err(ValidationError::InvalidStat {
        param: param.to_string(),
        value: stat.to_string(),
        allowed: allowed.iter().map(|a| a.as_ref().to_string()).collect(),
    })
}

/// Lowercases and strips combining accents so "Brasileirão Série A" compares
/// equal to "brasileirao serie a". Letters without a decomposition, such as
/// `Ł` or `Ø`, are kept.
pub fn fold(name: &str) -> String {
    name.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best candidate for a misspelled name, if any is reasonably close.
pub fn closest_match<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<&'a str> {
    let folded = fold(name);
    candidates
        .into_iter()
        .map(|candidate| (candidate, normalized_levenshtein(&folded, &fold(candidate))))
        .filter(|(_, score)| *score > 0.6)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(candidate, _)| candidate)
}
