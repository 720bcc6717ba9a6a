//! Normalization of human-formatted quantities such as `4.5M` or `1,234.5`.

use crate::domain::errors::NumericFormatError;

/// Trailing unit suffixes in priority order. Only the first match is applied.
const SUFFIXES: [(char, f64); 3] = [('K', 1e3), ('M', 1e6), ('B', 1e9)];

/// Parse a quantity string into a number.
///
/// Thousands separators are stripped before suffix detection; suffixes are
/// case-sensitive.
pub fn normalize(text: &str) -> Result<f64, NumericFormatError> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();

    let (number, multiplier) = SUFFIXES
        .iter()
        .find_map(|(suffix, multiplier)| {
            cleaned
                .strip_suffix(*suffix)
                .map(|number| (number, *multiplier))
        })
        .unwrap_or((cleaned, 1.0));

    let err = || NumericFormatError {
        value: cleaned.to_string(),
    };

    let value = number.trim().parse::<f64>().map_err(|_| err())?;
    if !value.is_finite() {
        return Err(err());
    }

    Ok(value * multiplier)
}
