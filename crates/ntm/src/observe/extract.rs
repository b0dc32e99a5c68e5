// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Numeric signal extraction from sampled terminal text.

use regex::Regex;

/// Extract the first capture group of `re` as a float.
///
/// Thousands separators inside the captured group are tolerated
/// (`"1,234.5"` parses as `1234.5`).
pub fn extract_float(re: &Regex, text: &str) -> Option<f64> {
    let caps = re.captures(text)?;
    let raw = caps.get(1)?.as_str().replace(',', "");
    raw.parse().ok()
}

/// Extract the first capture group of `re` as an unsigned integer,
/// tolerating thousands separators.
pub fn extract_u64(re: &Regex, text: &str) -> Option<u64> {
    let caps = re.captures(text)?;
    let raw = caps.get(1)?.as_str().replace(',', "");
    raw.parse().ok()
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
