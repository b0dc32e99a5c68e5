// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Direction of a quality signal over its observation window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
    #[default]
    Unknown,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare a defect-style count (lower is better) between an older and a
/// newer observation.
pub fn count_trend(older: u64, newer: u64) -> TrendDirection {
    match newer.cmp(&older) {
        std::cmp::Ordering::Less => TrendDirection::Improving,
        std::cmp::Ordering::Equal => TrendDirection::Stable,
        std::cmp::Ordering::Greater => TrendDirection::Declining,
    }
}

/// Compare a rate-style value (higher is better) between window halves,
/// treating changes inside `band` as stable.
pub fn rate_trend(older: f64, newer: f64, band: f64) -> TrendDirection {
    let delta = newer - older;
    if delta > band {
        TrendDirection::Improving
    } else if delta < -band {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

/// Compare a usage-style mean (lower is better) between window halves,
/// treating changes inside `band` as stable.
pub fn usage_trend(older: f64, newer: f64, band: f64) -> TrendDirection {
    let delta = newer - older;
    if delta > band {
        TrendDirection::Declining
    } else if delta < -band {
        TrendDirection::Improving
    } else {
        TrendDirection::Stable
    }
}

#[cfg(test)]
#[path = "trend_tests.rs"]
mod tests;
