//! Compact formatting helpers for log output.

use std::fmt;

use crate::types::TimeNs;

/// Nanosecond timestamp with underscore-grouped digits and a `ns` suffix.
///
/// Examples:
/// - `0` → `0 ns`
/// - `1_000` → `1_000 ns`
/// - `20_000_000` → `20_000_000 ns`
pub struct FmtNs(pub TimeNs);

impl fmt::Display for FmtNs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ns", fmt_grouped(self.0))
    }
}

/// Format a u64 with underscore grouping (groups of 3 from the right).
pub(crate) fn fmt_grouped(v: u64) -> String {
    let digits = v.to_string();
    let len = digits.len();
    if len <= 3 {
        return digits;
    }
    let mut result = String::with_capacity(len + (len - 1) / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push('_');
        }
        result.push(ch);
    }
    result
}
