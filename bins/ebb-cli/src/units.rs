//! Decimal rendering and parsing of 18-decimal fixed-point values.

use anyhow::{bail, Context, Result};
use ebb_core::constants::UNIT;

const DECIMALS: usize = 18;

/// Parse `"12"`, `"12.5"` or `"0.000000000000000001"` into base units.
pub fn parse_units(input: &str) -> Result<u128> {
    let input = input.trim();
    let (whole, frac) = input.split_once('.').unwrap_or((input, ""));
    if whole.is_empty() && frac.is_empty() {
        bail!("empty amount");
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        bail!("invalid amount: {input}");
    }
    if frac.len() > DECIMALS {
        bail!("{input}: at most {DECIMALS} decimal places");
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().with_context(|| format!("invalid amount: {input}"))?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<DECIMALS$}")
            .parse()
            .with_context(|| format!("invalid amount: {input}"))?
    };

    whole
        .checked_mul(UNIT)
        .and_then(|w| w.checked_add(frac))
        .with_context(|| format!("amount out of range: {input}"))
}

/// Render base units with all 18 decimals, trailing zeros trimmed.
pub fn format_units(value: u128) -> String {
    let whole = value / UNIT;
    let frac = value % UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0>DECIMALS$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
