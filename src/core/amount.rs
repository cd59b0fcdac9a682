//! Monetary amounts
//!
//! All arithmetic inside the crate is done on integer zatoshi. Decimal ZEC
//! values are only accepted at the boundary and are rounded to the nearest
//! base unit before any arithmetic happens.

use thiserror::Error;

/// Zatoshi per ZEC
pub const COIN: u64 = 100_000_000;

/// Number of fractional digits of one ZEC
pub const DECIMALS: usize = 8;

/// Maximum money supply in zatoshi
pub const MAX_MONEY: u64 = 21_000_000 * COIN;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount is negative or not a finite number: {0}")]
    NotRepresentable(String),
    #[error("Amount exceeds the money supply: {0}")]
    TooLarge(String),
    #[error("Malformed decimal amount: {0}")]
    Malformed(String),
}

/// Convert a floating point ZEC value to zatoshi, rounding to the nearest unit
pub fn zec_to_zatoshi(value: f64) -> Result<u64, AmountError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AmountError::NotRepresentable(value.to_string()));
    }
    let zatoshi = (value * COIN as f64).round();
    if zatoshi > MAX_MONEY as f64 {
        return Err(AmountError::TooLarge(value.to_string()));
    }
    Ok(zatoshi as u64)
}

/// Parse a decimal ZEC string (e.g. `"0.0001"`) into zatoshi without any
/// floating point step. At most eight fractional digits are accepted.
pub fn parse_zec(text: &str) -> Result<u64, AmountError> {
    let text = text.trim();
    let malformed = || AmountError::Malformed(text.to_string());

    let (whole, fraction) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(malformed());
    }
    if fraction.len() > DECIMALS
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(malformed());
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| malformed())?
    };
    let fraction: u64 = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<width$}", width = DECIMALS)
            .parse()
            .map_err(|_| malformed())?
    };

    let zatoshi = whole
        .checked_mul(COIN)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| AmountError::TooLarge(text.to_string()))?;
    if zatoshi > MAX_MONEY {
        return Err(AmountError::TooLarge(text.to_string()));
    }
    Ok(zatoshi)
}

/// Render zatoshi as a decimal ZEC string with eight fractional digits
pub fn format_zec(zatoshi: u64) -> String {
    format!("{}.{:08}", zatoshi / COIN, zatoshi % COIN)
}
