use std::num::IntErrorKind;
use std::time::Duration;

const MAX_DELAY: Duration = Duration::from_secs(60);
pub const MAX_PRICE: i64 = 999_999_999;

/// Parses the leading integer of `raw` (surrounding whitespace and trailing
/// junk are ignored, like a form field) and clamps it into `min..=max`.
/// Returns `default` when no integer can be read; digit runs too long for
/// `i64` clamp like any other out-of-range value.
pub fn sanitize_number(raw: &str, min: i64, max: i64, default: i64) -> i64 {
    let trimmed = raw.trim_start();
    let digits_end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());

    match trimmed[..digits_end].parse::<i64>() {
        Ok(n) => n.clamp(min, max),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => max,
            IntErrorKind::NegOverflow => min,
            _ => default,
        },
    }
}

/// Strips markup-significant characters, trims and caps the length in chars.
pub fn validate_string(s: &str, max_len: usize) -> String {
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '&'))
        .collect();
    cleaned.trim().chars().take(max_len).collect()
}

pub fn format_price(amount: i64, currency: &str) -> String {
    format!(
        "{} {}",
        amount.clamp(0, MAX_PRICE),
        validate_string(currency, 10)
    )
}

pub fn clamp_delay(requested: Duration) -> Duration {
    requested.min(MAX_DELAY)
}
