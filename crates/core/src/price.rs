//! Price normalisation for the `R$ 1.234,56` display format.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::PriceError;

/// Currency marker prefixed to every canonical price.
pub const CURRENCY_MARKER: &str = "R$";

/// Canonical rendering of zero.
pub const ZERO_PRICE: &str = "R$ 0,00";

static PRICE_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9.,]*$").expect("failed to compile price charset regex"));

static NON_DIGIT_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9,]").expect("failed to compile price strip regex"));

static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]+\.?[0-9]*|\.[0-9]+)$").expect("failed to compile decimal regex")
});

/// Normalise free-form price text into the canonical display string.
///
/// Both `1.234,56` and `1234.56` become `R$ 1.234,56`. Text that cannot be
/// read as a number is kept verbatim behind the currency marker, see
/// [`fallback_display`].
pub fn normalize(raw: &str) -> String {
    let stripped = strip_marker(raw);
    if stripped.is_empty() {
        return ZERO_PRICE.to_string();
    }

    let cleaned = if PRICE_CHARS_RE.is_match(stripped) {
        stripped.to_string()
    } else {
        NON_DIGIT_COMMA_RE.replace_all(stripped, "").into_owned()
    };

    match parse_decimal(&disambiguate_separators(&cleaned)) {
        Some(amount) => format_amount(amount),
        None => fallback_display(raw),
    }
}

/// Rendering used when `raw` does not parse: the marker followed by the
/// untouched input. Callers doing arithmetic must expect [`to_amount`] to
/// reject the result.
pub fn fallback_display(raw: &str) -> String {
    format!("{CURRENCY_MARKER} {raw}")
}

/// Parse a price (canonical or typed by the user) into a decimal amount.
///
/// `.` is always read as a thousands separator and `,` as the decimal one.
pub fn to_amount(raw: &str) -> Result<Decimal, PriceError> {
    let stripped = strip_marker(raw);
    let candidate = stripped.replace('.', "").replace(',', ".");
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return Err(PriceError::Empty);
    }
    Decimal::from_str(candidate).map_err(|_| PriceError::Invalid(raw.trim().to_string()))
}

/// Read user-entered text the way [`normalize`] does and return its value.
///
/// Unlike [`to_amount`], a lone `.` is taken as the decimal point, so
/// `"12.5"` is twelve and a half. A leading `-` is kept, so callers see
/// negative input instead of its magnitude.
pub fn parse_amount(raw: &str) -> Result<Decimal, PriceError> {
    let stripped = strip_marker(raw);
    if stripped.is_empty() {
        return Err(PriceError::Empty);
    }
    if let Some(magnitude) = stripped.strip_prefix('-') {
        return parse_amount(magnitude).map(|amount| -amount);
    }
    to_amount(&normalize(stripped))
}

/// Render an amount as `R$ 1.234,56`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let plain = format!("{:.2}", rounded.abs());
    let (integer, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!(
        "{CURRENCY_MARKER} {sign}{},{fraction}",
        group_thousands(integer)
    )
}

fn strip_marker(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix(CURRENCY_MARKER)
        .unwrap_or(trimmed)
        .trim()
}

fn disambiguate_separators(text: &str) -> String {
    match (text.contains('.'), text.contains(',')) {
        (true, true) => text.replace('.', "").replace(',', "."),
        (false, true) => text.replace(',', "."),
        _ => text.to_string(),
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if !DECIMAL_RE.is_match(text) {
        return None;
    }
    let mut padded = String::with_capacity(text.len() + 2);
    if text.starts_with('.') {
        padded.push('0');
    }
    padded.push_str(text);
    if text.ends_with('.') {
        padded.push('0');
    }
    Decimal::from_str(&padded).ok()
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}
