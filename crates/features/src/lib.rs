//! Feature helpers for carrier scoring.
//!
//! Provides pure functions used by the recommendation engine and its glue:
//! - Location text normalization
//! - Carrier name standardization
//! - Logistic confidence discounts for thin histories
//! - Interpolated percentiles

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PercentileError {
    #[error("Cannot take a percentile of an empty set")]
    Empty,
    #[error("Non-finite value in score set: {0}")]
    NonFinite(f64),
    #[error("Percentile out of range: {0}")]
    OutOfRange(f64),
}

/// Normalize a city or province for comparison.
///
/// Lower-cases, trims, and repairs the UTF-8-read-as-Latin-1 form of "é".
pub fn normalize_location(text: &str) -> String {
    text.replace("Ã©", "e")
        .to_lowercase()
        .trim()
        .replace("ã©", "e")
        .replace('é', "e")
}

/// Canonical form of a carrier name, as used for CRM vendor lookups.
pub fn standardize_carrier_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Logistic weight in [0, 1] for a sample of `count` observations.
///
/// Equals 0.5 at `pivot` and approaches 1 as the count grows.
pub fn logistic_confidence(count: f64, pivot: f64) -> f64 {
    round_to(1.0 / (1.0 + (-(count - pivot)).exp()), 3)
}

/// Logistic weight whose exponential term is rounded to a whole number.
///
/// Every count above the pivot gets full weight, and the weight falls off
/// in coarse steps below it.
pub fn stepped_logistic_confidence(count: f64, pivot: f64) -> f64 {
    round_to(1.0 / (1.0 + (-(count - pivot)).exp().round()), 3)
}

/// Percentile `p` (0-100) of an ascending-sorted slice.
///
/// Interpolates linearly between the two closest order statistics.
pub fn percentile(sorted: &[f64], p: f64) -> Result<f64, PercentileError> {
    if !(0.0..=100.0).contains(&p) {
        return Err(PercentileError::OutOfRange(p));
    }
    if sorted.is_empty() {
        return Err(PercentileError::Empty);
    }
    if let Some(bad) = sorted.iter().find(|v| !v.is_finite()) {
        return Err(PercentileError::NonFinite(*bad));
    }

    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}
