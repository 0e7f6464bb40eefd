pub mod api;
pub mod catalog;
pub mod client;
pub mod error;
pub mod events;
pub mod purchase;

pub use error::CatalogError;

/// Format an EDU amount for human-facing output: thousands separators,
/// fractional part only when present.
pub fn format_edu(amount: f64) -> String {
    let whole = amount.trunc() as i64;
    let frac = (amount.fract() * 100.0).round() as i64;
    let mut digits = whole.abs().to_string();
    let mut grouped = String::new();
    while digits.len() > 3 {
        let split = digits.len() - 3;
        grouped = format!(",{}{}", &digits[split..], grouped);
        digits.truncate(split);
    }
    grouped = format!("{}{}", digits, grouped);
    if whole < 0 {
        grouped = format!("-{}", grouped);
    }
    if frac.abs() > 0 {
        format!("{}.{:02} EDU", grouped, frac.abs())
    } else {
        format!("{} EDU", grouped)
    }
}
