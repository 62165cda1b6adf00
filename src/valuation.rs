//! Valuation Calculator: reference price → express offer price.
//!
//! The offer is derived from the reference (market-index) price in four
//! steps:
//!
//! 1. dealer price    = reference × 0.78
//! 2. quick-sale      = dealer − 1 000
//! 3. rounded         = quick-sale rounded half-up to the nearest hundred
//! 4. offer           = first value ≥ rounded, stepping by 100, whose
//!    [`digit_sum`] is exactly 8
//!
//! ## Termination of step 4
//!
//! [`digit_sum`] only looks at the first five digits. For offers with at
//! most six digits the hundreds digit is among them, so every +100 step
//! changes the sum and the loop walks through every leading-digit pattern
//! in order. The longest walk below R$ 800 000 is 899 steps (from
//! 710 100 up to 800 000); above it the walk from 800 100 to 1 000 700
//! takes 2 006 steps. Seven-digit offers still have the hundreds digit in
//! the window, so the longest walk there is 8 999 steps (7 100 100 up to
//! 8 000 000). Eight-digit offers lose it and the walks grow to hundreds
//! of thousands of steps, so reference prices are capped at
//! [`MAX_REFERENCE_PRICE`], which keeps every offer below 7 800 000.
//!
//! Parsing never fails loudly: an unparseable reference yields
//! `R$ 0,00`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fraction of the reference price a dealer would pay.
pub const DEALER_FACTOR: f64 = 0.78;

/// Discount applied on top of the dealer price for a quick sale.
pub const QUICK_SALE_DISCOUNT: f64 = 1000.0;

/// Step used for rounding and for the digit-sum walk.
pub const PRICE_STEP: i64 = 100;

/// Required sum of the offer's leading digits.
pub const TARGET_DIGIT_SUM: u32 = 8;

/// Number of leading digits counted by [`digit_sum`].
pub const DIGIT_SUM_WIDTH: usize = 5;

/// Odometer reading assumed when the caller does not supply one.
pub const DEFAULT_ODOMETER_KM: u32 = 80_000;

/// Reference prices above this are treated as malformed input.
pub const MAX_REFERENCE_PRICE: f64 = 10_000_000.0;

/// Locale conventions for rendering a monetary amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyFormat {
    pub symbol: &'static str,
    pub grouping: char,
    pub decimal: char,
}

impl CurrencyFormat {
    /// Brazilian real: `R$ 80.000,00`.
    pub const BRL: CurrencyFormat = CurrencyFormat {
        symbol: "R$",
        grouping: '.',
        decimal: ',',
    };

    /// Format a whole amount with two zero decimals and locale grouping.
    pub fn format_whole(&self, amount: i64) -> String {
        let sign = if amount < 0 { "-" } else { "" };
        format!(
            "{} {}{}{}00",
            self.symbol,
            sign,
            group_digits(amount.unsigned_abs(), self.grouping),
            self.decimal
        )
    }

    /// Parse a locale-formatted amount.
    ///
    /// Everything except digits and the decimal separator is dropped, the
    /// first decimal separator becomes a `.`, and the longest numeric prefix
    /// is parsed. Returns `None` when no number remains.
    pub fn parse(&self, input: &str) -> Option<f64> {
        let kept: String = input
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == self.decimal)
            .collect();
        let normalised = kept.replacen(self.decimal, ".", 1);
        let prefix = RE_NUMERIC_PREFIX.find(&normalised)?.as_str();
        prefix.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// `1234567` → `1.234.567` (with `sep = '.'`).
pub fn group_digits(n: u64, sep: char) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(sep);
        }
        grouped.push(ch);
    }
    grouped
}

static RE_NUMERIC_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+\.?\d*|\.\d+)").unwrap());

/// Every intermediate step of one valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub reference: f64,
    pub dealer: f64,
    pub quick_sale: f64,
    pub rounded: i64,
    pub offer: i64,
    /// Number of +100 steps taken to satisfy the digit-sum rule.
    pub adjust_steps: u32,
    pub odometer_km: u32,
}

impl Valuation {
    /// Run the calculation on an already-parsed reference price.
    pub fn from_reference(reference: f64, odometer_km: u32) -> Self {
        let dealer = reference * DEALER_FACTOR;
        let quick_sale = dealer - QUICK_SALE_DISCOUNT;
        let rounded = round_to_step(quick_sale);
        let (offer, adjust_steps) = adjust_to_digit_sum(rounded);
        Self {
            reference,
            dealer,
            quick_sale,
            rounded,
            offer,
            adjust_steps,
            odometer_km,
        }
    }

    /// Offer formatted in the given currency.
    pub fn formatted_offer(&self, currency: &CurrencyFormat) -> String {
        currency.format_whole(self.offer)
    }
}

/// Parse `reference_price` and compute the valuation.
///
/// Returns `None` for malformed or out-of-range input; callers render that
/// as a zero price.
pub fn valuate(reference_price: &str, odometer_km: Option<u32>) -> Option<Valuation> {
    let reference = CurrencyFormat::BRL.parse(reference_price)?;
    if reference > MAX_REFERENCE_PRICE {
        return None;
    }
    Some(Valuation::from_reference(
        reference,
        odometer_km.unwrap_or(DEFAULT_ODOMETER_KM),
    ))
}

/// Reference price string → offer price string, both `R$ 1.234,00` style.
///
/// Malformed input yields `R$ 0,00`.
pub fn offer_price(reference_price: &str, odometer_km: Option<u32>) -> String {
    match valuate(reference_price, odometer_km) {
        Some(v) => v.formatted_offer(&CurrencyFormat::BRL),
        None => CurrencyFormat::BRL.format_whole(0),
    }
}

/// Sum of the first five digits of `n`, sign ignored.
pub fn digit_sum(n: i64) -> u32 {
    n.unsigned_abs()
        .to_string()
        .chars()
        .take(DIGIT_SUM_WIDTH)
        .filter_map(|c| c.to_digit(10))
        .sum()
}

/// Round half-up to the nearest [`PRICE_STEP`].
fn round_to_step(value: f64) -> i64 {
    let step = PRICE_STEP as f64;
    ((value / step + 0.5).floor() * step) as i64
}

/// Walk upwards in [`PRICE_STEP`] increments until the digit sum is 8.
///
/// Returns the adjusted value and the number of steps taken.
pub fn adjust_to_digit_sum(start: i64) -> (i64, u32) {
    let mut current = start;
    let mut steps = 0u32;
    while digit_sum(current) != TARGET_DIGIT_SUM {
        current += PRICE_STEP;
        steps += 1;
    }
    (current, steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_brl_amounts() {
        let brl = CurrencyFormat::BRL;
        assert_eq!(brl.parse("R$ 80.000,00"), Some(80000.0));
        assert_eq!(brl.parse("R$ 1.234,56"), Some(1234.56));
        assert_eq!(brl.parse("45000"), Some(45000.0));
        assert_eq!(brl.parse("1,2,3"), Some(1.2));
        assert_eq!(brl.parse("R$ ,50"), Some(0.5));
        assert_eq!(brl.parse(""), None);
        assert_eq!(brl.parse("consulte"), None);
        assert_eq!(brl.parse(","), None);
    }

    #[test]
    fn format_brl_amounts() {
        let brl = CurrencyFormat::BRL;
        assert_eq!(brl.format_whole(0), "R$ 0,00");
        assert_eq!(brl.format_whole(800), "R$ 800,00");
        assert_eq!(brl.format_whole(62000), "R$ 62.000,00");
        assert_eq!(brl.format_whole(1_250_000), "R$ 1.250.000,00");
        assert_eq!(brl.format_whole(-800), "R$ -800,00");
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(group_digits(0, '.'), "0");
        assert_eq!(group_digits(999, '.'), "999");
        assert_eq!(group_digits(85_000, '.'), "85.000");
        assert_eq!(group_digits(1_000_000, ','), "1,000,000");
    }

    #[test]
    fn digit_sum_counts_first_five_digits() {
        assert_eq!(digit_sum(62000), 8);
        assert_eq!(digit_sum(1234567), 15); // 1+2+3+4+5
        assert_eq!(digit_sum(-800), 8);
        assert_eq!(digit_sum(0), 0);
    }

    #[test]
    fn reference_80k_offers_62k() {
        let v = valuate("R$ 80.000,00", None).unwrap();
        assert!((v.dealer - 62400.0).abs() < 1e-6);
        assert_eq!(v.rounded, 61400);
        assert_eq!(v.offer, 62000);
        assert_eq!(v.adjust_steps, 6);
        assert_eq!(v.odometer_km, DEFAULT_ODOMETER_KM);
        assert_eq!(offer_price("R$ 80.000,00", None), "R$ 62.000,00");
    }

    #[test]
    fn already_satisfied_value_is_kept() {
        // lands exactly on 17 000 (1+7 = 8)
        let reference = (17000.0 + QUICK_SALE_DISCOUNT) / DEALER_FACTOR;
        let v = Valuation::from_reference(reference, 0);
        assert_eq!(v.rounded, 17000);
        assert_eq!(v.offer, 17000);
        assert_eq!(v.adjust_steps, 0);
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_to_step(61450.0), 61500);
        assert_eq!(round_to_step(61449.9), 61400);
        assert_eq!(round_to_step(-1050.0), -1000);
    }

    #[test]
    fn malformed_reference_degrades_to_zero() {
        assert_eq!(offer_price("sem valor", None), "R$ 0,00");
        assert_eq!(offer_price("", Some(10)), "R$ 0,00");
        assert_eq!(offer_price("R$ 9.999.999.999,00", None), "R$ 0,00");
        assert_eq!(offer_price("R$ 10.000.100,00", None), "R$ 0,00");
    }

    #[test]
    fn zero_reference_terminates() {
        let v = valuate("R$ 0,00", None).unwrap();
        assert_eq!(v.rounded, -1000);
        assert_eq!(v.offer, -800);
        assert_eq!(digit_sum(v.offer), 8);
    }

    #[test]
    fn odometer_does_not_change_price() {
        assert_eq!(
            offer_price("R$ 55.300,00", Some(10_000)),
            offer_price("R$ 55.300,00", Some(250_000))
        );
    }

    #[test]
    fn offers_satisfy_invariants_across_realistic_range() {
        let brl = CurrencyFormat::BRL;
        let mut reference = 2_000.0;
        while reference <= 1_000_000.0 {
            let v = Valuation::from_reference(reference, DEFAULT_ODOMETER_KM);
            assert_eq!(digit_sum(v.offer), TARGET_DIGIT_SUM, "reference {reference}");
            assert_eq!(v.offer % PRICE_STEP, 0, "reference {reference}");
            assert!(v.offer >= v.rounded);

            let text = v.formatted_offer(&brl);
            let reparsed = brl.parse(&text).unwrap();
            assert_eq!(brl.format_whole(reparsed as i64), text);

            reference += 137.0;
        }
    }

    #[test]
    fn adjustment_stays_under_a_thousand_steps_below_800k() {
        let mut start = 0i64;
        while start <= 800_000 {
            let (_, steps) = adjust_to_digit_sum(start);
            assert!(steps <= 1000, "{start} took {steps} steps");
            start += PRICE_STEP;
        }
    }

    #[test]
    fn adjustment_boundary_above_800k() {
        assert_eq!(adjust_to_digit_sum(800_000), (800_000, 0));
        assert_eq!(adjust_to_digit_sum(800_100), (1_000_700, 2006));
    }

    #[test]
    fn largest_accepted_reference_adjusts_quickly() {
        let v = valuate("R$ 10.000.000,00", None).unwrap();
        assert_eq!(v.rounded, 7_799_000);
        assert_eq!(v.offer, 8_000_000);
        assert!(v.adjust_steps < 9_000, "{} steps", v.adjust_steps);

        let (offer, steps) = adjust_to_digit_sum(7_100_100);
        assert_eq!((offer, steps), (8_000_000, 8_999));
    }
}
