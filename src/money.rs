//! Fee schedule and dollar arithmetic of the desk.
//!
//! Everything is quoted in USD with two-decimal precision: crypto transfers
//! carry a 5 % fee, every other payment method 10 %, and no exchange goes
//! below the minimum service fee.

/// Minimum service fee in dollars. Non-negotiable.
pub const MIN_FEE: f64 = 3.0;

/// Fee and payout for a given send amount.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quote {
    pub fee: f64,
    pub net: f64,
}

/// Quotes `amount` dollars sent via `method`.
///
/// The rate depends on the *send* method only; what the client receives on
/// the other side never changes the fee.
pub fn quote(amount: f64, method: &str) -> Quote {
    let rate = if method.eq_ignore_ascii_case("crypto") {
        0.05
    } else {
        0.10
    };
    let fee = round2(amount * rate).max(MIN_FEE);
    Quote {
        fee,
        net: round2(amount - fee),
    }
}

/// Rounds to whole cents, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parses a user-entered dollar amount.
///
/// Dollar signs and thousands separators are tolerated; anything
/// non-numeric, negative or non-finite is not.
pub fn parse(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ','))
        .collect();
    let value: f64 = cleaned.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Formats a dollar value with thousands separators: `1234.5` → `1,234.50`.
pub fn usd(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let dollars = (cents / 100).to_string();
    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, digit) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{sign}{grouped}.{:02}", cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_ten_percent_for_fiat() {
        assert_eq!(quote(200.0, "PayPal"), Quote { fee: 20.0, net: 180.0 });
        assert_eq!(quote(100.0, "Zelle"), Quote { fee: 10.0, net: 90.0 });
    }

    #[test]
    fn quotes_five_percent_for_crypto() {
        assert_eq!(quote(100.0, "Crypto"), Quote { fee: 5.0, net: 95.0 });
        assert_eq!(quote(200.0, "crypto"), Quote { fee: 10.0, net: 190.0 });
    }

    #[test]
    fn floors_at_minimum_fee() {
        // 5 % of 50 is 2.50, below the 3.00 floor.
        assert_eq!(quote(50.0, "Crypto"), Quote { fee: 3.0, net: 47.0 });
        assert_eq!(quote(10.0, "Venmo"), Quote { fee: 3.0, net: 7.0 });
    }

    #[test]
    fn minimum_fee_boundary_is_exact() {
        // 10 % of 30 lands exactly on the floor.
        assert_eq!(quote(30.0, "PayPal"), Quote { fee: 3.0, net: 27.0 });
        assert_eq!(quote(60.0, "Crypto"), Quote { fee: 3.0, net: 57.0 });
    }

    #[test]
    fn quotes_round_to_cents() {
        assert_eq!(quote(33.33, "PayPal"), Quote { fee: 3.33, net: 30.0 });
    }

    #[test]
    fn parses_decorated_amounts() {
        assert_eq!(parse("200"), Some(200.0));
        assert_eq!(parse("$1,234.56"), Some(1234.56));
        assert_eq!(parse("  12.5 "), Some(12.5));
        assert_eq!(parse("0"), Some(0.0));
    }

    #[test]
    fn rejects_junk_amounts() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("abc"), None);
        assert_eq!(parse("-5"), None);
        assert_eq!(parse("1 000"), None);
        assert_eq!(parse("NaN"), None);
        assert_eq!(parse("inf"), None);
    }

    #[test]
    fn formats_with_thousands_separators() {
        assert_eq!(usd(0.0), "0.00");
        assert_eq!(usd(7.5), "7.50");
        assert_eq!(usd(1234.5), "1,234.50");
        assert_eq!(usd(1_000_000.0), "1,000,000.00");
    }
}
