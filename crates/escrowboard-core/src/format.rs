//! Money and count formatting for plain-text output.

/// `$1,234,567` style amount. Fractions keep up to two decimals with
/// trailing zeros trimmed; non-finite values render as `$0`.
#[must_use]
pub fn money(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let rounded = (value * 100.0).round() / 100.0;
    let sign = if rounded < 0.0 { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut out = format!("{sign}${}", group_thousands(whole));
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Compact axis label in thousands: `$1200k`.
#[must_use]
pub fn money_k(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    format!("${}k", (value / 1000.0).round() as i64)
}

/// `1 job`, `2 jobs`.
#[must_use]
pub fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
