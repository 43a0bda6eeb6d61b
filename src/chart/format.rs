//! Axis tick and KPI number formatting.

#[cfg(test)]
#[path = "format_test.rs"]
mod format_test;

pub const MILLION: f64 = 1_000_000.0;
pub const THOUSAND: f64 = 1_000.0;
/// Fraction digits kept on the plain (non-abbreviated) number path.
pub const PLAIN_MAX_FRACTION_DIGITS: usize = 3;

const NOT_A_NUMBER: &str = "-";

/// `1.2M`, `3.4K`, otherwise a grouped integer or decimal (`512`, `12.5`).
#[must_use]
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return NOT_A_NUMBER.to_owned();
    }
    match abbreviate(value) {
        Some(short) => short,
        None => {
            let text = trim_fraction(format!("{value:.PLAIN_MAX_FRACTION_DIGITS$}"));
            if text == "-0" { "0".to_owned() } else { group_thousands(&text) }
        }
    }
}

/// `$1.2M`, `$3.4K`, otherwise `$` with two decimals (`$512.00`).
#[must_use]
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return NOT_A_NUMBER.to_owned();
    }
    let sign = if value < 0.0 && format!("{:.2}", value.abs()) != "0.00" { "-" } else { "" };
    let magnitude = value.abs();
    let body = abbreviate(magnitude).unwrap_or_else(|| group_thousands(&format!("{magnitude:.2}")));
    format!("{sign}${body}")
}

fn abbreviate(value: f64) -> Option<String> {
    let magnitude = value.abs();
    if magnitude >= MILLION {
        Some(format!("{:.1}M", value / MILLION))
    } else if magnitude >= THOUSAND {
        Some(format!("{:.1}K", value / THOUSAND))
    } else {
        None
    }
}

fn trim_fraction(text: String) -> String {
    if !text.contains('.') {
        return text;
    }
    text.trim_end_matches('0').trim_end_matches('.').to_owned()
}

/// Insert `,` between thousands in the integer part of a plain decimal string.
#[must_use]
pub fn group_thousands(text: &str) -> String {
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
