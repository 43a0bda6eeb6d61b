use super::*;

#[test]
fn format_number_millions() {
    assert_eq!(format_number(1_260_000.0), "1.3M");
    assert_eq!(format_number(1_000_000.0), "1.0M");
    assert_eq!(format_number(-2_500_000.0), "-2.5M");
}

#[test]
fn format_number_thousands() {
    assert_eq!(format_number(1_000.0), "1.0K");
    assert_eq!(format_number(45_678.0), "45.7K");
    assert_eq!(format_number(999_949.0), "999.9K");
}

#[test]
fn format_number_plain_values() {
    assert_eq!(format_number(512.0), "512");
    assert_eq!(format_number(12.5), "12.5");
    assert_eq!(format_number(0.125_4), "0.125");
    assert_eq!(format_number(0.0), "0");
    assert_eq!(format_number(-0.000_1), "0");
    assert_eq!(format_number(-42.0), "-42");
}

#[test]
fn format_number_non_finite() {
    assert_eq!(format_number(f64::NAN), "-");
    assert_eq!(format_number(f64::INFINITY), "-");
}

#[test]
fn format_currency_abbreviates_like_numbers() {
    assert_eq!(format_currency(3_400_000.0), "$3.4M");
    assert_eq!(format_currency(84_200.0), "$84.2K");
}

#[test]
fn format_currency_plain_has_two_decimals() {
    assert_eq!(format_currency(84.2), "$84.20");
    assert_eq!(format_currency(0.0), "$0.00");
    assert_eq!(format_currency(999.994), "$999.99");
}

#[test]
fn format_currency_negative_puts_sign_first() {
    assert_eq!(format_currency(-12.5), "-$12.50");
    assert_eq!(format_currency(-1_500.0), "-$1.5K");
    assert_eq!(format_currency(-0.001), "$0.00");
}

#[test]
fn group_thousands_inserts_separators() {
    assert_eq!(group_thousands("1234567"), "1,234,567");
    assert_eq!(group_thousands("1234.50"), "1,234.50");
    assert_eq!(group_thousands("-999"), "-999");
    assert_eq!(group_thousands("100"), "100");
    assert_eq!(group_thousands("-1000"), "-1,000");
}
