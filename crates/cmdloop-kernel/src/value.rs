//! String value coercion.
//!
//! Variables are always stored as text. These helpers compute the boolean
//! and numeric readings on demand; nothing here is ever stored back.

/// Parse a strict boolean spelling (`1 t T TRUE true True` / `0 f F FALSE false False`).
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Boolean reading with fallback: a strict boolean, else "non-empty".
pub fn bool_value(s: &str) -> bool {
    parse_bool(s).unwrap_or(!s.is_empty())
}

/// Bare truthiness used by `if value body`: empty and `"0"` are false.
pub fn truthy(s: &str) -> bool {
    !(s.is_empty() || s == "0")
}

/// Parse a base-10 integer.
pub fn parse_int(s: &str) -> Option<i64> {
    s.trim().parse().ok()
}

/// Parse a float.
pub fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse().ok()
}

/// Render a number with three decimals, dropping an all-zero fraction.
pub fn format_float(v: f64) -> String {
    let s = format!("{v:.3}");
    match s.strip_suffix(".000") {
        Some(whole) => whole.to_string(),
        None => s,
    }
}

/// Render an integer in the given radix (2..=36), lowercase digits.
pub fn format_radix(v: i64, radix: u32) -> String {
    let radix = radix.clamp(2, 36);
    if radix == 10 {
        return v.to_string();
    }

    let negative = v < 0;
    let mut n = v.unsigned_abs();
    if n == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while n > 0 {
        let d = (n % radix as u64) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap_or('?'));
        n /= radix as u64;
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_bools() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("F"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn bool_value_falls_back_to_non_empty() {
        assert!(bool_value("yes"));
        assert!(!bool_value(""));
        assert!(!bool_value("false"));
        assert!(bool_value("1"));
    }

    #[test]
    fn bare_truthiness() {
        assert!(!truthy(""));
        assert!(!truthy("0"));
        assert!(truthy("false"));
        assert!(truthy("x"));
    }

    #[test]
    fn float_formatting() {
        assert_eq!(format_float(3.0), "3");
        assert_eq!(format_float(-2.0), "-2");
        assert_eq!(format_float(1.5), "1.500");
        assert_eq!(format_float(1.0 / 3.0), "0.333");
    }

    #[test]
    fn radix_formatting() {
        assert_eq!(format_radix(255, 16), "ff");
        assert_eq!(format_radix(-5, 2), "-101");
        assert_eq!(format_radix(0, 8), "0");
        assert_eq!(format_radix(42, 10), "42");
        assert_eq!(format_radix(35, 99), "z");
    }
}
