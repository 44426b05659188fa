//! Shared helpers for frequency formatting and hex normalization, used by
//! more than one formatter.

use serde_json::Value;

/// Format a frequency given in MHz, trimming trailing zeros but always
/// keeping at least one digit after the decimal point (e.g. `10.5`, not
/// `10.500000` or `10`).
pub fn format_mhz_trim(mhz: f64) -> String {
    let mut s = format!("{mhz:.6}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.push('0');
        }
    }
    s
}

/// Truncate (not round) to one decimal place.
pub fn truncate_1dp(v: f64) -> f64 {
    (v * 10.0).trunc() / 10.0
}

/// A value that may be a JSON number or a JSON string; which one it is
/// changes the icao-hex derivation rule.
pub enum IcaoSource {
    Numeric(i64),
    Text(String),
}

pub fn icao_source_from_json(v: &Value) -> Option<IcaoSource> {
    match v {
        Value::Number(n) => n.as_i64().map(IcaoSource::Numeric),
        Value::String(s) if !s.is_empty() => Some(IcaoSource::Text(s.clone())),
        _ => None,
    }
}

/// Compute the 6-character, zero-padded, uppercase hex ICAO step 3:
/// numeric values format directly to hex; strings made up only of hex
/// digits (and containing at least one hex letter) are uppercased and
/// padded; anything else is parsed as decimal before formatting.
pub fn normalize_icao_hex(src: IcaoSource) -> String {
    match src {
        IcaoSource::Numeric(n) => format!("{n:06X}"),
        IcaoSource::Text(s) => {
            let upper = s.to_ascii_uppercase();
            let is_hex_digits = !upper.is_empty() && upper.chars().all(|c| c.is_ascii_hexdigit());
            let has_hex_letter = upper.chars().any(|c| c.is_ascii_hexdigit() && !c.is_ascii_digit());
            if is_hex_digits && has_hex_letter {
                format!("{upper:0>6}")
            } else if let Ok(n) = upper.parse::<i64>() {
                format!("{n:06X}")
            } else {
                format!("{upper:0>6}")
            }
        }
    }
}

/// Parse a raw icao JSON value straight to the 6-char hex form, or `None`
/// if absent.
pub fn icao_hex_from_json(v: Option<&Value>) -> Option<String> {
    let v = v?;
    icao_source_from_json(v).map(normalize_icao_hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_zeros_but_keeps_one_decimal() {
        assert_eq!(format_mhz_trim(10.5), "10.5");
        assert_eq!(format_mhz_trim(136.975), "136.975");
        assert_eq!(format_mhz_trim(10.0), "10.0");
    }

    #[test]
    fn truncates_instead_of_rounding() {
        assert_eq!(truncate_1dp(-12.37), -12.3);
        assert_eq!(truncate_1dp(12.39), 12.3);
    }

    #[test]
    fn icao_hex_numeric_formats_directly() {
        assert_eq!(
            normalize_icao_hex(IcaoSource::Numeric(0xA1B2C3)),
            "A1B2C3"
        );
        assert_eq!(normalize_icao_hex(IcaoSource::Numeric(0xF)), "00000F");
    }

    #[test]
    fn icao_hex_text_with_hex_letters_is_padded_and_uppercased() {
        assert_eq!(
            normalize_icao_hex(IcaoSource::Text("a1b2c3".to_owned())),
            "A1B2C3"
        );
        assert_eq!(
            normalize_icao_hex(IcaoSource::Text("1f".to_owned())),
            "00001F"
        );
    }

    #[test]
    fn icao_hex_all_decimal_digits_is_parsed_as_decimal() {
        assert_eq!(
            normalize_icao_hex(IcaoSource::Text("291".to_owned())),
            "000123"
        );
    }
}
