//! Duration strings used in configuration: `90s`, `500ms`, `1h30m`.

use std::time::Duration;

/// Parse a duration made of one or more `<number><unit>` terms.
///
/// Units are `h`, `m`, `s`, `ms`, `us` (or `µs`) and `ns`; numbers may be
/// fractional and a leading `+` is allowed. The only unitless value is
/// `0`. Negative durations and totals that overflow are rejected.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    if s == "0" {
        return Some(Duration::ZERO);
    }
    if s.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let value: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 1e-3,
            "us" | "µs" => 1e-6,
            "ns" => 1e-9,
            _ => return None,
        };
        rest = &rest[unit_len..];

        let term = Duration::try_from_secs_f64(value * scale).ok()?;
        total = total.checked_add(term)?;
    }
    Some(total)
}

/// Render `d` in the form [`parse_duration`] reads, largest units first.
pub fn format_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_string();
    }
    let secs = d.as_secs();
    let mut out = String::new();
    for (value, unit) in [(secs / 3600, "h"), (secs / 60 % 60, "m"), (secs % 60, "s")] {
        if value > 0 {
            out.push_str(&format!("{value}{unit}"));
        }
    }
    let nanos = d.subsec_nanos();
    if nanos > 0 {
        let term = if nanos % 1_000_000 == 0 {
            format!("{}ms", nanos / 1_000_000)
        } else if nanos % 1_000 == 0 {
            format!("{}us", nanos / 1_000)
        } else {
            format!("{nanos}ns")
        };
        out.push_str(&term);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_units() {
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn compound_terms_add_up() {
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1m30s"), Some(Duration::from_secs(90)));
    }

    #[test]
    fn fractional_values() {
        assert_eq!(parse_duration("1.5h"), Some(Duration::from_secs(5400)));
    }

    #[test]
    fn only_zero_may_omit_the_unit() {
        assert_eq!(parse_duration("0"), Some(Duration::ZERO));
        assert_eq!(parse_duration("+0"), Some(Duration::ZERO));
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("1h10"), None);
    }

    #[test]
    fn sign_handling() {
        assert_eq!(parse_duration("+5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("-5m"), None);
        assert_eq!(parse_duration("+"), None);
    }

    #[test]
    fn overflowing_total_is_rejected() {
        assert_eq!(
            parse_duration("10000000000000000000s10000000000000000000s"),
            None
        );
        assert_eq!(parse_duration("9999999999999999999999h"), None);
    }

    #[test]
    fn formats_largest_units_first() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
        assert_eq!(format_duration(Duration::from_secs(3601)), "1h1s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1s500ms");
        assert_eq!(format_duration(Duration::from_micros(7)), "7us");
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("h"), None);
        assert_eq!(parse_duration("10 minutes"), None);
        assert_eq!(parse_duration("5d"), None);
        assert_eq!(parse_duration("1.2.3s"), None);
    }
}
