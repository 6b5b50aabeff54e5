/// Format `value` with `significant_digits` significant digits, like the C `%.Ng` conversion.
///
/// Fixed notation is used when the decimal exponent `x` satisfies `-4 <= x < significant_digits`, otherwise scientific notation with an at least two digit exponent.
/// Trailing zeros (and a trailing decimal point) are removed.
///
/// ```
/// # use mdcore_data_type::format_significant;
/// assert_eq!(format_significant(0.1, 17), "0.10000000000000001");
/// assert_eq!(format_significant(1.5e-7, 9), "1.5e-07");
/// assert_eq!(format_significant(123456.0, 5), "1.2346e+05");
/// ```
#[must_use]
pub fn format_significant(value: f64, significant_digits: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let precision = significant_digits.max(1);
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    let precision = i32::try_from(precision).unwrap_or(i32::MAX);
    if exponent < -4 || exponent >= precision {
        let mantissa = strip_trailing_zeros(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    } else {
        let decimals = usize::try_from(precision - 1 - exponent).unwrap_or(0);
        strip_trailing_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn strip_trailing_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_fixed() {
        assert_eq!(format_significant(1.0, 17), "1");
        assert_eq!(format_significant(-2.5, 9), "-2.5");
        assert_eq!(format_significant(0.0001, 5), "0.0001");
        assert_eq!(format_significant(99999.0, 5), "99999");
        assert_eq!(format_significant(f64::from(1.1f32), 9), "1.10000002");
    }

    #[test]
    fn format_scientific() {
        assert_eq!(format_significant(0.00001, 5), "1e-05");
        assert_eq!(format_significant(999_999.0, 5), "1e+06");
        assert_eq!(format_significant(1.0e100, 17), "1e+100");
    }

    #[test]
    fn format_special() {
        assert_eq!(format_significant(f64::NAN, 17), "nan");
        assert_eq!(format_significant(f64::NEG_INFINITY, 17), "-inf");
        assert_eq!(format_significant(0.0, 17), "0");
    }

    #[test]
    fn format_round_trips() {
        for value in [0.1, 1.0 / 3.0, 2.0f64.sqrt(), 6.02214076e23, -1.602e-19] {
            let s = format_significant(value, 17);
            assert_eq!(s.parse::<f64>().unwrap(), value);
        }
    }
}
