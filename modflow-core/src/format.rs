use std::fmt;

/// Fortran `ES`-style exponent notation: `1.234560E+00`.
pub fn fortran_exp(value: f64, precision: usize) -> String {
    normalize_exponent(&format!("{:.*E}", precision, value))
}

/// Shortest text for a real value that a Fortran list-directed read
/// accepts. Moderate magnitudes print as decimals with a trailing `.0`
/// when integral; tiny and huge values use a signed two-digit exponent.
pub fn fortran_general<T>(value: T) -> String
where
    T: Copy + Into<f64> + fmt::Display + fmt::UpperExp,
{
    let as_f64: f64 = value.into();
    if as_f64 == 0.0 {
        return "0.0".to_string();
    }
    if !as_f64.is_finite() {
        return format!("{}", value);
    }
    let magnitude = as_f64.abs();
    if (1e-4..1e7).contains(&magnitude) {
        let text = format!("{}", value);
        if text.contains('.') {
            text
        } else {
            format!("{}.0", text)
        }
    } else {
        normalize_exponent(&format!("{:E}", value))
    }
}

fn normalize_exponent(text: &str) -> String {
    let Some((mantissa, exponent)) = text.split_once('E') else {
        return text.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let mantissa = if mantissa.contains('.') {
        mantissa.to_string()
    } else {
        format!("{}.0", mantissa)
    };
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}E{}{:02}", mantissa, sign, exponent.abs())
}

/// Write `values` separated by single spaces, `per_line` to a line.
pub fn wrap_values<I, T>(values: I, per_line: usize, out: &mut String)
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    let per_line = per_line.max(1);
    let mut column = 0;
    for value in values {
        if column > 0 {
            out.push(' ');
        }
        out.push_str(&value.to_string());
        column += 1;
        if column == per_line {
            out.push('\n');
            column = 0;
        }
    }
    if column > 0 {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponent_has_sign_and_two_digits() {
        assert_eq!(fortran_exp(1.23456, 6), "1.234560E+00");
        assert_eq!(fortran_exp(-0.00015, 3), "-1.500E-04");
        assert_eq!(fortran_exp(2.5e120, 2), "2.50E+120");
    }

    #[test]
    fn general_integral_values_get_decimal_point() {
        assert_eq!(fortran_general(1.0f64), "1.0");
        assert_eq!(fortran_general(-9999.0f64), "-9999.0");
        assert_eq!(fortran_general(0.0f32), "0.0");
    }

    #[test]
    fn general_f32_uses_shortest_repr() {
        assert_eq!(fortran_general(0.82f32), "0.82");
        assert_eq!(fortran_general(1.7f32), "1.7");
    }

    #[test]
    fn general_small_values_use_exponent() {
        assert_eq!(fortran_general(1e-6f64), "1.0E-06");
        assert_eq!(fortran_general(8e6f64), "8.0E+06");
    }

    #[test]
    fn wrap_values_breaks_lines() {
        let mut out = String::new();
        wrap_values([1, 2, 3, 4, 5], 2, &mut out);
        assert_eq!(out, "1 2\n3 4\n5\n");
    }
}
