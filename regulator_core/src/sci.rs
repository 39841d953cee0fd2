//! Text codec for the gauge's `<mantissa>E<exponent>` numbers.
//!
//! The gauge reports pressure as e.g. `1.80E-08`; the operator enters a
//! setpoint as a whole-number mantissa plus the digits of a negative exponent.

use crate::error::ParseError;

fn malformed(text: &str) -> ParseError {
    ParseError::MalformedScientificNotation(text.to_string())
}

/// Optional sign, digits, at most one decimal point, at least one digit.
fn is_decimal(s: &str) -> bool {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    let mut digits = 0usize;
    let mut dots = 0usize;
    for b in body.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

/// Parse `"<mantissa>E<exponent>"` into a real value.
///
/// Surrounding whitespace is ignored. The result is the correctly rounded
/// value of the decimal literal, so `parse("1.8E-8") == Ok(1.8e-8)`.
pub fn parse(text: &str) -> Result<f64, ParseError> {
    let trimmed = text.trim();
    let (mantissa, exponent) = trimmed.split_once('E').ok_or_else(|| malformed(text))?;
    if !is_decimal(mantissa) {
        return Err(malformed(text));
    }
    let exponent: i32 = exponent.parse().map_err(|_| malformed(text))?;
    let value: f64 = format!("{mantissa}e{exponent}")
        .parse()
        .map_err(|_| malformed(text))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(malformed(text))
    }
}

/// Build the text form of an operator setpoint: `whole + "E-" + exponent_digits`.
pub fn format(whole: &str, exponent_digits: &str) -> String {
    format!("{}E-{}", whole.trim(), exponent_digits.trim())
}

/// Operator keypad input (whole mantissa, exponent digits) to a setpoint.
pub fn parse_operator_setpoint(whole: &str, exponent_digits: &str) -> Result<f64, ParseError> {
    parse(&format(whole, exponent_digits))
}

/// Display form of a reading, two decimals in the mantissa.
pub fn render(value: f64) -> String {
    format!("{value:.2E}")
}
