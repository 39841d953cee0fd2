use crate::error::ValveError;

/// Render a valve opening as the 7-digit numeral the valve expects.
///
/// Three decimals, point removed, integer part zero padded: `46.0 -> "0046000"`.
/// Callers keep positions below 10000 so the numeral stays 7 characters.
pub fn format_position(position: f64) -> String {
    format!("{position:08.3}").replace('.', "")
}

/// Inverse of [`format_position`]; `None` unless the input is exactly 7 digits.
pub fn parse_position(digits: &str) -> Option<f64> {
    if digits.len() != 7 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let thousandths: u32 = digits.parse().ok()?;
    Some(f64::from(thousandths) / 1000.0)
}

/// Resolution of the position numeral.
fn round_to_thousandths(position: f64) -> f64 {
    (position * 1000.0).round() / 1000.0
}

/// Owns the last applied valve opening and enforces the maximum-open bound.
#[derive(Debug, Clone, PartialEq)]
pub struct ValveDriver {
    position: f64,
    max_open: f64,
}

impl ValveDriver {
    /// A driver for a closed valve.
    pub fn new(max_open: f64) -> Self {
        Self {
            position: 0.0,
            max_open,
        }
    }

    /// Store `requested`, rounded to the thousandths the valve can be told,
    /// if it is a usable opening.
    ///
    /// The bound is checked after rounding. Anything at or above `max_open`,
    /// negative, or non-finite is refused and the stored position is left alone.
    pub fn clamp_and_apply(&mut self, requested: f64) -> Result<f64, ValveError> {
        let rounded = round_to_thousandths(requested);
        if !rounded.is_finite() || rounded < 0.0 || rounded >= self.max_open {
            return Err(ValveError::OutOfRange {
                requested,
                max_open: self.max_open,
            });
        }
        self.position = rounded;
        Ok(rounded)
    }

    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    #[inline]
    pub fn max_open(&self) -> f64 {
        self.max_open
    }

    pub fn close(&mut self) {
        self.position = 0.0;
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.position == 0.0
    }
}
