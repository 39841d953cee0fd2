//! Human-readable error descriptions and structured JSON error formatting.

use regulator_core::error::{
    BuildError, ControllerError, LinkError, ParseError, RegulatorError, ValveError,
};

fn regulator_error(err: &eyre::Report) -> Option<&RegulatorError> {
    err.downcast_ref::<RegulatorError>()
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    if let Some(re) = regulator_error(err) {
        return match re {
            RegulatorError::Link(LinkError::Timeout) => "What happened: A serial device did not answer in time.\nLikely causes: Ion gauge or valve controller powered off, wrong port, or wrong baud rate.\nHow to fix: Check cabling and power, verify [gauge] and [valve_port] in the config, or raise gauge.timeout_ms.".to_string(),
            RegulatorError::Link(LinkError::Io(msg)) => format!(
                "What happened: Serial I/O failed ({msg}).\nLikely causes: Device unplugged or port in use by another program.\nHow to fix: Reconnect the device and make sure nothing else holds the port."
            ),
            RegulatorError::Link(LinkError::Protocol(msg)) => format!(
                "What happened: The gauge answered with unreadable text ({msg}).\nLikely causes: Gauge over range, wrong device on the port, or line noise.\nHow to fix: Check the gauge display and the port assignment."
            ),
            RegulatorError::Parse(ParseError::MalformedScientificNotation(text)) => format!(
                "What happened: Setpoint {text:?} is not a number.\nLikely causes: Non-digit characters in --pressure or --exponent.\nHow to fix: Pass digits only, e.g. `regulator run --pressure 5 --exponent 8` for 5E-8."
            ),
            RegulatorError::Controller(ControllerError::InvalidSetpoint(v)) => format!(
                "What happened: Setpoint {v} cannot be regulated.\nLikely causes: Zero or negative pressure requested.\nHow to fix: Request a positive pressure."
            ),
            RegulatorError::Valve(ValveError::OutOfRange { requested, max_open }) => format!(
                "What happened: Valve opening {requested} refused (limit {max_open}).\nLikely causes: valve.default_position at or above valve.max_open.\nHow to fix: Lower the requested opening or raise valve.max_open."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open gauge port") || lower.contains("open valve port") {
        return format!(
            "What happened: Failed to open a serial port.\nLikely causes: Wrong device path or insufficient permissions (dialout group).\nHow to fix: Fix [gauge].port / [valve_port].port in the config. Original: {msg}"
        );
    }

    if lower.contains("invalid configuration") || lower.contains("parse config") {
        return format!(
            "What happened: Configuration is invalid.\nLikely causes: Out-of-range or misspelled values.\nHow to fix: Edit the TOML config and try again. Original: {msg}"
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: Config file could not be read.\nLikely causes: Wrong --config path.\nHow to fix: Point --config at an existing file. Original: {msg}"
        );
    }

    // Generic fallback
    format!(
        "Something went wrong.\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 bad setpoint, 3 timeout, 4 serial I/O or protocol,
/// 5 valve refused, 6 session log, 1 everything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match regulator_error(err) {
        Some(RegulatorError::Parse(_) | RegulatorError::Controller(ControllerError::InvalidSetpoint(_))) => 2,
        Some(RegulatorError::Link(LinkError::Timeout)) => 3,
        Some(RegulatorError::Link(_)) => 4,
        Some(RegulatorError::Valve(_)) => 5,
        Some(RegulatorError::SessionLog(_)) => 6,
        _ => 1,
    }
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    match regulator_error(err) {
        Some(RegulatorError::Link(LinkError::Timeout)) => "Timeout",
        Some(RegulatorError::Link(LinkError::Io(_))) => "SerialIo",
        Some(RegulatorError::Link(LinkError::Protocol(_))) => "Protocol",
        Some(RegulatorError::Parse(_)) => "MalformedSetpoint",
        Some(RegulatorError::Controller(ControllerError::InvalidSetpoint(_))) => "InvalidSetpoint",
        Some(RegulatorError::Controller(_)) => "Controller",
        Some(RegulatorError::Valve(_)) => "OutOfRange",
        Some(RegulatorError::SessionLog(_)) => "SessionLog",
        None if err.downcast_ref::<BuildError>().is_some() => "InvalidConfig",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
