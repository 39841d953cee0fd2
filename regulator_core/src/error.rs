use thiserror::Error;

/// Failures talking to the gauge or the valve.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("serial io error: {0}")]
    Io(String),
    #[error("timeout waiting for device response")]
    Timeout,
    #[error("protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed scientific notation: {0:?}")]
    MalformedScientificNotation(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValveError {
    #[error("valve position {requested} refused (limit {max_open})")]
    OutOfRange { requested: f64, max_open: f64 },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControllerError {
    #[error("no active session")]
    NoActiveSession,
    #[error("invalid setpoint: {0}")]
    InvalidSetpoint(f64),
    #[error("invalid pressure measurement: {0}")]
    InvalidMeasurement(f64),
}

/// Everything the control loop can report to its caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegulatorError {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Valve(#[from] ValveError),
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error("session log error: {0}")]
    SessionLog(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
