#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core pressure regulation logic (hardware-agnostic).
//!
//! This crate holds the feedback loop that keeps a vacuum chamber at a
//! setpoint by moving a leak valve. All serial traffic goes through
//! `regulator_traits::Transport`; time comes from `regulator_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Codec**: gauge `<mantissa>E<exponent>` text (`sci` module)
//! - **Link**: gauge read / valve command protocol (`link` module)
//! - **Valve**: 7-digit position numerals and the max-open bound (`valve` module)
//! - **Control**: ramped PID-style law (`controller` module)
//! - **Scheduling**: cancellable timer queue (`scheduler` module)
//! - **Loop**: sessions, ticks, display refresh (`control_loop`, `runner`)
//! - **Logging**: one CSV per session (`session_log` module)
//!
//! ## Control law
//!
//! Each tick yields a fractional adjustment `(target - predicted) / target`;
//! the loop applies `position * (1 + adjustment / 100)` to the valve.

// Module declarations
pub mod atomic;
pub mod builder;
pub mod command;
pub mod config;
pub mod control_loop;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod link;
pub mod mocks;
pub mod runner;
pub mod scheduler;
pub mod sci;
pub mod session_log;
pub mod status;
pub mod types;
pub mod util;
pub mod valve;

pub use builder::{ControlLoopBuilder, Missing};
pub use command::{Command, Inbox, SessionHandle, channel};
pub use config::{ControlCfg, DisplayCfg, Timeouts, ValveCfg};
pub use control_loop::ControlLoop;
pub use controller::{Gains, IntegralMode, Phase, RampPolicy, RampState, RampedController};
pub use error::{
    BuildError, ControllerError, LinkError, ParseError, RegulatorError, Result, ValveError,
};
pub use link::Link;
pub use runner::{RunSummary, run_until};
pub use scheduler::{Scheduler, TimerId, TimerKind};
pub use session_log::{CsvSessionWriter, NullSink, SampleSink};
pub use status::{HoldReason, LoopStats, TickOutcome};
pub use types::{Ack, PressureReading, Sample};
pub use valve::{ValveDriver, format_position};
