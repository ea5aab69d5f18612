//! Application-level orchestration.
//!
//! This module owns the OpenOCD launch lifecycle (start/terminate/quit). UI and CLI layers
//! send commands in and receive events out, and never touch the supervisor directly.

mod controller;

pub(crate) use controller::{run_controller, UiCommand};
