//! # Stallguard CLI
//!
//! Scenario runner for the data stall recovery controller. A scenario is a
//! timed script of validation, signal and call-state changes; the runner
//! plays it against simulated collaborators and reports which recovery
//! actions the controller dispatched and when.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod scenario;
pub mod sim;

pub use scenario::{Scenario, ScenarioError, ScenarioStep};
pub use sim::{RunReport, SimulatedRadio};
