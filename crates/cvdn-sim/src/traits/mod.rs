//! Simulator interfaces.

pub mod simulator;
