//! Simulator implementations.

pub mod graph_sim;
