#![warn(missing_docs)]

//! Error types for the views library.
//!
//! This module defines error types that can occur when constructing view
//! indices or decoding recorded actions.

use core::fmt;

/// Errors that can occur when working with discrete views and actions.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewError {
    /// Error for a view index outside `[0, 36)`.
    /// This variant is returned when a raw index is converted into a [`crate::ViewIndex`].
    InvalidViewIndex(u32),
    /// Error for an unknown action label.
    /// This variant is returned when a recorded action uses a label outside the vocabulary.
    UnknownActionLabel(&'static str),
}

impl core::fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::InvalidViewIndex(index) => {
                write!(f, "Invalid view index: {} is outside [0, 36)", index)
            }
            ViewError::UnknownActionLabel(msg) => write!(f, "Unknown action label: {}", msg),
        }
    }
}

impl core::error::Error for ViewError {}
