//! Error handling for the display control framework
//!
//! This module defines the error taxonomy shared by every layer (lifecycle,
//! attribute propagation, data binding, view plumbing) and a Result alias.
//!
//! Not every variant is a failure in the user-facing sense:
//! [`ControlError::UserCancelledSelection`] is a no-op signal and
//! [`ControlError::ConcurrentRoleConflict`] is resolved by revoking the prior
//! time-driver holder. Callers use [`ControlError::is_user_cancel`] to keep
//! those out of error logs.

use crate::attributes::AttributeFlag;
use thiserror::Error;

/// Main error type for display control operations
#[derive(Error, Debug)]
pub enum ControlError {
    /// The data resolver returned nothing usable for a reference
    #[error("Data unavailable for '{reference}': {message}")]
    DataUnavailable { reference: String, message: String },

    /// A visual object rejected a pushed attribute value
    #[error("{visual} rejected {category} value: {message}")]
    AttributeRejected {
        category: AttributeFlag,
        visual: String,
        message: String,
    },

    /// The user aborted an interactive data or operand choice
    #[error("Selection cancelled by user")]
    UserCancelledSelection,

    /// Two controls contended for the time-driver role of a view
    #[error("Time driver role held by control {holder} was claimed by control {claimant}")]
    ConcurrentRoleConflict { holder: u64, claimant: u64 },

    /// Uncaught failure during the later initialization steps
    #[error("Initialization failed: {0}")]
    IrrecoverableInitFailure(String),

    /// Two units cannot be converted into each other
    #[error("Cannot convert from unit '{from}' to '{to}'")]
    UnitConversion { from: String, to: String },

    /// A display unit change was rolled back
    #[error("Unit change to '{unit}' rejected: {message}")]
    UnitChangeRejected { unit: String, message: String },

    /// Unknown unit name
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// A property override could not be parsed
    #[error("Invalid property {key}={value}")]
    InvalidProperty { key: String, value: String },

    /// The control was removed while an operation was in flight
    #[error("Control {0} has been removed")]
    ControlRemoved(u64),

    /// Errors reported by a view context
    #[error("View error: {0}")]
    View(String),

    /// Errors related to the background worker pool
    #[error("Worker error: {0}")]
    Worker(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to the persistence store
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ControlError>,
    },
}

impl ControlError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ControlError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a data-unavailable error
    pub fn data_unavailable(reference: impl Into<String>, message: impl Into<String>) -> Self {
        ControlError::DataUnavailable {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Create an attribute-rejected error
    pub fn rejected(
        category: AttributeFlag,
        visual: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ControlError::AttributeRejected {
            category,
            visual: visual.into(),
            message: message.into(),
        }
    }

    /// Strip any context wrappers
    pub fn root(&self) -> &ControlError {
        match self {
            ControlError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the user backed out of a choice; callers treat this as a no-op
    pub fn is_user_cancel(&self) -> bool {
        matches!(self.root(), ControlError::UserCancelledSelection)
    }

    /// True when the root cause is missing data
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self.root(), ControlError::DataUnavailable { .. })
    }
}

impl From<serde_json::Error> for ControlError {
    fn from(err: serde_json::Error) -> Self {
        ControlError::Serialization(err.to_string())
    }
}

/// Result type alias for display control operations
pub type Result<T> = std::result::Result<T, ControlError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
