//! Error types for the `verdant-world` crate.

use verdant_types::{Field, Role};

/// Errors that can occur while mutating or configuring the world.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    /// A role tried to write a field it does not own.
    #[error("{role} attempted to write {field}, which is owned by {owner}")]
    ForeignWrite {
        /// The field that was targeted.
        field: Field,
        /// The role that attempted the write.
        role: Role,
        /// The field's designated writer.
        owner: Role,
    },

    /// A non-finite value was offered for a real-valued field.
    #[error("non-finite value {value} for {field}")]
    NonFinite {
        /// The field that was targeted.
        field: Field,
        /// The rejected value.
        value: f64,
    },

    /// A model parameter is outside its valid range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name as it appears in configuration.
        name: &'static str,
        /// Explanation of what is wrong with the value.
        reason: String,
    },
}

/// Reject a parameter that is negative or not finite.
pub(crate) fn require_non_negative(name: &'static str, value: f64) -> Result<(), WorldError> {
    if !value.is_finite() {
        return Err(WorldError::InvalidParameter {
            name,
            reason: format!("{value} is not a finite number"),
        });
    }
    if value < 0.0 {
        return Err(WorldError::InvalidParameter {
            name,
            reason: format!("{value} must not be negative"),
        });
    }
    Ok(())
}

/// Reject a parameter that is not finite.
pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<(), WorldError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(WorldError::InvalidParameter {
            name,
            reason: format!("{value} is not a finite number"),
        })
    }
}
