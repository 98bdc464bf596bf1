//! Error types for the simulation core.
//!
//! Only day initialization surfaces errors to the host. Store misuse inside a
//! running day is reported as [`StoreError`], logged by the calling system and
//! absorbed so the day loop keeps ticking.

use bevy_ecs::entity::Entity;
use thiserror::Error;

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

/// Configuration problems detected before a day starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required configuration section was not supplied.
    #[error("missing configuration section: {0}")]
    MissingSection(&'static str),

    /// A value is out of range or inconsistent with another value.
    #[error("invalid configuration value `{field}`: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// The configuration document could not be parsed.
    #[error("configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Misuse of the entity store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The entity was destroyed or never existed in this store.
    #[error("entity {0:?} is not alive in the {1} store")]
    EntityNotFound(Entity, &'static str),

    /// `add` was called for a component the entity already carries.
    #[error("entity {entity:?} already has component {component}")]
    ComponentExists {
        entity: Entity,
        component: &'static str,
    },

    /// A unique component would end up on a second entity.
    #[error("unique component {0} already lives on another entity")]
    UniqueViolation(&'static str),
}

/// Umbrella error for the day loop.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A system failed while running its initialize phase.
    #[error("system `{system}` failed to initialize: {reason}")]
    Initialize {
        system: &'static str,
        reason: String,
    },
}
