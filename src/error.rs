// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Tycoon Economy Simulation Suite ("The Backdrop") - Error Types

use thiserror::Error;

/// Errors surfaced by the simulation core.
///
/// Normal operation has no fatal paths: arithmetic edge cases degrade to
/// defined neutral values and bad configuration is defaulted with a warning.
/// These variants cover caller mistakes (bad registrations, unknown ids) and
/// snapshot encoding failures.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("asset `{0}` is already registered")]
    DuplicateAsset(String),

    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error("event `{0}` is not awaiting a choice")]
    NotPendingChoice(String),

    #[error("state serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
