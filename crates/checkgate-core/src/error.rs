//! Error types for CheckGate startup.

/// Core error type for CheckGate configuration and provisioning.
#[derive(Debug, thiserror::Error)]
pub enum CheckGateError {
    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Key material could not be loaded.
    #[error("key provisioning error: {0}")]
    KeyProvisioning(String),
}

/// Convenience result type for CheckGate operations.
pub type CheckGateResult<T> = Result<T, CheckGateError>;
