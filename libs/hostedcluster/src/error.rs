use thiserror::Error;

/// Mirrors the taxonomy of spec.md §7: each variant carries enough
/// structured data to populate a condition's `Reason`/`Message` without
/// re-parsing a display string.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{reason}: {message}")]
    InputValidation { reason: String, message: String },

    #[error("{reason}: {message}")]
    ReleaseLookup { reason: String, message: String },

    #[error("{reason}: {message}")]
    UpgradePolicy { reason: String, message: String },

    #[error("{0}")]
    Fatal(String),

    #[error("{0} (kube error: {1})")]
    KubeError(String, #[source] kube::Error),

    #[error("{0}")]
    FinalizerError(String),

    #[error("{0}: {1}")]
    SerializationError(String, #[source] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Stable machine-readable token for the condition this error surfaces
    /// through, e.g. `ValidHostedClusterConfiguration`.
    pub fn reason(&self) -> &str {
        match self {
            Error::InputValidation { reason, .. } => reason,
            Error::ReleaseLookup { reason, .. } => reason,
            Error::UpgradePolicy { reason, .. } => reason,
            Error::Fatal(_) => "Fatal",
            Error::KubeError(_, _) => "KubeError",
            Error::FinalizerError(_) => "FinalizerError",
            Error::SerializationError(_, _) => "SerializationError",
        }
    }
}
