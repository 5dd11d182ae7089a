use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("SerializationError: {0}")]
    SerializationError(#[source] serde_json::Error),

    #[error("Template Error: {0}")]
    TemplateError(#[source] serde_yaml::Error),

    #[error("Kube Error: {0}")]
    KubeError(#[source] kube::Error),

    /// Lookup of a named object came back empty. Drives the create branch
    /// of the convergence engine and is never surfaced to the requeue loop.
    #[error("Not Found: {kind} {namespace}/{name}")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("Timeout: {0} did not complete in time")]
    Timeout(String),

    #[error("IO Error: {0}")]
    IoError(#[source] std::io::Error),

    #[error("Patch Error: {0}")]
    PatchError(#[source] json_patch::PatchError),

    /// A required field in a custom resource spec is empty
    #[error("Missing Field: {0}")]
    MissingField(String),

    #[error("Owner Reference Error: {0}")]
    OwnerError(String),

    /// NB: this is a catch-all for any other errors
    #[error("Other Error: {0}")]
    OtherError(String),
}
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

mod macros;

pub mod builder;
pub mod config;
pub mod controller;
pub mod converge;
pub mod crd;
pub mod events_helper;
pub mod quantity;
pub mod status;
pub mod store;

pub mod health_controller;
pub mod must_gather_config_controller;
pub mod must_gather_job_controller;
pub mod must_gather_service_controller;

/// Log and trace integrations
pub mod telemetry;
