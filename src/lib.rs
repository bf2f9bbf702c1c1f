use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse Error: {0}")]
    ParseError(#[source] serde_yaml::Error),

    #[error("SerializationError: {0}")]
    SerializationError(#[source] serde_yaml::Error),

    #[error("Kube Error: {0}")]
    KubeError(#[source] kube::Error),

    #[error("IO Error: {0}")]
    IoError(std::io::Error),

    #[error("Invalid Payload: {0}")]
    InvalidPayload(String),
}
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub mod cacert;
pub mod config;
pub mod events_helper;
pub mod helper;
pub mod secret_controller;

/// Log and trace integrations
pub mod telemetry;
