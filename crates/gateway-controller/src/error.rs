use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Kube error: {0}")]
    Kube(#[from] kube::Error),
    #[error("Missing field in object reference")]
    MissingField,
    #[error("Owner reference mismatch: {0} exists without a reference to its Gateway")]
    OwnershipConflict(String),
    #[error("Failed to parse certificate PEM: {0}")]
    CertificateParse(String),
    #[error("RSA key too short: {bits} bits (minimum {minimum})")]
    KeyLengthTooShort { bits: usize, minimum: usize },
    #[error("Invalid DNS name or IP in certificate: {0}")]
    InvalidCertificateHost(String),
    #[error("Failed to parse probe annotation: {0}")]
    ProbeParse(String),
    #[error("Mesh client error: {0}")]
    Mesh(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
