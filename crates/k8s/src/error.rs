//! Error taxonomy shared by every DeviceChain provisioning component.

use thiserror::Error;

/// Errors raised while provisioning control-plane resources.
#[derive(Debug, Error)]
pub enum Error {
    /// A lookup target or a required parent does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    /// A strict create collided with an existing identity.
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: String, name: String },

    /// Malformed input such as a catalog filename or a missing argument.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The resource exists but cannot be installed (e.g. a library chart).
    #[error("unsupported resource: {0}")]
    UnsupportedResource(String),

    /// The control plane, a repository or the helm binary failed the request.
    #[error("transport error: {0}")]
    Transport(String),

    /// A manifest or payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Build a `NotFound` error, qualifying the name with its namespace.
    pub fn not_found(kind: &str, namespace: Option<&str>, name: &str) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            name: qualified_name(namespace, name),
        }
    }

    /// Build an `AlreadyExists` error, qualifying the name with its namespace.
    pub fn already_exists(kind: &str, namespace: Option<&str>, name: &str) -> Self {
        Self::AlreadyExists {
            kind: kind.to_string(),
            name: qualified_name(namespace, name),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Map a kube API error for a specific object onto the taxonomy.
    pub fn from_kube(err: kube::Error, kind: &str, namespace: Option<&str>, name: &str) -> Self {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => Self::not_found(kind, namespace, name),
            kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists" => {
                Self::already_exists(kind, namespace, name)
            }
            _ => Self::Transport(err.to_string()),
        }
    }

    /// True when the error reports a missing object.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

fn qualified_name(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{ns}/{name}"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "boom".to_string(),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_kube_404_maps_to_not_found() {
        let err = Error::from_kube(api_error(404, "NotFound"), "Tenant", Some("dc1"), "t1");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Tenant 'dc1/t1' not found");
    }

    #[test]
    fn test_kube_409_maps_to_already_exists() {
        let err = Error::from_kube(api_error(409, "AlreadyExists"), "Instance", None, "dc1");
        assert!(matches!(err, Error::AlreadyExists { ref name, .. } if name == "dc1"));
    }

    #[test]
    fn test_conflict_without_already_exists_is_transport() {
        let err = Error::from_kube(api_error(409, "Conflict"), "Instance", None, "dc1");
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn test_server_error_is_transport() {
        let err = Error::from_kube(api_error(500, "InternalError"), "Instance", None, "dc1");
        assert!(matches!(err, Error::Transport(_)));
    }
}
