//! Error taxonomy shared by the API client and the controllers.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A vehicle that could not be saved during a customer update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleFailure {
    /// Position of the vehicle in the submitted list.
    pub index: usize,
    /// Human readable label (model, plate or position).
    pub label: String,
    /// Message of the underlying error.
    pub message: String,
}

/// Every way a user action can fail.
#[derive(Debug, Error)]
pub enum Error {
    /// Client-side input check failed; nothing was sent.
    #[error("{0}")]
    Validation(String),
    /// The server answered 401; the session has already been cleared.
    #[error("session expired, please log in again")]
    SessionExpired,
    /// The server answered with another non-2xx status.
    #[error("{message}")]
    Request {
        /// HTTP status code.
        status: u16,
        /// Message taken from the response body, or `HTTP <status>`.
        message: String,
    },
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),
    /// A 2xx response whose body could not be used.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// A request body could not be encoded.
    #[error("could not encode request body: {0}")]
    Encode(String),
    /// The action is reserved to admin operators; nothing was sent.
    #[error("only administrators can {0} records")]
    Forbidden(&'static str),
    /// Login was rejected.
    #[error("invalid email or password")]
    InvalidCredentials,
    /// First step of the customer create workflow failed.
    #[error("could not create customer: {0}")]
    CustomerNotCreated(#[source] Box<Error>),
    /// First step of the customer update workflow failed.
    #[error("could not update customer: {0}")]
    CustomerNotUpdated(#[source] Box<Error>),
    /// A vehicle failed after its customer was created.
    #[error("customer {customer_id} created, but vehicle {label} could not be created: {source}")]
    VehicleNotCreated {
        /// Server id of the already-created customer.
        customer_id: i64,
        /// Label of the vehicle that failed.
        label: String,
        /// Ids of the vehicles created before the failure.
        created: Vec<i64>,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },
    /// One or more vehicles failed during a customer update.
    #[error("customer saved, but {} vehicle(s) failed: {}", .failures.len(), describe_failures(.failures))]
    VehiclesNotSynced {
        /// Every failed vehicle, in submission order.
        failures: Vec<VehicleFailure>,
    },
}

impl Error {
    /// Whether this error means the session is gone and the user must log in again.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired)
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Request { status, .. } => Some(*status),
            Error::CustomerNotCreated(inner) | Error::CustomerNotUpdated(inner) => inner.status(),
            Error::VehicleNotCreated { source, .. } => source.status(),
            _ => None,
        }
    }
}

fn describe_failures(failures: &[VehicleFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{} ({})", failure.label, failure.message))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_failure_message_names_the_vehicle() {
        let err = Error::VehicleNotCreated {
            customer_id: 3,
            label: "Civic".to_string(),
            created: vec![10],
            source: Box::new(Error::Request {
                status: 500,
                message: "HTTP 500".to_string(),
            }),
        };
        assert!(err.to_string().contains("Civic"));
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_session_expired());
    }

    #[test]
    fn aggregated_failures_list_every_vehicle() {
        let err = Error::VehiclesNotSynced {
            failures: vec![
                VehicleFailure {
                    index: 0,
                    label: "Fit".to_string(),
                    message: "HTTP 500".to_string(),
                },
                VehicleFailure {
                    index: 2,
                    label: "ABC1234".to_string(),
                    message: "plate taken".to_string(),
                },
            ],
        };
        let message = err.to_string();
        assert!(message.starts_with("customer saved, but 2 vehicle(s) failed"));
        assert!(message.contains("Fit (HTTP 500)"));
        assert!(message.contains("ABC1234 (plate taken)"));
    }
}
