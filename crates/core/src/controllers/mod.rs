//! Resource controllers: list/create/update/delete workflows per resource.

/// Customers and their vehicles.
pub mod customers;
/// Console operators.
pub mod operators;

pub use customers::{CreatedCustomer, CustomerController, CustomerForm, SyncReport};
pub use operators::OperatorController;

use crate::error::Error;

/// Session expiry must reach the guard unchanged; anything else gets wrapped.
pub(crate) fn wrap_unless_expired(err: Error, wrap: impl FnOnce(Box<Error>) -> Error) -> Error {
    if err.is_session_expired() {
        err
    } else {
        wrap(Box::new(err))
    }
}
