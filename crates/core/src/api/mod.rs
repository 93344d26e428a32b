//! HTTP access to the REST API.
//!
//! Every controller goes through [`ApiClient`], which attaches the bearer
//! token, maps status codes onto [`Error`](crate::Error) and clears the
//! session on 401. The network itself sits behind the [`Transport`] trait.

mod client;
#[cfg(test)]
pub(crate) mod mock;
mod transport;

pub use client::{extract_data, extract_list, ApiClient};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
