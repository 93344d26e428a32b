//! Process-wide session state: bearer token, admin flag and operator profile.

mod backend;
mod store;

pub use backend::{FileBackend, MemoryBackend, SessionBackend};
pub use store::{Session, SessionStore};
