//! Shared helpers for unit tests.

#![allow(clippy::unwrap_used)]

pub mod socket_guard;
mod transport;

pub use transport::{ScriptedTransport, Step};
