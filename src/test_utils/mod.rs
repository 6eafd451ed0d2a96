//! Test-only helpers shared across crate unit tests.

pub mod recording_transport;
