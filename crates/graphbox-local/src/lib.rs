//! graphbox Local Provider
//!
//! An [`ExecutionProvider`](graphbox_core::ExecutionProvider) backed by one
//! directory per environment on the local machine. Commands run through the
//! configured shell with the environment directory as working directory.
//!
//! Useful for development and tests; it offers no isolation beyond the
//! directory boundary and a per-environment host port.

pub mod paths;
pub mod provider;

pub use provider::{LocalProvider, LocalProviderConfig, DEV_SERVER_LOG, PORT_ENV};
