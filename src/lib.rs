//! # evote-kiosk
//!
//! Bootstrap for the identity-verification kiosk: configuration, tracing and
//! wiring of the ev-* crates.

pub mod bootstrap;

pub use bootstrap::{run_app, AppRuntime, StartupReport};
