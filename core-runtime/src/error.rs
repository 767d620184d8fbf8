//! Startup-time errors.
//!
//! Everything here surfaces while wiring the engine: a host forgot to inject
//! a capability, or a tuning knob is out of range. Runtime failures (network,
//! storage, validation) live in the owning crates' error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A tuning knob is out of range or inconsistent.
    #[error("Invalid engine tuning: {0}")]
    Tuning(String),

    /// The tracing pipeline could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// A required host capability was not injected. The message names the
    /// trait and the stock adapter that satisfies it.
    #[error("Missing {capability} capability: {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
