//! Common error types
//!
//! Two tiers of failure exist while applying a batch of devices:
//! [`Error::Hypervisor`] only fails the device being processed, while
//! [`Error::DomainNotRunning`] aborts the whole batch. Everything else is
//! fatal for the invocation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to open connection to the hypervisor at {uri}: {message}")]
    Connection { uri: String, message: String },

    #[error("Domain {0} does not exist!")]
    UnknownDomain(String),

    #[error("No domains defined on the hypervisor")]
    NoDomains,

    #[error("No running domain found for hotplug attach")]
    NoActiveDomain,

    #[error("Failed to enumerate USB devices: {0}")]
    Enumeration(String),

    #[error("Missing USB devices to attach or detach!")]
    NoValidDevices,

    #[error("Domain {0} is not running")]
    DomainNotRunning(String),

    #[error("Hypervisor error: {0}")]
    Hypervisor(String),

    #[error("Hotplug event error: {0}")]
    Hotplug(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Command `{program}` failed: {message}")]
    Command { program: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error aborts a whole attach/detach batch
    pub fn is_batch_fatal(&self) -> bool {
        !matches!(self, Self::Hypervisor(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
