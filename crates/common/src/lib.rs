//! Common utilities for virt-usb
//!
//! This crate provides the pieces shared by every layer of the tool:
//! the error taxonomy, logging setup, and the runner used to invoke
//! external host commands (`lsusb`, `virsh`).

pub mod command;
pub mod error;
pub mod logging;

pub use command::run_command;
pub use error::{Error, Result};
pub use logging::setup_logging;
