//! virt-usb
//!
//! Attach and detach host USB devices to libvirt domains, interactively or
//! from a udev hotplug rule.
//!
//! The workflow is split into:
//! - [`session`]: the single connection to libvirtd ([`session::Hypervisor`])
//! - [`inventory`]: domain and USB device listings
//! - [`selector`]: validation and interactive picks ([`selector::Prompter`])
//! - [`executor`]: attach/detach/reattach and the result summary
//! - [`hotplug`]: the udev-triggered single device path

pub mod config;
pub mod executor;
pub mod hotplug;
pub mod ignore_list;
pub mod inventory;
pub mod selector;
pub mod session;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Config;
pub use executor::{AttachmentRequest, Report, apply};
pub use hotplug::{HotplugEvent, HotplugOutcome};
pub use ignore_list::IgnoreList;
pub use inventory::{DeviceLister, Lsusb};
pub use selector::{ConsolePrompter, Prompter, resolve_domain, resolve_usb_ids};
pub use session::{Hypervisor, connect};
