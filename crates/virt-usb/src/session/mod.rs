//! Hypervisor session gateway
//!
//! One connection to the local libvirt daemon is opened per process and
//! borrowed by every other component through the [`Hypervisor`] trait.
//!
//! Two transports reach the same daemon, picked by
//! [`Backend`](crate::config::Backend):
//! - `LibvirtSession` holds one native connection (`libvirt` feature, on by
//!   default)
//! - [`VirshSession`] drives the `virsh` client, for hosts without the
//!   libvirt development headers
//!
//! Both report a device change refused because the domain is down as
//! [`common::Error::DomainNotRunning`]; every other device failure is
//! [`common::Error::Hypervisor`].

pub mod virsh;

#[cfg(feature = "libvirt")]
pub mod libvirt;

use crate::config::{Backend, ConnectionSettings};
use common::Result;
use hostdev::DeviceDescriptor;

#[cfg(feature = "libvirt")]
pub use self::libvirt::LibvirtSession;
pub use virsh::VirshSession;

/// Operations this tool needs from the hypervisor management service
///
/// Device changes use the "affect current state" flag: live if the domain
/// runs, persistent config otherwise. A change the daemon refuses because
/// the domain is not running fails with [`common::Error::DomainNotRunning`].
pub trait Hypervisor {
    /// Connection URI this session was opened with
    fn uri(&self) -> &str;

    /// Domain names, optionally restricted to running domains
    fn list_domains(&self, active_only: bool) -> Result<Vec<String>>;

    /// Whether the named domain is currently running
    fn is_active(&self, domain: &str) -> Result<bool>;

    /// Hot-plug a device into the domain
    fn attach_device(&self, domain: &str, descriptor: &DeviceDescriptor) -> Result<()>;

    /// Hot-unplug a device from the domain
    fn detach_device(&self, domain: &str, descriptor: &DeviceDescriptor) -> Result<()>;
}

/// Open the session gateway for the configured URI and backend
///
/// Fails with [`common::Error::Connection`] when the daemon is unreachable or
/// refuses the session.
pub fn connect(settings: &ConnectionSettings) -> Result<Box<dyn Hypervisor>> {
    match settings.backend {
        #[cfg(feature = "libvirt")]
        Backend::Libvirt => Ok(Box::new(LibvirtSession::open(&settings.uri)?)),
        #[cfg(not(feature = "libvirt"))]
        Backend::Libvirt => Err(common::Error::Config(
            "built without the libvirt feature; set connection.backend = \"virsh\"".to_string(),
        )),
        Backend::Virsh => Ok(Box::new(VirshSession::open(&settings.virsh, &settings.uri)?)),
    }
}
