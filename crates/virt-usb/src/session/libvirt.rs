//! Session backed by the native libvirt bindings

use super::Hypervisor;
use common::{Error, Result};
use hostdev::DeviceDescriptor;
use tracing::{debug, info, warn};
use virt::connect::Connect;
use virt::domain::Domain;
use virt::error::ErrorNumber;
use virt::sys;

/// Open libvirt connection, closed when dropped
pub struct LibvirtSession {
    conn: Connect,
    uri: String,
}

impl LibvirtSession {
    pub fn open(uri: &str) -> Result<Self> {
        let conn = Connect::open(Some(uri)).map_err(|e| Error::Connection {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;

        info!("Connected to {}", uri);
        Ok(Self {
            conn,
            uri: uri.to_string(),
        })
    }

    fn lookup(&self, domain: &str) -> Result<Domain> {
        Domain::lookup_by_name(&self.conn, domain).map_err(|e| {
            debug!("Lookup of {} failed: {}", domain, e);
            Error::UnknownDomain(domain.to_string())
        })
    }
}

fn hypervisor_error(e: virt::error::Error) -> Error {
    Error::Hypervisor(e.to_string())
}

/// Map a failed device change
///
/// libvirt raises "operation invalid" when a live change hits a domain that
/// is down; the state is checked again at that moment to tell it apart from
/// other invalid requests.
fn device_change_error(dom: &Domain, domain: &str, e: virt::error::Error) -> Error {
    if matches!(e.code(), ErrorNumber::OperationInvalid) && matches!(dom.is_active(), Ok(false)) {
        debug!("{} refused change while stopped: {}", domain, e);
        return Error::DomainNotRunning(domain.to_string());
    }
    hypervisor_error(e)
}

impl Hypervisor for LibvirtSession {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn list_domains(&self, active_only: bool) -> Result<Vec<String>> {
        let flags = if active_only {
            sys::VIR_CONNECT_LIST_DOMAINS_ACTIVE
        } else {
            0
        };

        let domains = self
            .conn
            .list_all_domains(flags)
            .map_err(hypervisor_error)?;

        domains
            .iter()
            .map(|d| d.get_name().map_err(hypervisor_error))
            .collect()
    }

    fn is_active(&self, domain: &str) -> Result<bool> {
        self.lookup(domain)?.is_active().map_err(hypervisor_error)
    }

    fn attach_device(&self, domain: &str, descriptor: &DeviceDescriptor) -> Result<()> {
        debug!("attach {} on {}", descriptor.id(), domain);
        let dom = self.lookup(domain)?;
        dom.attach_device_flags(&descriptor.to_xml(), sys::VIR_DOMAIN_AFFECT_CURRENT)
            .map_err(|e| device_change_error(&dom, domain, e))?;
        Ok(())
    }

    fn detach_device(&self, domain: &str, descriptor: &DeviceDescriptor) -> Result<()> {
        debug!("detach {} on {}", descriptor.id(), domain);
        let dom = self.lookup(domain)?;
        dom.detach_device_flags(&descriptor.to_xml(), sys::VIR_DOMAIN_AFFECT_CURRENT)
            .map_err(|e| device_change_error(&dom, domain, e))?;
        Ok(())
    }
}

impl Drop for LibvirtSession {
    fn drop(&mut self) {
        if let Err(e) = self.conn.close() {
            warn!("Failed to close connection to {}: {}", self.uri, e);
        }
    }
}
