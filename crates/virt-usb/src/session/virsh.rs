//! Session backed by the `virsh` command line client

use super::Hypervisor;
use common::{Error, Result, run_command};
use hostdev::DeviceDescriptor;
use std::ffi::OsStr;
use std::io::Write;
use tracing::{debug, info};

/// Text virsh prints for libvirt's "operation invalid" error code
const OPERATION_INVALID: &str = "Requested operation is not valid";

/// libvirt session driven through `virsh -c <uri>`
#[derive(Debug, Clone)]
pub struct VirshSession {
    program: String,
    uri: String,
}

impl VirshSession {
    /// Probe the daemon and return a session bound to `uri`
    pub fn open(program: &str, uri: &str) -> Result<Self> {
        let session = Self {
            program: program.to_string(),
            uri: uri.to_string(),
        };

        let canonical = session
            .virsh([OsStr::new("uri")])
            .map_err(|e| Error::Connection {
                uri: uri.to_string(),
                message: e.to_string(),
            })?;

        info!("Connected to {}", canonical.trim());
        Ok(session)
    }

    fn virsh<'a, I>(&'a self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = &'a OsStr>,
    {
        let mut full = vec![OsStr::new("-c"), OsStr::new(&self.uri)];
        full.extend(args);
        run_command(&self.program, full)
    }

    /// Run a device command with the descriptor written to a scratch file
    fn modify_device(&self, command: &str, domain: &str, descriptor: &DeviceDescriptor) -> Result<()> {
        let mut file = tempfile::Builder::new()
            .prefix("virt-usb-")
            .suffix(".xml")
            .tempfile()?;
        file.write_all(descriptor.to_xml().as_bytes())?;
        file.flush()?;

        debug!("{} {} on {}", command, descriptor.id(), domain);

        self.virsh([
            OsStr::new(command),
            OsStr::new(domain),
            file.path().as_os_str(),
            OsStr::new("--current"),
        ])
        .map(|_| ())
        .map_err(|e| match e {
            Error::Command { message, .. } => self.device_change_error(domain, message),
            other => other,
        })
    }

    /// virsh only reports error text, so the error code is recovered from
    /// its fixed wording and confirmed against the domain state
    fn device_change_error(&self, domain: &str, message: String) -> Error {
        if message.contains(OPERATION_INVALID) && matches!(self.is_active(domain), Ok(false)) {
            debug!("{} refused change while stopped: {}", domain, message);
            return Error::DomainNotRunning(domain.to_string());
        }
        Error::Hypervisor(message)
    }
}

impl Hypervisor for VirshSession {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn list_domains(&self, active_only: bool) -> Result<Vec<String>> {
        let output = if active_only {
            self.virsh([OsStr::new("list"), OsStr::new("--name")])?
        } else {
            self.virsh([OsStr::new("list"), OsStr::new("--all"), OsStr::new("--name")])?
        };

        Ok(parse_domain_names(&output))
    }

    fn is_active(&self, domain: &str) -> Result<bool> {
        // domid prints "-" for a domain that is not running
        let output = self
            .virsh([OsStr::new("domid"), OsStr::new(domain)])
            .map_err(|e| match e {
                Error::Command { message, .. } => Error::Hypervisor(message),
                other => other,
            })?;
        Ok(output.trim() != "-")
    }

    fn attach_device(&self, domain: &str, descriptor: &DeviceDescriptor) -> Result<()> {
        self.modify_device("attach-device", domain, descriptor)
    }

    fn detach_device(&self, domain: &str, descriptor: &DeviceDescriptor) -> Result<()> {
        self.modify_device("detach-device", domain, descriptor)
    }
}

fn parse_domain_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
