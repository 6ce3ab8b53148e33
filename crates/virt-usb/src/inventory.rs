//! Inventory reader
//!
//! Lists domains through the session gateway and host USB devices through an
//! external listing command. Nothing is cached; every call reflects the live
//! state of the host.

use crate::session::Hypervisor;
use common::{Error, Result, run_command};
use hostdev::{UsbDevice, UsbId};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// `Bus 001 Device 002: ID 8087:0024 Intel Corp. Integrated Rate Matching Hub`
static LISTING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^Bus\s+(?P<bus>\d+)\s+Device\s+(?P<device>\d+).+ID\s(?P<id>\w+:\w+)\s(?P<tag>.+)$",
    )
    .expect("listing pattern is valid")
});

/// Domain names known to the hypervisor, in the order it returns them
pub fn list_domains(session: &dyn Hypervisor, active_only: bool) -> Result<Vec<String>> {
    let domains = session.list_domains(active_only)?;
    debug!(
        "{} {} domain(s) on {}",
        domains.len(),
        if active_only { "running" } else { "defined" },
        session.uri()
    );
    Ok(domains)
}

/// Source of the host's USB device list
pub trait DeviceLister {
    fn list_devices(&self) -> Result<Vec<UsbDevice>>;
}

/// Lists devices by running `lsusb` (or a compatible command)
#[derive(Debug, Clone)]
pub struct Lsusb {
    program: String,
}

impl Lsusb {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Lsusb {
    fn default() -> Self {
        Self::new("lsusb")
    }
}

impl DeviceLister for Lsusb {
    fn list_devices(&self) -> Result<Vec<UsbDevice>> {
        let output = run_command(&self.program, std::iter::empty::<&str>())
            .map_err(|e| Error::Enumeration(e.to_string()))?;

        let devices = parse_listing(&output);
        debug!("{} USB device(s) found", devices.len());
        Ok(devices)
    }
}

/// Parse `lsusb` output, skipping lines that do not match the listing format
pub fn parse_listing(text: &str) -> Vec<UsbDevice> {
    text.lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parsed = parse_line(line);
            if parsed.is_none() {
                trace!("Skipping listing line: {}", line);
            }
            parsed
        })
        .collect()
}

fn parse_line(line: &str) -> Option<UsbDevice> {
    let caps = LISTING_LINE.captures(line)?;

    let bus = caps["bus"].parse().ok()?;
    let device = caps["device"].parse().ok()?;
    let id: UsbId = caps["id"].parse().ok()?;
    let tag = caps["tag"].trim().to_string();

    Some(UsbDevice {
        id,
        bus,
        device,
        tag,
    })
}
