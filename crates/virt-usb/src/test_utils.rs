//! Test utilities for virt-usb
//!
//! In-memory stand-ins for the hypervisor, the device lister and the
//! interactive console, plus small fixture builders.
//!
//! # Example
//!
//! ```
//! use virt_usb::test_utils::{FakeHypervisor, HypervisorCall, device};
//! use virt_usb::session::Hypervisor;
//! use hostdev::DeviceDescriptor;
//!
//! let hv = FakeHypervisor::new().with_domain("vm1", true);
//! let foo = device("1234:5678", "Foo");
//! hv.attach_device("vm1", &DeviceDescriptor::usb(foo.id)).unwrap();
//!
//! assert_eq!(
//!     hv.calls(),
//!     vec![HypervisorCall::Attach { domain: "vm1".into(), id: foo.id }]
//! );
//! ```

use crate::inventory::DeviceLister;
use crate::selector::Prompter;
use crate::session::Hypervisor;
use common::{Error, Result};
use hostdev::{DeviceDescriptor, UsbDevice, UsbId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;

/// Sample `lsusb` output
pub const SAMPLE_LSUSB: &str = "\
Bus 002 Device 001: ID 1d6b:0003 Linux Foundation 3.0 root hub
Bus 001 Device 003: ID 1234:5678 Foo
Bus 001 Device 004: ID aaaa:bbbb Bar
Bus 001 Device 001: ID 1d6b:0002 Linux Foundation 2.0 root hub
";

/// Build a device on bus 1 from a `vvvv:pppp` id
///
/// Panics on a malformed id; test input only.
pub fn device(id: &str, tag: &str) -> UsbDevice {
    UsbDevice {
        id: id.parse().expect("fixture id must be valid"),
        bus: 1,
        device: 2,
        tag: tag.to_string(),
    }
}

/// A device change the fake hypervisor was asked to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HypervisorCall {
    Attach { domain: String, id: UsbId },
    Detach { domain: String, id: UsbId },
}

/// Scripted hypervisor
///
/// Stopped domains take changes like running ones (libvirt edits their
/// persistent config) unless marked with [`FakeHypervisor::refuse_changes`],
/// which makes every change fail with [`Error::DomainNotRunning`]. Unknown
/// domains fail with [`Error::UnknownDomain`]. Every attempted change is
/// recorded, failed or not.
#[derive(Debug, Default)]
pub struct FakeHypervisor {
    domains: Vec<(String, bool)>,
    refusing: HashSet<String>,
    attach_failures: HashMap<UsbId, String>,
    detach_failures: HashMap<UsbId, String>,
    calls: RefCell<Vec<HypervisorCall>>,
}

impl FakeHypervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(mut self, name: &str, running: bool) -> Self {
        self.domains.push((name.to_string(), running));
        self
    }

    /// Refuse every change on `domain` while it is stopped
    pub fn refuse_changes(mut self, domain: &str) -> Self {
        self.refusing.insert(domain.to_string());
        self
    }

    pub fn fail_attach(mut self, id: UsbId, message: &str) -> Self {
        self.attach_failures.insert(id, message.to_string());
        self
    }

    pub fn fail_detach(mut self, id: UsbId, message: &str) -> Self {
        self.detach_failures.insert(id, message.to_string());
        self
    }

    /// Device changes attempted so far
    pub fn calls(&self) -> Vec<HypervisorCall> {
        self.calls.borrow().clone()
    }

    fn running(&self, domain: &str) -> Result<bool> {
        self.domains
            .iter()
            .find(|(name, _)| name == domain)
            .map(|(_, running)| *running)
            .ok_or_else(|| Error::UnknownDomain(domain.to_string()))
    }

    fn modify(
        &self,
        call: HypervisorCall,
        domain: &str,
        id: UsbId,
        failures: &HashMap<UsbId, String>,
    ) -> Result<()> {
        let running = self.running(domain)?;
        self.calls.borrow_mut().push(call);

        if !running && self.refusing.contains(domain) {
            return Err(Error::DomainNotRunning(domain.to_string()));
        }
        match failures.get(&id) {
            Some(message) => Err(Error::Hypervisor(message.clone())),
            None => Ok(()),
        }
    }
}

impl Hypervisor for FakeHypervisor {
    fn uri(&self) -> &str {
        "test:///fake"
    }

    fn list_domains(&self, active_only: bool) -> Result<Vec<String>> {
        Ok(self
            .domains
            .iter()
            .filter(|(_, running)| !active_only || *running)
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn is_active(&self, domain: &str) -> Result<bool> {
        self.running(domain)
    }

    fn attach_device(&self, domain: &str, descriptor: &DeviceDescriptor) -> Result<()> {
        let id = descriptor.id();
        let call = HypervisorCall::Attach {
            domain: domain.to_string(),
            id,
        };
        self.modify(call, domain, id, &self.attach_failures)
    }

    fn detach_device(&self, domain: &str, descriptor: &DeviceDescriptor) -> Result<()> {
        let id = descriptor.id();
        let call = HypervisorCall::Detach {
            domain: domain.to_string(),
            id,
        };
        self.modify(call, domain, id, &self.detach_failures)
    }
}

/// Device lister returning a fixed list, or failing
#[derive(Debug, Clone)]
pub struct StaticLister {
    result: std::result::Result<Vec<UsbDevice>, String>,
}

impl StaticLister {
    pub fn new(devices: Vec<UsbDevice>) -> Self {
        Self {
            result: Ok(devices),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

impl DeviceLister for StaticLister {
    fn list_devices(&self) -> Result<Vec<UsbDevice>> {
        self.result.clone().map_err(Error::Enumeration)
    }
}

/// Prompter answering from a queue and recording what it was shown
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    /// Item lists passed to each `choose` call
    pub shown: Vec<Vec<String>>,
    /// Questions asked
    pub questions: Vec<String>,
    /// Non-fatal diagnostics
    pub reports: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn choose(&mut self, items: &[String], question: &str) -> Result<String> {
        self.shown.push(items.to_vec());
        self.questions.push(question.to_string());
        self.answers.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer left").into()
        })
    }

    fn report(&mut self, message: &str) {
        self.reports.push(message.to_string());
    }
}
