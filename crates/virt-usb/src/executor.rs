//! Attachment executor
//!
//! Applies an attach, detach or reattach to every selected device and
//! collects per-device results. A failure on one device only fails that
//! device, unless the session reports that the domain refused the change
//! because it is not running, in which case the whole batch is aborted.

use crate::session::Hypervisor;
use common::Result;
use hostdev::{DeviceDescriptor, Operation, UsbId};
use tracing::{info, warn};

/// One invocation's worth of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRequest {
    pub domain: String,
    pub devices: Vec<UsbId>,
    pub operation: Operation,
}

/// A device the hypervisor refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFailure {
    pub id: UsbId,
    pub reason: String,
}

/// Outcome of a completed batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub operation: Operation,
    pub succeeded: Vec<UsbId>,
    pub failed: Vec<DeviceFailure>,
}

impl Report {
    fn new(operation: Operation) -> Self {
        Self {
            operation,
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Ids that failed, in processing order
    pub fn failed_ids(&self) -> Vec<UsbId> {
        self.failed.iter().map(|f| f.id).collect()
    }

    /// Summary lines for the user; empty groups are left out
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if !self.succeeded.is_empty() {
            lines.push(format!(
                "{} devices: {}",
                self.operation.past_tense(),
                join_ids(&self.succeeded)
            ));
        }

        if !self.failed.is_empty() {
            lines.push(format!(
                "Failed to {} these devices: {}",
                self.operation.verb(),
                join_ids(&self.failed_ids())
            ));
        }

        lines
    }
}

/// Comma-separated canonical ids
pub fn join_ids(ids: &[UsbId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Apply `request` device by device
///
/// Stops at the first batch-fatal error (such as
/// [`common::Error::DomainNotRunning`]); no report is produced in that case.
pub fn apply(session: &dyn Hypervisor, request: &AttachmentRequest) -> Result<Report> {
    let mut report = Report::new(request.operation);

    for &id in &request.devices {
        let descriptor = DeviceDescriptor::usb(id);

        match apply_one(session, &request.domain, &descriptor, request.operation) {
            Ok(()) => {
                info!("{} {} on {}", request.operation.past_tense(), id, request.domain);
                report.succeeded.push(id);
            }
            Err(e) if e.is_batch_fatal() => return Err(e),
            Err(e) => {
                let reason = e.to_string();
                warn!("Failed to {} {}: {}", request.operation, id, reason);
                report.failed.push(DeviceFailure { id, reason });
            }
        }
    }

    Ok(report)
}

fn apply_one(
    session: &dyn Hypervisor,
    domain: &str,
    descriptor: &DeviceDescriptor,
    operation: Operation,
) -> Result<()> {
    match operation {
        Operation::Attach => session.attach_device(domain, descriptor),
        Operation::Detach => session.detach_device(domain, descriptor),
        Operation::Reattach => {
            session.detach_device(domain, descriptor)?;
            session.attach_device(domain, descriptor)
        }
    }
}
