//! Hotplug auto-attach path
//!
//! Invoked from a udev rule such as:
//!
//! ```text
//! ACTION=="add|remove", SUBSYSTEM=="usb", ENV{DEVTYPE}=="usb_device", \
//!     RUN+="/usr/local/bin/virt-usb --udev"
//! ```
//!
//! udev exports `PRODUCT=<vendor>/<product>/<bcdDevice>` (hex, no padding)
//! and `ACTION`. One device is attached or detached per invocation.

use crate::ignore_list::IgnoreList;
use crate::inventory;
use crate::session::Hypervisor;
use common::{Error, Result};
use hostdev::{DeviceDescriptor, UsbId};
use std::env;
use tracing::{debug, info};

/// udev action keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugAction {
    Add,
    Remove,
    /// Anything else (`bind`, `change`, unset); ignored
    Other(String),
}

impl HotplugAction {
    pub fn parse(action: Option<&str>) -> Self {
        match action.map(str::trim) {
            Some("add") => Self::Add,
            Some("remove") => Self::Remove,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Other(String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotplugEvent {
    pub id: UsbId,
    pub action: HotplugAction,
}

impl HotplugEvent {
    /// Build an event from the `PRODUCT` and `ACTION` values
    pub fn from_vars(product: Option<&str>, action: Option<&str>) -> Result<Self> {
        let product = product
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::Hotplug("PRODUCT is not set".to_string()))?;

        let mut parts = product.split('/');
        let (Some(vendor), Some(model)) = (parts.next(), parts.next()) else {
            return Err(Error::Hotplug(format!(
                "PRODUCT '{}' is not VENDOR/PRODUCT",
                product
            )));
        };

        let id = UsbId::from_hex_parts(vendor, model)
            .map_err(|e| Error::Hotplug(format!("PRODUCT '{}': {}", product, e)))?;

        Ok(Self {
            id,
            action: HotplugAction::parse(action),
        })
    }

    /// Read the event from the process environment
    pub fn from_env() -> Result<Self> {
        let product = env::var("PRODUCT").ok();
        let action = env::var("ACTION").ok();
        Self::from_vars(product.as_deref(), action.as_deref())
    }
}

/// What the hotplug path ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugOutcome {
    Attached { domain: String, id: UsbId },
    Detached { domain: String, id: UsbId },
    /// Listed in the ignore list
    Ignored(UsbId),
    /// Action other than add/remove
    Skipped(String),
}

/// Pick the domain that receives hotplugged devices
///
/// An explicitly requested domain must be defined; otherwise the first
/// running domain is used.
pub fn resolve_target_domain(session: &dyn Hypervisor, requested: Option<&str>) -> Result<String> {
    if let Some(name) = requested {
        let domains = inventory::list_domains(session, false)?;
        if !domains.iter().any(|d| d == name) {
            return Err(Error::UnknownDomain(name.to_string()));
        }
        return Ok(name.to_string());
    }

    inventory::list_domains(session, true)?
        .into_iter()
        .next()
        .ok_or(Error::NoActiveDomain)
}

/// Handle one udev event
pub fn handle_event(
    session: &dyn Hypervisor,
    event: &HotplugEvent,
    requested_domain: Option<&str>,
    ignore: &IgnoreList,
) -> Result<HotplugOutcome> {
    if ignore.contains(&event.id) {
        debug!("{} is in the ignore list", event.id);
        return Ok(HotplugOutcome::Ignored(event.id));
    }

    if let HotplugAction::Other(action) = &event.action {
        debug!("Nothing to do for action '{}'", action);
        return Ok(HotplugOutcome::Skipped(action.clone()));
    }

    let domain = resolve_target_domain(session, requested_domain)?;
    let descriptor = DeviceDescriptor::usb(event.id);

    if event.action == HotplugAction::Add {
        session.attach_device(&domain, &descriptor)?;
        info!("Attached {} to {}", event.id, domain);
        Ok(HotplugOutcome::Attached {
            domain,
            id: event.id,
        })
    } else {
        session.detach_device(&domain, &descriptor)?;
        info!("Detached {} from {}", event.id, domain);
        Ok(HotplugOutcome::Detached {
            domain,
            id: event.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_pads_udev_ids() {
        let event = HotplugEvent::from_vars(Some("46d/c52b/1211"), Some("add")).unwrap();
        assert_eq!(event.id.to_string(), "046d:c52b");
        assert_eq!(event.action, HotplugAction::Add);
    }

    #[test]
    fn test_from_vars_requires_product() {
        assert!(matches!(
            HotplugEvent::from_vars(None, Some("add")),
            Err(Error::Hotplug(_))
        ));
        assert!(matches!(
            HotplugEvent::from_vars(Some("1d6b"), Some("add")),
            Err(Error::Hotplug(_))
        ));
        assert!(matches!(
            HotplugEvent::from_vars(Some("xyz/2"), Some("add")),
            Err(Error::Hotplug(_))
        ));
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!(HotplugAction::parse(Some("remove")), HotplugAction::Remove);
        assert_eq!(
            HotplugAction::parse(Some("bind")),
            HotplugAction::Other("bind".to_string())
        );
        assert_eq!(HotplugAction::parse(None), HotplugAction::Other(String::new()));
    }
}
