//! USB and operation type definitions
//!
//! This module defines the values that flow between the inventory reader,
//! the selector and the attachment executor.

use crate::error::{HostdevError, Result};
use std::fmt;
use std::str::FromStr;

/// USB vendor:product identifier
///
/// Displayed in the canonical `lsusb` form: four lower-case hex digits per
/// half, zero padded (`1d6b:0002`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UsbId {
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
}

impl UsbId {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    /// Build an id from two separate hex strings
    ///
    /// Each half may carry a `0x` prefix and may omit leading zeros, which is
    /// how udev reports them in `PRODUCT` (`1d6b/2/510`).
    pub fn from_hex_parts(vendor: &str, product: &str) -> Result<Self> {
        Ok(Self {
            vendor_id: parse_hex_half(vendor, "vendor")?,
            product_id: parse_hex_half(product, "product")?,
        })
    }

    /// Vendor id as four hex digits, without prefix
    pub fn vendor_hex(&self) -> String {
        format!("{:04x}", self.vendor_id)
    }

    /// Product id as four hex digits, without prefix
    pub fn product_hex(&self) -> String {
        format!("{:04x}", self.product_id)
    }
}

impl fmt::Display for UsbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

impl FromStr for UsbId {
    type Err = HostdevError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (vendor, product) = trimmed
            .split_once(':')
            .ok_or_else(|| HostdevError::InvalidUsbId(trimmed.to_string()))?;

        if product.contains(':') {
            return Err(HostdevError::InvalidUsbId(trimmed.to_string()));
        }

        Self::from_hex_parts(vendor, product)
    }
}

fn parse_hex_half(value: &str, field: &'static str) -> Result<u16> {
    let invalid = || HostdevError::InvalidHex {
        field,
        value: value.to_string(),
    };

    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    u16::from_str_radix(digits, 16).map_err(|_| invalid())
}

/// A USB device currently present on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDevice {
    /// Vendor:product identifier
    pub id: UsbId,
    /// Bus number
    pub bus: u16,
    /// Device number on the bus
    pub device: u16,
    /// Human-readable description reported by the listing command
    pub tag: String,
}

impl UsbDevice {
    /// Device node under /dev/bus/usb
    pub fn node_path(&self) -> String {
        format!("/dev/bus/usb/{:03}/{:03}", self.bus, self.device)
    }
}

impl fmt::Display for UsbDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.tag, self.id)
    }
}

/// Requested change of attachment state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Attach the device to the domain
    Attach,
    /// Detach the device from the domain
    Detach,
    /// Detach, then attach again (not atomic)
    Reattach,
}

impl Operation {
    /// Map the `--attach-usb` / `--detach-usb` flags to an operation
    ///
    /// Both flags together mean reattach. Returns `None` when neither is set.
    pub fn from_flags(attach: bool, detach: bool) -> Option<Self> {
        match (attach, detach) {
            (true, true) => Some(Self::Reattach),
            (true, false) => Some(Self::Attach),
            (false, true) => Some(Self::Detach),
            (false, false) => None,
        }
    }

    /// Lower-case verb, e.g. "attach"
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Attach => "attach",
            Self::Detach => "detach",
            Self::Reattach => "reattach",
        }
    }

    /// Capitalised past tense, e.g. "Attached"
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Attach => "Attached",
            Self::Detach => "Detached",
            Self::Reattach => "Reattached",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}
