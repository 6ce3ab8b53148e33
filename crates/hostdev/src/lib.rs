//! Host device types for virt-usb
//!
//! This crate defines the value types shared by the inventory, selector and
//! executor layers: USB vendor/product ids, enumerated host devices, the
//! requested operation, and the libvirt `<hostdev>` descriptor used to pass a
//! USB device through to a domain.
//!
//! # Example
//!
//! ```
//! use hostdev::{DeviceDescriptor, UsbId};
//!
//! let id: UsbId = "1234:5678".parse().unwrap();
//! let xml = DeviceDescriptor::usb(id).to_xml();
//!
//! assert!(xml.starts_with(r#"<hostdev mode="subsystem" type="usb" managed="yes">"#));
//! assert!(xml.contains(r#"<vendor id="0x1234"/>"#));
//! assert!(xml.contains(r#"<product id="0x5678"/>"#));
//! ```

pub mod descriptor;
pub mod error;
pub mod types;

pub use descriptor::DeviceDescriptor;
pub use error::{HostdevError, Result};
pub use types::{Operation, UsbDevice, UsbId};
