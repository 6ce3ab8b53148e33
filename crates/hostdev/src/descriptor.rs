//! libvirt `<hostdev>` descriptor for USB passthrough
//!
//! libvirt matches a managed USB host device by vendor and product id. The
//! fragment accepted by `virDomainAttachDeviceFlags` looks like:
//!
//! ```text
//! <hostdev mode="subsystem" type="usb" managed="yes">
//!   <source>
//!     <vendor id="0x1234"/>
//!     <product id="0x5678"/>
//!   </source>
//! </hostdev>
//! ```
//!
//! Only hex digits are ever interpolated, so no escaping is required.

use crate::types::UsbId;

/// Passthrough declaration for one USB device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    id: UsbId,
}

impl DeviceDescriptor {
    /// Descriptor for a USB host device identified by vendor:product
    pub fn usb(id: UsbId) -> Self {
        Self { id }
    }

    /// Device this descriptor refers to
    pub fn id(&self) -> UsbId {
        self.id
    }

    /// Serialize to the XML fragment expected by libvirt
    pub fn to_xml(&self) -> String {
        format!(
            concat!(
                "<hostdev mode=\"subsystem\" type=\"usb\" managed=\"yes\">\n",
                "  <source>\n",
                "    <vendor id=\"0x{vendor}\"/>\n",
                "    <product id=\"0x{product}\"/>\n",
                "  </source>\n",
                "</hostdev>\n",
            ),
            vendor = self.id.vendor_hex(),
            product = self.id.product_hex(),
        )
    }
}
