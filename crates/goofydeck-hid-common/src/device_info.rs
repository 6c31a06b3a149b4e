//! Device descriptors for enumerated HID devices

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub path: String,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product_name: Option<String>,
    pub interface_number: Option<i32>,
}

impl HidDeviceInfo {
    pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
        Self {
            vendor_id,
            product_id,
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    pub fn with_interface(mut self, interface_number: i32) -> Self {
        self.interface_number = Some(interface_number);
        self
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }

    /// `vvvv:pppp` in lowercase hex, the form used in logs.
    pub fn id_string(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor_id, self.product_id)
    }

    pub fn display_name(&self) -> String {
        match (&self.manufacturer, &self.product_name) {
            (Some(m), Some(p)) => format!("{m} {p}"),
            (None, Some(p)) => p.clone(),
            (Some(m), None) => m.clone(),
            (None, None) => self.id_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_matching() {
        let info = HidDeviceInfo::new(0x2207, 0x0019, "/dev/hidraw3");
        assert!(info.matches(0x2207, 0x0019));
        assert!(!info.matches(0x2207, 0x0020));
        assert_eq!(info.id_string(), "2207:0019");
    }

    #[test]
    fn test_device_info_display_name() {
        let info = HidDeviceInfo::new(0x2207, 0x0019, "/dev/hidraw3")
            .with_manufacturer("Ulanzi")
            .with_product_name("D200");
        assert_eq!(info.display_name(), "Ulanzi D200");

        let info = HidDeviceInfo::new(0x2207, 0x0019, "/dev/hidraw3").with_product_name("D200");
        assert_eq!(info.display_name(), "D200");

        let info = HidDeviceInfo::new(0x2207, 0x0019, "/dev/hidraw3");
        assert_eq!(info.display_name(), "2207:0019");
    }
}
