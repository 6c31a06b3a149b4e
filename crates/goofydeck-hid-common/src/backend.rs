//! Production [`HidPort`] on top of `hidapi`

use crate::{HidCommonError, HidCommonResult, HidDevice, HidDeviceInfo, HidPort};
use hidapi::HidApi;
use std::ffi::CString;
use tracing::{debug, trace};

/// Largest input report the port reads in one call.
pub const MAX_INPUT_REPORT: usize = 1024;

pub struct HidApiPort {
    api: HidApi,
}

impl HidApiPort {
    pub fn new() -> HidCommonResult<Self> {
        let api = HidApi::new().map_err(|e| HidCommonError::OpenError(e.to_string()))?;
        Ok(Self { api })
    }
}

fn describe(info: &hidapi::DeviceInfo) -> HidDeviceInfo {
    let mut out = HidDeviceInfo::new(
        info.vendor_id(),
        info.product_id(),
        info.path().to_string_lossy().into_owned(),
    )
    .with_interface(info.interface_number());
    out.serial_number = info.serial_number().map(str::to_owned);
    out.manufacturer = info.manufacturer_string().map(str::to_owned);
    out.product_name = info.product_string().map(str::to_owned);
    out
}

impl HidPort for HidApiPort {
    fn list_devices(&mut self) -> HidCommonResult<Vec<HidDeviceInfo>> {
        Ok(self.api.device_list().map(describe).collect())
    }

    fn open_device(&mut self, path: &str) -> HidCommonResult<Box<dyn HidDevice>> {
        let c_path = CString::new(path).map_err(|e| HidCommonError::OpenError(e.to_string()))?;
        let device = self
            .api
            .open_path(&c_path)
            .map_err(|e| HidCommonError::OpenError(format!("{path}: {e}")))?;
        let info = self
            .api
            .device_list()
            .find(|d| d.path() == c_path.as_c_str())
            .map(describe)
            .unwrap_or_else(|| HidDeviceInfo::new(0, 0, path));
        Ok(Box::new(HidApiDevice::new(device, info)))
    }

    fn refresh(&mut self) -> HidCommonResult<()> {
        self.api
            .refresh_devices()
            .map_err(|e| HidCommonError::OpenError(e.to_string()))
    }

    fn open_first(
        &mut self,
        vendor_id: u16,
        product_id: u16,
    ) -> HidCommonResult<Box<dyn HidDevice>> {
        self.refresh()?;
        let info = self
            .api
            .device_list()
            .find(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
            .map(describe)
            .ok_or_else(|| {
                HidCommonError::DeviceNotFound(format!("{vendor_id:04x}:{product_id:04x}"))
            })?;
        let device = self
            .api
            .open(vendor_id, product_id)
            .map_err(|e| HidCommonError::OpenError(format!("{}: {e}", info.id_string())))?;
        debug!(device = %info.display_name(), path = %info.path, "opened HID device");
        Ok(Box::new(HidApiDevice::new(device, info)))
    }
}

pub struct HidApiDevice {
    device: hidapi::HidDevice,
    info: HidDeviceInfo,
    connected: bool,
}

impl HidApiDevice {
    fn new(device: hidapi::HidDevice, info: HidDeviceInfo) -> Self {
        Self {
            device,
            info,
            connected: true,
        }
    }
}

impl HidDevice for HidApiDevice {
    fn write_report(&mut self, data: &[u8]) -> HidCommonResult<usize> {
        if !self.connected {
            return Err(HidCommonError::Disconnected);
        }
        self.device.write(data).map_err(|e| {
            trace!(len = data.len(), error = %e, "hid write failed");
            HidCommonError::WriteError(e.to_string())
        })
    }

    fn read_report(&mut self, timeout_ms: u32) -> HidCommonResult<Vec<u8>> {
        if !self.connected {
            return Err(HidCommonError::Disconnected);
        }
        let mut buf = vec![0u8; MAX_INPUT_REPORT];
        let timeout = i32::try_from(timeout_ms).unwrap_or(i32::MAX);
        match self.device.read_timeout(&mut buf, timeout) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) => {
                self.connected = false;
                Err(HidCommonError::ReadError(e.to_string()))
            }
        }
    }

    fn get_device_info(&self) -> &HidDeviceInfo {
        &self.info
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn close(&mut self) -> HidCommonResult<()> {
        self.connected = false;
        Ok(())
    }
}
