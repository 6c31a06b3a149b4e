//! HID device traits

use crate::{HidCommonError, HidCommonResult, HidDeviceInfo};

pub trait HidDevice {
    fn write_report(&mut self, data: &[u8]) -> HidCommonResult<usize>;

    /// Blocks for at most `timeout_ms`. An empty vector means the timeout
    /// elapsed without a report.
    fn read_report(&mut self, timeout_ms: u32) -> HidCommonResult<Vec<u8>>;

    fn get_device_info(&self) -> &HidDeviceInfo;

    fn is_connected(&self) -> bool;

    fn close(&mut self) -> HidCommonResult<()>;
}

pub trait HidPort {
    fn list_devices(&mut self) -> HidCommonResult<Vec<HidDeviceInfo>>;

    fn open_device(&mut self, path: &str) -> HidCommonResult<Box<dyn HidDevice>>;

    fn refresh(&mut self) -> HidCommonResult<()>;

    /// Opens the first enumerated device matching `vendor_id:product_id`.
    fn open_first(
        &mut self,
        vendor_id: u16,
        product_id: u16,
    ) -> HidCommonResult<Box<dyn HidDevice>> {
        self.refresh()?;
        let info = self
            .list_devices()?
            .into_iter()
            .find(|d| d.matches(vendor_id, product_id))
            .ok_or_else(|| {
                HidCommonError::DeviceNotFound(format!("{vendor_id:04x}:{product_id:04x}"))
            })?;
        self.open_device(&info.path)
    }
}

pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    enum MockRead {
        Report(Vec<u8>),
        Failure,
    }

    /// In-memory device. Clones share queues and plug state, so a test can
    /// keep one clone while the code under test owns another.
    #[derive(Clone)]
    pub struct MockHidDevice {
        info: HidDeviceInfo,
        read_queue: Arc<Mutex<VecDeque<MockRead>>>,
        write_history: Arc<Mutex<Vec<Vec<u8>>>>,
        plugged: Arc<Mutex<bool>>,
        failing_writes: Arc<AtomicUsize>,
        reject_report_id: Arc<Mutex<bool>>,
        open: bool,
    }

    impl MockHidDevice {
        pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
            Self {
                info: HidDeviceInfo::new(vendor_id, product_id, path),
                read_queue: Arc::new(Mutex::new(VecDeque::new())),
                write_history: Arc::new(Mutex::new(Vec::new())),
                plugged: Arc::new(Mutex::new(true)),
                failing_writes: Arc::new(AtomicUsize::new(0)),
                reject_report_id: Arc::new(Mutex::new(false)),
                open: true,
            }
        }

        pub fn queue_read(&self, data: Vec<u8>) {
            let mut queue = self.read_queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.push_back(MockRead::Report(data));
        }

        /// The next read after the queued reports fails with a transport error.
        pub fn queue_read_failure(&self) {
            let mut queue = self.read_queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.push_back(MockRead::Failure);
        }

        pub fn pending_reads(&self) -> usize {
            self.read_queue
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .len()
        }

        pub fn get_write_history(&self) -> Vec<Vec<u8>> {
            let history = self.write_history.lock().unwrap_or_else(|e| e.into_inner());
            history.clone()
        }

        pub fn clear_write_history(&self) {
            self.write_history
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clear();
        }

        /// Fail the next `count` writes with [`HidCommonError::WriteError`].
        pub fn fail_next_writes(&self, count: usize) {
            self.failing_writes.store(count, Ordering::SeqCst);
        }

        /// Reject writes that carry a leading report-ID byte, like hidraw
        /// nodes without numbered reports on some hosts.
        pub fn reject_report_id_prefix(&self, reject: bool) {
            *self
                .reject_report_id
                .lock()
                .unwrap_or_else(|e| e.into_inner()) = reject;
        }

        /// Simulates pulling the cable: every handle starts failing.
        pub fn disconnect(&self) {
            let mut plugged = self.plugged.lock().unwrap_or_else(|e| e.into_inner());
            *plugged = false;
        }

        pub fn reconnect(&self) {
            let mut plugged = self.plugged.lock().unwrap_or_else(|e| e.into_inner());
            *plugged = true;
        }

        pub fn is_plugged(&self) -> bool {
            *self.plugged.lock().unwrap_or_else(|e| e.into_inner())
        }

        fn fresh_handle(&self) -> Self {
            Self {
                open: true,
                ..self.clone()
            }
        }
    }

    impl HidDevice for MockHidDevice {
        fn write_report(&mut self, data: &[u8]) -> HidCommonResult<usize> {
            if !self.is_connected() {
                return Err(HidCommonError::Disconnected);
            }

            let reject_prefix = *self
                .reject_report_id
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if reject_prefix && data.first() == Some(&0x00) {
                return Err(HidCommonError::WriteError(
                    "report id not supported".to_string(),
                ));
            }

            if self.failing_writes.load(Ordering::SeqCst) > 0 {
                self.failing_writes.fetch_sub(1, Ordering::SeqCst);
                return Err(HidCommonError::WriteError("injected failure".to_string()));
            }

            let mut history = self.write_history.lock().unwrap_or_else(|e| e.into_inner());
            history.push(data.to_vec());
            Ok(data.len())
        }

        fn read_report(&mut self, _timeout_ms: u32) -> HidCommonResult<Vec<u8>> {
            if !self.is_connected() {
                return Err(HidCommonError::Disconnected);
            }

            let mut queue = self.read_queue.lock().unwrap_or_else(|e| e.into_inner());
            match queue.pop_front() {
                Some(MockRead::Report(data)) => Ok(data),
                Some(MockRead::Failure) => {
                    Err(HidCommonError::ReadError("injected failure".to_string()))
                }
                None => Ok(Vec::new()),
            }
        }

        fn get_device_info(&self) -> &HidDeviceInfo {
            &self.info
        }

        fn is_connected(&self) -> bool {
            self.open && self.is_plugged()
        }

        fn close(&mut self) -> HidCommonResult<()> {
            self.open = false;
            Ok(())
        }
    }

    /// Port over a fixed set of mock devices. Unplugged devices are not
    /// enumerated.
    #[derive(Clone, Default)]
    pub struct MockHidPort {
        devices: Arc<Mutex<Vec<MockHidDevice>>>,
        probes: Arc<AtomicUsize>,
    }

    impl MockHidPort {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_device(&self, device: MockHidDevice) {
            self.devices
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(device);
        }

        pub fn device_count(&self) -> usize {
            self.devices
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .len()
        }

        /// Number of enumeration passes, one per `open_first` call.
        pub fn probes(&self) -> usize {
            self.probes.load(Ordering::SeqCst)
        }
    }

    impl HidPort for MockHidPort {
        fn list_devices(&mut self) -> HidCommonResult<Vec<HidDeviceInfo>> {
            let devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());
            Ok(devices
                .iter()
                .filter(|d| d.is_plugged())
                .map(|d| d.get_device_info().clone())
                .collect())
        }

        fn open_device(&mut self, path: &str) -> HidCommonResult<Box<dyn HidDevice>> {
            let devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());
            devices
                .iter()
                .find(|d| d.info.path == path && d.is_plugged())
                .map(|d| Box::new(d.fresh_handle()) as Box<dyn HidDevice>)
                .ok_or_else(|| HidCommonError::DeviceNotFound(path.to_string()))
        }

        fn refresh(&mut self) -> HidCommonResult<()> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
