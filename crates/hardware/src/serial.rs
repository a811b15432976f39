//! Exclusive serial connection to the microcontroller.
//!
//! Lifecycle: closed -> attempt-open (with a settle delay, since the
//! microcontroller resets when the line opens) -> open -> closed on any
//! I/O error. The bridge task drives reopening; the gateway writes
//! valve-mask prefixes through [`SharedLink`] on a strictly fail-soft
//! basis.

use std::io::{Read as _, Write as _};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use serialport::SerialPort;

use crate::{HardwareError, MaskPort};

pub const BAUD_RATE: u32 = 115_200;
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);
/// Time the microcontroller needs to finish its own reset after the
/// line opens.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

pub struct SerialLink {
    device: String,
    port: Option<Box<dyn SerialPort>>,
    rx: Vec<u8>,
}

impl SerialLink {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            port: None,
            rx: Vec::new(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Opens the device if it is not already open, then waits out the
    /// settle delay. Failure leaves the link closed; the bridge retries
    /// on its next iteration.
    pub fn open(&mut self) -> Result<(), HardwareError> {
        if self.port.is_some() {
            return Ok(());
        }
        let port = serialport::new(&self.device, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()?;
        thread::sleep(SETTLE_DELAY);
        self.rx.clear();
        self.port = Some(port);
        Ok(())
    }

    /// Drops the connection; the next `open` starts from scratch.
    pub fn invalidate(&mut self) {
        self.port = None;
        self.rx.clear();
    }

    /// Pulls any pending bytes off the wire and returns the next
    /// complete line, trimmed. I/O errors invalidate the link.
    pub fn poll_line(&mut self) -> Result<Option<String>, HardwareError> {
        if let Err(err) = self.fill_rx() {
            self.invalidate();
            return Err(err);
        }
        if let Some(end) = self.rx.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.rx.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_owned();
            return Ok(Some(line));
        }
        Ok(None)
    }

    /// Writes one newline-terminated ASCII line. I/O errors invalidate
    /// the link.
    pub fn write_line(&mut self, payload: &str) -> Result<(), HardwareError> {
        let port = self.port.as_mut().ok_or(HardwareError::LinkDown)?;
        let mut framed = Vec::with_capacity(payload.len() + 1);
        framed.extend_from_slice(payload.as_bytes());
        framed.push(b'\n');
        if let Err(err) = port.write_all(&framed) {
            self.invalidate();
            return Err(HardwareError::SerialIo(err));
        }
        Ok(())
    }

    fn fill_rx(&mut self) -> Result<(), HardwareError> {
        let port = self.port.as_mut().ok_or(HardwareError::LinkDown)?;
        let pending = port.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(());
        }
        let mut buf = vec![0u8; pending];
        let count = port.read(&mut buf).map_err(HardwareError::SerialIo)?;
        self.rx.extend_from_slice(&buf[..count]);
        Ok(())
    }
}

/// Shared handle over the serial link. The bridge task holds the lock
/// while reading and reconnecting; the gateway only ever try-locks.
#[derive(Clone)]
pub struct SharedLink {
    inner: Arc<Mutex<SerialLink>>,
}

impl SharedLink {
    pub fn new(link: SerialLink) -> Self {
        Self {
            inner: Arc::new(Mutex::new(link)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, SerialLink> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl MaskPort for SharedLink {
    fn send_mask(&self, bits: &str) {
        // Skip rather than wait while the bridge holds the link, e.g.
        // mid-reconnect with the settle delay running.
        let Ok(mut link) = self.inner.try_lock() else {
            log::debug!("serial link busy, dropping command {bits}");
            return;
        };
        if !link.is_open() {
            log::debug!("serial link down, dropping command {bits}");
            return;
        }
        if let Err(err) = link.write_line(bits) {
            log::warn!("serial write failed: {err}");
        } else {
            log::debug!("sent to microcontroller: {bits}");
        }
    }
}
