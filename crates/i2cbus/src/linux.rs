//! Linux i2c-dev transport.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;

use crate::transport::Transport;

/// `ioctl` request binding an i2c-dev file descriptor to a slave address.
pub const I2C_SLAVE: u64 = 0x0703;

/// [`Transport`] over the kernel's `/dev/i2c-N` character devices.
#[derive(Debug, Clone)]
pub struct I2cDev {
    prefix: String,
}

impl I2cDev {
    pub fn new() -> Self {
        Self::with_prefix("/dev/i2c-")
    }

    /// Use `prefix` followed by the bus index as the device path.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn device_path(&self, bus: usize) -> String {
        format!("{}{}", self.prefix, bus)
    }
}

impl Default for I2cDev {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for I2cDev {
    type Handle = File;
    type Error = io::Error;

    fn open(&self, bus: usize, address: u16) -> io::Result<File> {
        let path = self.device_path(bus);
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        // SAFETY: the descriptor is valid for the lifetime of `file` and
        // I2C_SLAVE takes the address by value.
        let ret = unsafe {
            libc::ioctl(
                file.as_raw_fd(),
                I2C_SLAVE as _,
                libc::c_ulong::from(address),
            )
        };
        if ret < 0 {
            let err = io::Error::last_os_error();
            tracing::debug!(%path, address, %err, "I2C_SLAVE ioctl failed");
            return Err(err);
        }
        Ok(file)
    }

    fn close(&self, handle: File) -> io::Result<()> {
        // Dropping the file closes the descriptor.
        drop(handle);
        Ok(())
    }

    fn write(&self, handle: &mut File, buf: &[u8]) -> io::Result<usize> {
        handle.write(buf)
    }

    fn read(&self, handle: &mut File, buf: &mut [u8]) -> io::Result<usize> {
        handle.read(buf)
    }
}
