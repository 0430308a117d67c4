//! Trait abstraction for the I2C sensor bus to enable testing

use crate::error::{MonitorError, Result};
use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use tracing::info;

/// Trait for the two SMBus block transactions the sensor protocol needs
#[cfg_attr(test, mockall::automock)]
pub trait SensorBus: Send {
    /// Write `command` followed by `args` to the device
    fn write_command(&mut self, command: u8, args: &[u8]) -> Result<()>;

    /// Read `len` bytes starting at `register`
    fn read_block(&mut self, register: u8, len: u8) -> Result<Vec<u8>>;
}

/// Sensor bus backed by a Linux `/dev/i2c-N` character device
pub struct LinuxSensorBus {
    device: LinuxI2CDevice,
    path: String,
    address: u16,
}

impl std::fmt::Debug for LinuxSensorBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinuxSensorBus")
            .field("path", &self.path)
            .field("address", &format_args!("0x{:02X}", self.address))
            .finish_non_exhaustive()
    }
}

impl LinuxSensorBus {
    /// Open the I2C bus and bind it to the sensor's 7-bit address
    ///
    /// # Errors
    ///
    /// Returns error if the bus device cannot be opened or the slave address
    /// cannot be set.
    pub fn open(path: &str, address: u16) -> Result<Self> {
        let device = LinuxI2CDevice::new(path, address).map_err(|e| {
            MonitorError::Sensor(format!("Failed to open {} at 0x{:02X}: {}", path, address, e))
        })?;

        info!("Opened I2C sensor bus {} at address 0x{:02X}", path, address);
        Ok(Self {
            device,
            path: path.to_string(),
            address,
        })
    }
}

impl SensorBus for LinuxSensorBus {
    fn write_command(&mut self, command: u8, args: &[u8]) -> Result<()> {
        self.device
            .smbus_write_i2c_block_data(command, args)
            .map_err(|e| MonitorError::Sensor(format!("I2C write to {} failed: {}", self.path, e)))
    }

    fn read_block(&mut self, register: u8, len: u8) -> Result<Vec<u8>> {
        self.device
            .smbus_read_i2c_block_data(register, len)
            .map_err(|e| MonitorError::Sensor(format!("I2C read from {} failed: {}", self.path, e)))
    }
}
