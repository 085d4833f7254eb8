//! # Getting started
//!
//! A platform agnostic driver for the [HDC1050](https://www.ti.com/lit/ds/symlink/hdc1050.pdf)
//! (and the register compatible HDC1080) from Texas Instruments.
//!
//! This driver supports reading temperature and relative humidity, the
//! identification registers, the battery status flag and configuring the
//! measurement resolution, acquisition mode and heater.
//!
//! ## Example
//! ```rust
//! # // NOTE: Use real i2c instance for your app.
//! # use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
//! # let i2c = I2cMock::new(&[I2cTransaction::write(0x40, vec![]),
//! #     I2cTransaction::write(0x40, vec![0xFE]),
//! #     I2cTransaction::read(0x40, vec![0x54, 0x49]),
//! #     I2cTransaction::write(0x40, vec![0x00]),
//! #     I2cTransaction::read(0x40, vec![0x61, 0x4C, 0x81, 0x9E]),
//! # ]);
//! use hdc1050::mock_utils::SleepNop;
//! // NOTE: You should implement the DelayMs trait for this driver to work
//! // correctly.
//! let mut sensor = hdc1050::new(i2c, SleepNop);
//! assert!(sensor.is_connected().unwrap());
//! println!("{:?}", sensor.read_temperature_and_humidity().unwrap());
//! ```
//!
//! ## Features
//!
//! - `defmt`: log driver activity through the `defmt` framework and derive
//!   `defmt::Format` for the public types.
//! - `log`: log driver activity through the `log` framework.

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

mod fmt;

use core::fmt::{Debug, Display, Formatter};

use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Read, Write},
};

/// Mock utils is a set of tools to aid in testing and documenting you should not
/// use any of the mocks defined in this module in your release binaries.
pub mod mock_utils {
    /// A sleep implementation that does nothing and immediately exits. This is
    /// useful for testing and fuzzing.
    pub struct SleepNop;

    impl embedded_hal::blocking::delay::DelayMs<u32> for SleepNop {
        fn delay_ms(&mut self, _ms: u32) {
            // Nop
        }
    }
}

/// The fixed bus address of the HDC1050.
pub const I2C_ADDRESS: u8 = 0x40;
/// Value of the manufacturer ID register ("TI").
pub const MANUFACTURER_ID: u16 = 0x5449;
/// Value of the device ID register.
pub const DEVICE_ID: u16 = 0x1050;
/// Number of read attempts made before giving up with [`SensorError::Timeout`].
pub const DEFAULT_RETRY_BUDGET: u16 = 200;
/// Wait between two read attempts.
pub const POLL_INTERVAL_MS: u32 = 5;
/// Conversion time allowed after addressing the temperature or humidity register.
pub const CONVERSION_SETTLE_MS: u32 = 50;
/// Start-up time after a software reset.
pub const RESET_STARTUP_MS: u32 = 15;

const SCRATCH_LEN: usize = 4;

const HUMIDITY_RESOLUTION_BIT: u8 = 0;
const TEMPERATURE_RESOLUTION_BIT: u8 = 2;
const BATTERY_STATUS_BIT: u8 = 3;
const ACQUISITION_MODE_BIT: u8 = 4;
const HEATER_BIT: u8 = 5;
const RESET_BIT: u8 = 7;

/// A catch all error for this driver
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError<E> {
    /// The device did not return data within the retry budget.
    Timeout,
    /// A register read asked for more bytes than the scratch buffer holds.
    InvalidLength { requested: usize },
    I2cError(E),
}

impl<E: Debug> Display for SensorError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            SensorError::Timeout => write!(f, "timed out waiting for sensor data"),
            SensorError::InvalidLength { requested } => write!(
                f,
                "cannot read {} bytes, expected 1 to {}",
                requested, SCRATCH_LEN
            ),
            SensorError::I2cError(e) => write!(f, "i2c error: {:?}", e),
        }
    }
}

pub trait I2cMarker: Read + Write
where
    Self: Write<Error = <Self as Read>::Error>,
{
}
impl<T: Read + Write> I2cMarker for T where Self: Write<Error = <Self as Read>::Error> {}

/// The registers of the HDC1050.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Addressing this register starts a measurement.
    Temperature,
    /// Addressing this register starts a measurement.
    Humidity,
    Configuration,
    SerialFirst,
    SerialMid,
    SerialLast,
    ManufacturerId,
    DeviceId,
}

/// Convert the register into the pointer byte sent over i2c.
impl From<Register> for u8 {
    fn from(val: Register) -> u8 {
        match val {
            Register::Temperature => 0x00,
            Register::Humidity => 0x01,
            Register::Configuration => 0x02,
            Register::SerialFirst => 0xFB,
            Register::SerialMid => 0xFC,
            Register::SerialLast => 0xFD,
            Register::ManufacturerId => 0xFE,
            Register::DeviceId => 0xFF,
        }
    }
}

impl Register {
    fn starts_conversion(&self) -> bool {
        matches!(self, Register::Temperature | Register::Humidity)
    }
}

/// Temperature measurement resolution.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TemperatureResolution {
    Bits14 = 0,
    Bits11 = 1,
}

impl TemperatureResolution {
    /// Decodes the chip's bit encoding. Unknown values fall back to 14 bit.
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            1 => TemperatureResolution::Bits11,
            _ => TemperatureResolution::Bits14,
        }
    }
}

/// Humidity measurement resolution.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HumidityResolution {
    Bits14 = 0,
    Bits11 = 1,
    Bits8 = 2,
}

impl HumidityResolution {
    /// Decodes the chip's bit encoding. Unknown values fall back to 14 bit.
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            1 => HumidityResolution::Bits11,
            2 => HumidityResolution::Bits8,
            _ => HumidityResolution::Bits14,
        }
    }
}

/// What a single trigger measures.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquisitionMode {
    /// Either temperature or humidity, depending on the addressed register.
    Single = 0,
    /// Temperature then humidity, read back as 4 bytes from the temperature
    /// register.
    Sequential = 1,
}

/// The upper byte of the configuration register. The lower byte is reserved
/// and always written as zero.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Configuration(u8);

impl Default for Configuration {
    fn default() -> Self {
        Self::POWER_ON
    }
}

impl Configuration {
    /// Power-on reset value: sequential acquisition, 14 bit resolutions,
    /// heater off.
    pub const POWER_ON: Configuration = Configuration(0x10);

    pub fn from_bits(bits: u8) -> Self {
        Configuration(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    fn set_field(&mut self, shift: u8, mask: u8, value: u8) {
        self.0 &= !(mask << shift);
        self.0 |= (value & mask) << shift;
    }

    fn flag(&self, bit: u8) -> bool {
        self.0 & (1 << bit) != 0
    }

    pub fn temperature_resolution(&self) -> TemperatureResolution {
        TemperatureResolution::from_bits((self.0 >> TEMPERATURE_RESOLUTION_BIT) & 0x1)
    }

    pub fn set_temperature_resolution(&mut self, resolution: TemperatureResolution) {
        self.set_field(TEMPERATURE_RESOLUTION_BIT, 0x1, resolution as u8);
    }

    pub fn humidity_resolution(&self) -> HumidityResolution {
        HumidityResolution::from_bits((self.0 >> HUMIDITY_RESOLUTION_BIT) & 0x3)
    }

    pub fn set_humidity_resolution(&mut self, resolution: HumidityResolution) {
        self.set_field(HUMIDITY_RESOLUTION_BIT, 0x3, resolution as u8);
    }

    pub fn acquisition_mode(&self) -> AcquisitionMode {
        if self.flag(ACQUISITION_MODE_BIT) {
            AcquisitionMode::Sequential
        } else {
            AcquisitionMode::Single
        }
    }

    pub fn set_acquisition_mode(&mut self, mode: AcquisitionMode) {
        self.set_field(ACQUISITION_MODE_BIT, 0x1, mode as u8);
    }

    pub fn heater_enabled(&self) -> bool {
        self.flag(HEATER_BIT)
    }

    pub fn set_heater(&mut self, enabled: bool) {
        self.set_field(HEATER_BIT, 0x1, enabled as u8);
    }

    /// The battery flag is computed by the device, it is only meaningful on a
    /// value read back from the sensor. A clear bit means Vdd > 2.8V.
    pub fn battery_ok(&self) -> bool {
        !self.flag(BATTERY_STATUS_BIT)
    }

    fn with_reset(self) -> Self {
        Configuration(self.0 | (1 << RESET_BIT))
    }
}

/// Serial number of the device, as read from the three serial registers.
///
/// Displays as the concatenation of each word in lower case hex, without
/// padding.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialId(pub [u16; 3]);

impl Display for SerialId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let [first, mid, last] = self.0;
        write!(f, "{:x}{:x}{:x}", first, mid, last)
    }
}

/// Unconverted temperature and humidity words.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawMeasurement {
    pub temperature: u16,
    pub humidity: u16,
}

/// A temperature and humidity sample.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    pub celsius: f32,
    pub fahrenheit: f32,
    pub relative_humidity: f32,
}

impl From<RawMeasurement> for Measurement {
    fn from(raw: RawMeasurement) -> Self {
        let celsius = celsius_from_raw(raw.temperature);
        Measurement {
            celsius,
            fahrenheit: fahrenheit_from_celsius(celsius),
            relative_humidity: relative_humidity_from_raw(raw.humidity),
        }
    }
}

/// Converts a raw temperature word into degrees C, in [-40, 125).
pub fn celsius_from_raw(raw: u16) -> f32 {
    raw as f32 * 165.0 / 65536.0 - 40.0
}

pub fn fahrenheit_from_celsius(celsius: f32) -> f32 {
    celsius * 1.8 + 32.0
}

/// Converts a raw humidity word into %RH, in [0, 100).
pub fn relative_humidity_from_raw(raw: u16) -> f32 {
    raw as f32 * 100.0 / 65536.0
}

/// Create a driver object with the power-on configuration.
///
/// # Example
///
/// ```
/// // NOTE: Use real i2c instance for your app.
/// use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
/// use hdc1050::mock_utils::SleepNop;
/// // NOTE: You should implement the DelayMs trait for this driver to work
/// // correctly.
/// let i2c = I2cMock::new(&[]);
/// let sensor = hdc1050::new(i2c, SleepNop);
/// ```
pub fn new<I2C: I2cMarker, D: DelayMs<u32>>(i2c: I2C, delay: D) -> Hdc1050<I2C, D> {
    Hdc1050 {
        i2c,
        delay,
        configuration: Configuration::POWER_ON,
        buffer: [0; SCRATCH_LEN],
        retry_budget: DEFAULT_RETRY_BUDGET,
    }
}

/// An HDC1050 on the i2c bus.
pub struct Hdc1050<I2C: I2cMarker, D: DelayMs<u32>> {
    i2c: I2C,
    delay: D,
    configuration: Configuration,
    buffer: [u8; SCRATCH_LEN],
    retry_budget: u16,
}

impl<I2C: I2cMarker, D: DelayMs<u32>> Hdc1050<I2C, D> {
    /// Releases the i2c handle and delay consuming the driver object.
    ///
    /// # Example
    ///
    /// ```
    /// // NOTE: Use real i2c instance for your app.
    /// use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    /// // Dummy sleep implementation.
    /// use hdc1050::mock_utils::SleepNop;
    /// let i2c = I2cMock::new(&[]);
    /// let sensor = hdc1050::new(i2c, SleepNop);
    /// let (mut i2c, _) = sensor.release();
    /// i2c.done();
    /// ```
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    /// Sets the number of read attempts made before a read gives up.
    pub fn with_retry_budget(mut self, retry_budget: u16) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    pub fn set_retry_budget(&mut self, retry_budget: u16) {
        self.retry_budget = retry_budget;
    }

    pub fn retry_budget(&self) -> u16 {
        self.retry_budget
    }

    /// Reads `byte_count` bytes (1 to 4) from `register`.
    ///
    /// The register pointer is written first. Addressing the temperature or
    /// humidity register starts a conversion, so the driver waits
    /// [`CONVERSION_SETTLE_MS`] before reading. The device NACKs reads while
    /// busy; each refused read costs one unit of the retry budget and a
    /// [`POLL_INTERVAL_MS`] wait.
    ///
    /// # Errors
    /// - [`SensorError::I2cError`] if the register pointer write fails.
    /// - [`SensorError::Timeout`] once the retry budget is spent.
    /// - [`SensorError::InvalidLength`] if `byte_count` is out of range.
    pub fn read_register(
        &mut self,
        register: Register,
        byte_count: usize,
    ) -> Result<&[u8], SensorError<<I2C as Read>::Error>> {
        if byte_count == 0 || byte_count > SCRATCH_LEN {
            return Err(SensorError::InvalidLength {
                requested: byte_count,
            });
        }

        self.i2c
            .write(I2C_ADDRESS, &[register.into()])
            .map_err(SensorError::I2cError)?;

        if register.starts_conversion() {
            self.delay.delay_ms(CONVERSION_SETTLE_MS);
        }

        let mut remaining = self.retry_budget;
        while remaining > 0 {
            if self
                .i2c
                .read(I2C_ADDRESS, &mut self.buffer[..byte_count])
                .is_ok()
            {
                trace!(
                    "read {} bytes from register {}",
                    byte_count,
                    u8::from(register)
                );
                return Ok(&self.buffer[..byte_count]);
            }
            remaining -= 1;
            self.delay.delay_ms(POLL_INTERVAL_MS);
        }

        warn!(
            "register {} not ready after {} attempts",
            u8::from(register),
            self.retry_budget
        );
        Err(SensorError::Timeout)
    }

    fn read_word(&mut self, register: Register) -> Result<u16, SensorError<<I2C as Read>::Error>> {
        let bytes = self.read_register(register, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads the manufacturer ID, [`MANUFACTURER_ID`] on a genuine part.
    pub fn manufacturer_id(&mut self) -> Result<u16, SensorError<<I2C as Read>::Error>> {
        self.read_word(Register::ManufacturerId)
    }

    /// Reads the device ID, [`DEVICE_ID`] on an HDC1050.
    pub fn device_id(&mut self) -> Result<u16, SensorError<<I2C as Read>::Error>> {
        self.read_word(Register::DeviceId)
    }

    /// Reads the three serial registers.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    /// # let i2c = I2cMock::new(&[I2cTransaction::write(0x40, vec![0xFB]),
    /// #     I2cTransaction::read(0x40, vec![0x02, 0x3A]),
    /// #     I2cTransaction::write(0x40, vec![0xFC]),
    /// #     I2cTransaction::read(0x40, vec![0xB6, 0xC4]),
    /// #     I2cTransaction::write(0x40, vec![0xFD]),
    /// #     I2cTransaction::read(0x40, vec![0x80, 0x00]),
    /// # ]);
    /// use hdc1050::mock_utils::SleepNop;
    /// let mut sensor = hdc1050::new(i2c, SleepNop);
    /// let serial = sensor.serial_id().unwrap();
    /// assert_eq!(format!("{}", serial), "23ab6c48000");
    /// ```
    pub fn serial_id(&mut self) -> Result<SerialId, SensorError<<I2C as Read>::Error>> {
        let first = self.read_word(Register::SerialFirst)?;
        let mid = self.read_word(Register::SerialMid)?;
        let last = self.read_word(Register::SerialLast)?;
        Ok(SerialId([first, mid, last]))
    }

    /// Checks that a device acknowledges its address and identifies itself as
    /// a TI part.
    ///
    /// A missing acknowledge is reported as `Ok(false)`. A device that
    /// acknowledges but then never answers the ID read is an error.
    pub fn is_connected(&mut self) -> Result<bool, SensorError<<I2C as Read>::Error>> {
        if self.i2c.write(I2C_ADDRESS, &[]).is_err() {
            debug!("no acknowledge from address {}", I2C_ADDRESS);
            return Ok(false);
        }
        let manufacturer_id = self.manufacturer_id()?;
        if manufacturer_id != MANUFACTURER_ID {
            debug!("unexpected manufacturer id {}", manufacturer_id);
        }
        Ok(manufacturer_id == MANUFACTURER_ID)
    }

    /// The configuration that [`Hdc1050::commit_configuration`] would write.
    pub fn configuration(&self) -> Configuration {
        self.configuration
    }

    pub fn set_temperature_resolution(&mut self, resolution: TemperatureResolution) {
        self.configuration.set_temperature_resolution(resolution);
    }

    /// Sets the temperature resolution from the chip encoding (0 = 14 bit,
    /// 1 = 11 bit). Other values select 14 bit.
    pub fn set_temperature_resolution_bits(&mut self, bits: u8) {
        self.set_temperature_resolution(TemperatureResolution::from_bits(bits));
    }

    pub fn set_humidity_resolution(&mut self, resolution: HumidityResolution) {
        self.configuration.set_humidity_resolution(resolution);
    }

    /// Sets the humidity resolution from the chip encoding (0 = 14 bit,
    /// 1 = 11 bit, 2 = 8 bit). Other values select 14 bit.
    pub fn set_humidity_resolution_bits(&mut self, bits: u8) {
        self.set_humidity_resolution(HumidityResolution::from_bits(bits));
    }

    pub fn set_heater(&mut self, enabled: bool) {
        self.configuration.set_heater(enabled);
    }

    pub fn set_acquisition_mode(&mut self, mode: AcquisitionMode) {
        self.configuration.set_acquisition_mode(mode);
    }

    fn write_configuration(
        &mut self,
        configuration: Configuration,
    ) -> Result<(), SensorError<<I2C as Read>::Error>> {
        self.i2c
            .write(
                I2C_ADDRESS,
                &[Register::Configuration.into(), configuration.bits(), 0x00],
            )
            .map_err(SensorError::I2cError)
    }

    /// Writes the configuration to the device. Setters only change the local
    /// copy until this is called.
    pub fn commit_configuration(&mut self) -> Result<(), SensorError<<I2C as Read>::Error>> {
        debug!("committing configuration {}", self.configuration.bits());
        self.write_configuration(self.configuration)
    }

    /// Reads the configuration back from the device, replacing the local copy.
    pub fn read_configuration(&mut self) -> Result<Configuration, SensorError<<I2C as Read>::Error>> {
        let bytes = self.read_register(Register::Configuration, 2)?;
        self.configuration = Configuration::from_bits(bytes[0]);
        Ok(self.configuration)
    }

    /// Resets the device and returns the local configuration to its power-on
    /// value.
    pub fn soft_reset(&mut self) -> Result<(), SensorError<<I2C as Read>::Error>> {
        self.write_configuration(self.configuration.with_reset())?;
        self.delay.delay_ms(RESET_STARTUP_MS);
        self.configuration = Configuration::POWER_ON;
        Ok(())
    }

    /// Checks the supply voltage flag, refreshing the local configuration from
    /// the device. Returns `true` when Vdd is above 2.8V.
    pub fn is_battery_ok(&mut self) -> Result<bool, SensorError<<I2C as Read>::Error>> {
        Ok(self.read_configuration()?.battery_ok())
    }

    /// Triggers a combined conversion and returns the unconverted words.
    /// Expects [`AcquisitionMode::Sequential`], the power-on mode.
    pub fn read_raw_measurement(&mut self) -> Result<RawMeasurement, SensorError<<I2C as Read>::Error>> {
        let bytes = self.read_register(Register::Temperature, 4)?;
        Ok(RawMeasurement {
            temperature: u16::from_be_bytes([bytes[0], bytes[1]]),
            humidity: u16::from_be_bytes([bytes[2], bytes[3]]),
        })
    }

    /// Reads the temperature and humidity from the sensor.
    ///
    /// # Errors
    /// This may return an error if there is a problem with i2c communication or
    /// the conversion does not finish within the retry budget. The measurement
    /// is not retried.
    ///
    /// # Example
    ///
    /// ```rust
    /// # // NOTE: Use real i2c instance for your app.
    /// # use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    /// # let i2c = I2cMock::new(&[I2cTransaction::write(0x40, vec![0x00]),
    /// #     I2cTransaction::read(0x40, vec![0x61, 0x4C, 0x81, 0x9E]),
    /// # ]);
    /// use hdc1050::mock_utils::SleepNop;
    /// let mut sensor = hdc1050::new(i2c, SleepNop);
    /// let measurement = sensor.read_temperature_and_humidity().unwrap();
    /// assert!((measurement.celsius - 22.71).abs() < 0.01);
    /// assert!((measurement.relative_humidity - 50.63).abs() < 0.01);
    /// ```
    pub fn read_temperature_and_humidity(
        &mut self,
    ) -> Result<Measurement, SensorError<<I2C as Read>::Error>> {
        Ok(self.read_raw_measurement()?.into())
    }

    /// Reads the temperature alone, in degrees C. Expects
    /// [`AcquisitionMode::Single`].
    pub fn read_temperature(&mut self) -> Result<f32, SensorError<<I2C as Read>::Error>> {
        Ok(celsius_from_raw(self.read_word(Register::Temperature)?))
    }

    /// Reads the relative humidity alone, in %RH. Expects
    /// [`AcquisitionMode::Single`].
    pub fn read_humidity(&mut self) -> Result<f32, SensorError<<I2C as Read>::Error>> {
        Ok(relative_humidity_from_raw(self.read_word(Register::Humidity)?))
    }
}
