#![cfg_attr(not(test), no_std)]
//! BME280 driver.
//!
//! Example:
//!
//!     # use embedded_hal_mock::eh1::delay::NoopDelay;
//!     # use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};
//!     use bme280_driver::{BME280, SENSOR_ADDRESS};
//!     # let expectations = vec![
//!     #     // Calibration, from a real sensor.
//!     #     Transaction::write_read(SENSOR_ADDRESS, vec![0x88], vec![
//!     #         0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B,
//!     #         0x27, 0x0B, 0x8C, 0x00, 0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17,
//!     #     ]),
//!     #     Transaction::write_read(SENSOR_ADDRESS, vec![0xA1], vec![0x4B]),
//!     #     Transaction::write_read(SENSOR_ADDRESS, vec![0xE1], vec![0x6E, 0x01, 0x00, 0x13, 0x2F, 0x03, 0x1E]),
//!     #     // Default settings: config, ctrl_hum, ctrl_meas.
//!     #     Transaction::write(SENSOR_ADDRESS, vec![0xF5, 0x70]),
//!     #     Transaction::write(SENSOR_ADDRESS, vec![0xF2, 0x03]),
//!     #     Transaction::write(SENSOR_ADDRESS, vec![0xF4, 0xA4]),
//!     #     // read_data: the sensor is asleep, so a forced measurement gets triggered.
//!     #     Transaction::write_read(SENSOR_ADDRESS, vec![0xF4], vec![0xA4]),
//!     #     Transaction::write(SENSOR_ADDRESS, vec![0xF4, 0xA5]),
//!     #     Transaction::write_read(SENSOR_ADDRESS, vec![0xF3], vec![0x00]),
//!     #     Transaction::write_read(SENSOR_ADDRESS, vec![0xFA], vec![0x7E, 0xED, 0x00]),
//!     #     Transaction::write_read(SENSOR_ADDRESS, vec![0xF7], vec![0x65, 0x5A, 0xC0]),
//!     #     Transaction::write_read(SENSOR_ADDRESS, vec![0xFD], vec![0x6A, 0x00]),
//!     # ];
//!     # let mock_i2c = I2cMock::new(&expectations);
//!     # let mut delay = NoopDelay::new();
//!     let mut bme280 = BME280::new(mock_i2c, SENSOR_ADDRESS).unwrap();
//!     let reading = bme280.read_data(&mut delay).unwrap();
//!
//!     println!("temperature (bme280): {:.2}C", reading.temperature);
//!     println!("pressure (bme280): {:.1}hPa", reading.pressure / 100.0);
//!     println!("humidity (bme280): {:.2}%", reading.humidity);
//!     # bme280.destroy().done();
//!
//! [BME280 Datasheet](https://www.bosch-sensortec.com/media/boschsensortec/downloads/datasheets/bst-bme280-ds002.pdf)
//!
//! All section references in this crate are to revision 1.6 of the datasheet.
//!
//! The below is how a driver gets created and how `read_data` takes a measurement.
//!
//! ```text
//!           BME280::new
//!                │
//!                ▼
//!   Read calibration 0x88, 0xA1, 0xE1
//!                │
//!                ▼
//!   Write config 0xF5, ctrl_hum 0xF2,
//!   ctrl_meas 0xF4 (sleep mode)
//!                │
//!                ▼
//!         Read ctrl_meas 0xF4   ◄───────────────────┐
//!                │                                  │
//!                ▼                                  │
//!        Mode::Sleep ──► Yes ──► Write Mode::Forced │
//!                │                       │          │
//!                ▼                       │          │
//!                No ◄────────────────────┘          │
//!                │                                  │
//!                ▼                                  │
//!        Read status 0xF3  ◄──── Wait 2 ms          │
//!                │                   ▲              │
//!                ▼                   │              │
//!          Measuring ──► Yes ────────┘              │
//!                │                                  │
//!                ▼                                  │
//!                No                                 │
//!                │                                  │
//!                ▼                                  │
//!   Read temperature 0xFA, compensate (t_fine)      │
//!                │                                  │
//!                ▼                                  │
//!   Read pressure 0xF7, compensate                  │
//!                │                                  │
//!                ▼                                  │
//!   Read humidity 0xFD, compensate  ── next read ───┘
//! ```
//!
//! The driver is blocking. `read_data` holds the bus for the whole conversion, and the `t_fine` it
//! computes belongs to that one sample, so only one call per sensor may be in flight at a time.

#[macro_use]
mod fmt;

pub mod calibration;
pub mod compensation;
pub mod settings;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

pub use calibration::CalibrationData;
pub use settings::{Filter, Mode, Oversampling, PollLimit, Settings, Standby};

/// BME280 sensor's I2C address with SDO tied to GND.
pub const SENSOR_ADDRESS: u8 = 0b0111_0110; // This is I2C address 0x76;
/// BME280 sensor's I2C address with SDO tied to VDDIO.
pub const SENSOR_ADDRESS_ALT: u8 = 0b0111_0111; // 0x77

/// The value of the id register on a BME280. A BMP280 reports 0x58.
pub const CHIP_ID: u8 = 0x60;
/// Writing this to the reset register performs a power-on reset.
pub const SOFT_RESET_WORD: u8 = 0xB6;

/// Status bit set while a conversion is running. Cleared when results are in the data registers.
pub const STATUS_MEASURING: u8 = 0b0000_1000;
/// Status bit set while calibration data is copied from NVM into image registers.
pub const STATUS_IM_UPDATE: u8 = 0b0000_0001;

/// Time between status polls while waiting for a conversion.
pub const POLL_INTERVAL_MS: u32 = 2;
/// Start-up time after a soft reset, table 1 of the datasheet.
pub const STARTUP_TIME_MS: u32 = 2;

/// Registers used by this driver.
///
/// Memory map is in section 5.3, table 18.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Register {
    CalibTempPress = 0x88, // 24 bytes, dig_T1..dig_P9
    CalibHum1 = 0xA1,      // 1 byte, dig_H1
    ChipId = 0xD0,
    Reset = 0xE0,
    CalibHum2 = 0xE1,   // 7 bytes, dig_H2..dig_H6
    CtrlHum = 0xF2,     // osrs_h
    Status = 0xF3,      // measuring, im_update
    CtrlMeas = 0xF4,    // osrs_t, osrs_p, mode
    Config = 0xF5,      // t_sb, filter, spi3w_en
    PressMsb = 0xF7,    // 3 bytes, 20 bit pressure
    TempMsb = 0xFA,     // 3 bytes, 20 bit temperature
    HumMsb = 0xFD,      // 2 bytes, 16 bit humidity
}

/// SensorStatus is the status register (0xF3) of the BME280.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct SensorStatus(pub u8);

impl SensorStatus {
    /// Create a new SensorStatus from a status register byte.
    pub fn new(status: u8) -> Self {
        SensorStatus(status)
    }

    /// A conversion is running. The data registers still hold the previous result.
    pub fn is_measuring(self) -> bool {
        (self.0 & STATUS_MEASURING) != 0
    }

    /// The NVM calibration data is being copied, right after power on or reset.
    pub fn is_updating(self) -> bool {
        (self.0 & STATUS_IM_UPDATE) != 0
    }
}

/// Raw ADC codes of one sample, as read from the data registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct RawSample {
    /// 20 bits.
    pub temperature: u32,
    /// 20 bits.
    pub pressure: u32,
    /// 16 bits.
    pub humidity: u16,
}

impl RawSample {
    /// Assemble a 20 bit temperature or pressure value from msb, lsb and xlsb.
    ///
    /// Only the top 4 bits of xlsb are data, the 20 bits are `msb:lsb:xlsb[7:4]`.
    pub fn from_20bit(bytes: [u8; 3]) -> u32 {
        ((bytes[0] as u32) << 16 | (bytes[1] as u32) << 8 | bytes[2] as u32) >> 4
    }

    /// Assemble the 16 bit humidity value, msb first.
    pub fn from_16bit(bytes: [u8; 2]) -> u16 {
        u16::from_be_bytes(bytes)
    }
}

/// SensorReading is a single compensated reading from the BME280 sensor.
///
/// This is returned from the `read_data` method. You get:
/// * pressure in Pascal
/// * temperature in degrees Celsius
/// * humidity in % Relative Humidity, always within 0..=100
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct SensorReading {
    pub pressure: f64,
    pub temperature: f64,
    pub humidity: f64,
}

impl From<SensorReading> for (f64, f64, f64) {
    /// (pressure, temperature, humidity)
    fn from(reading: SensorReading) -> Self {
        (reading.pressure, reading.temperature, reading.humidity)
    }
}

/// Driver errors.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C bus error
    I2c(E),
    /// The address given to `new` isn't a usable 7 bit I2C address.
    InvalidAddress(u8),
    /// The sensor kept reporting "measuring" for longer than the configured `PollLimit`.
    Timeout,
    /// The id register didn't contain `CHIP_ID`. Holds what was read.
    UnexpectedChipId(u8),
}

/// Read `buf.len()` bytes starting at `register`.
pub(crate) fn read_register<I, E>(
    i2c: &mut I,
    address: u8,
    register: Register,
    buf: &mut [u8],
) -> Result<(), Error<E>>
where
    I: I2c<Error = E>,
{
    i2c.write_read(address, &[register as u8], buf)
        .map_err(Error::I2c)
}

/// A BME280 sensor on the I2C bus `I`.
///
/// The address of the sensor will be `SENSOR_ADDRESS` or `SENSOR_ADDRESS_ALT`, depending on how
/// the SDO pin is wired. Each driver owns its bus handle and its own copy of the calibration, so
/// several sensors can be used side by side (for example through `embedded-hal-bus`).
pub struct BME280<I>
where
    I: I2c,
{
    i2c: I,
    address: u8,
    calibration: CalibrationData,
    t_fine: i32,
    poll_limit: PollLimit,
}

impl<E, I> BME280<I>
where
    I: I2c<Error = E>,
{
    /// Creates the BME280 driver.
    ///
    /// This consumes the I2C bus `I`, reads the factory calibration and writes
    /// `Settings::default()` to the sensor, which leaves it in sleep mode. The address will
    /// almost always be `SENSOR_ADDRESS` or `SENSOR_ADDRESS_ALT` from this crate.
    pub fn new(mut i2c: I, address: u8) -> Result<Self, Error<E>> {
        // Addresses outside this range are reserved on the I2C bus.
        if !(0x08..=0x77).contains(&address) {
            return Err(Error::InvalidAddress(address));
        }

        let calibration = CalibrationData::load(&mut i2c, address)?;
        debug!("bme280: calibration loaded {}", calibration);

        let mut bme280 = BME280 {
            i2c,
            address,
            calibration,
            t_fine: 0,
            poll_limit: PollLimit::default(),
        };
        bme280.apply_settings(Settings::default())?;

        Ok(bme280)
    }

    /// Write a complete set of register fields.
    ///
    /// ctrl_hum only takes effect after ctrl_meas is written, so it is written first.
    pub fn apply_settings(&mut self, settings: Settings) -> Result<(), Error<E>> {
        self.set_config(settings.standby, settings.filter)?;
        self.set_humidity_oversampling(settings.humidity_oversampling)?;
        self.set_measurement_control(
            settings.pressure_oversampling,
            settings.temperature_oversampling,
            settings.mode,
        )?;
        debug!("bme280: applied {}", settings);

        Ok(())
    }

    /// Set the normal mode standby time and the IIR filter coefficient (config, 0xF5).
    ///
    /// The datasheet notes writes to config may be ignored in normal mode, put the sensor in
    /// sleep mode first if it matters.
    pub fn set_config(&mut self, standby: Standby, filter: Filter) -> Result<(), Error<E>> {
        self.write_register(Register::Config, settings::pack_config(standby, filter))
    }

    /// Read back (standby, filter) from the config register.
    pub fn read_config(&mut self) -> Result<(Standby, Filter), Error<E>> {
        let config = self.read_register_byte(Register::Config)?;
        Ok(settings::unpack_config(config))
    }

    /// Set humidity oversampling (ctrl_hum, 0xF2).
    ///
    /// This only becomes active after the next `set_measurement_control`.
    pub fn set_humidity_oversampling(&mut self, oversampling: Oversampling) -> Result<(), Error<E>> {
        self.write_register(Register::CtrlHum, oversampling.bits())
    }

    /// Read back the humidity oversampling.
    pub fn read_humidity_oversampling(&mut self) -> Result<Oversampling, Error<E>> {
        let ctrl_hum = self.read_register_byte(Register::CtrlHum)?;
        Ok(Oversampling::from_bits(ctrl_hum & settings::OSRS_H_MASK))
    }

    /// Set pressure and temperature oversampling and the power mode (ctrl_meas, 0xF4).
    ///
    /// Writing `Mode::Forced` starts a single conversion.
    pub fn set_measurement_control(
        &mut self,
        pressure: Oversampling,
        temperature: Oversampling,
        mode: Mode,
    ) -> Result<(), Error<E>> {
        self.write_register(
            Register::CtrlMeas,
            settings::pack_ctrl_meas(pressure, temperature, mode),
        )
    }

    /// Read back (pressure oversampling, temperature oversampling, mode).
    pub fn read_measurement_control(&mut self) -> Result<(Oversampling, Oversampling, Mode), Error<E>> {
        let ctrl_meas = self.read_register_byte(Register::CtrlMeas)?;
        Ok(settings::unpack_ctrl_meas(ctrl_meas))
    }

    /// Read the status register.
    pub fn status(&mut self) -> Result<SensorStatus, Error<E>> {
        Ok(SensorStatus::new(self.read_register_byte(Register::Status)?))
    }

    /// Take a measurement and return compensated pressure, temperature and humidity.
    ///
    /// In sleep mode this triggers one forced conversion. In forced mode a conversion is already
    /// running and in normal mode the sensor converts on its own, so nothing is written. Then the
    /// status register is polled every 2 ms until the conversion is done.
    ///
    /// With the default `PollLimit::Unbounded` this never gives up, so a sensor that stops
    /// answering correctly will block here forever. Use `set_poll_limit` to get `Error::Timeout`
    /// instead.
    ///
    /// Temperature is read and compensated before pressure and humidity, since both need the
    /// `t_fine` it produces.
    pub fn read_data(&mut self, delay: &mut impl DelayNs) -> Result<SensorReading, Error<E>> {
        let (pressure_osrs, temperature_osrs, mode) = self.read_measurement_control()?;
        if mode == Mode::Sleep {
            trace!("bme280: triggering forced measurement");
            self.set_measurement_control(pressure_osrs, temperature_osrs, Mode::Forced)?;
        }

        self.wait_for_measurement(delay)?;

        let mut temp_bytes = [0u8; 3];
        self.read_register(Register::TempMsb, &mut temp_bytes)?;
        let adc_t = RawSample::from_20bit(temp_bytes);
        let temperature = compensation::temperature(&self.calibration, adc_t);
        self.t_fine = temperature.t_fine;

        let mut press_bytes = [0u8; 3];
        self.read_register(Register::PressMsb, &mut press_bytes)?;
        let adc_p = RawSample::from_20bit(press_bytes);
        let pressure = compensation::pressure(&self.calibration, self.t_fine, adc_p);

        let mut hum_bytes = [0u8; 2];
        self.read_register(Register::HumMsb, &mut hum_bytes)?;
        let adc_h = RawSample::from_16bit(hum_bytes);
        let humidity = compensation::humidity(&self.calibration, self.t_fine, adc_h);

        trace!(
            "bme280: raw {}, t_fine {}",
            RawSample {
                temperature: adc_t,
                pressure: adc_p,
                humidity: adc_h,
            },
            self.t_fine
        );

        Ok(SensorReading {
            pressure,
            temperature: temperature.celsius,
            humidity,
        })
    }

    /// Poll the status register until the measuring bit clears, or the poll limit is hit.
    fn wait_for_measurement(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        let mut busy_polls: u32 = 0;

        while self.status()?.is_measuring() {
            busy_polls += 1;
            if let PollLimit::MaxPolls(max_polls) = self.poll_limit {
                if busy_polls >= max_polls {
                    warn!("bme280: still measuring after {} polls", busy_polls);
                    return Err(Error::Timeout);
                }
            }
            delay.delay_ms(POLL_INTERVAL_MS);
        }

        Ok(())
    }

    /// Read the chip id register.
    pub fn chip_id(&mut self) -> Result<u8, Error<E>> {
        self.read_register_byte(Register::ChipId)
    }

    /// Check that the device at our address is a BME280.
    pub fn check_chip_id(&mut self) -> Result<(), Error<E>> {
        match self.chip_id()? {
            CHIP_ID => Ok(()),
            other => Err(Error::UnexpectedChipId(other)),
        }
    }

    /// Send the soft reset command to the sensor.
    ///
    /// All registers go back to their power on values, which means sleep mode with every
    /// measurement skipped. Call `apply_settings` afterwards. The calibration doesn't change, but
    /// can be read again with `reload_calibration`.
    pub fn soft_reset(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        self.write_register(Register::Reset, SOFT_RESET_WORD)?;
        debug!("bme280: soft reset");
        delay.delay_ms(STARTUP_TIME_MS);

        Ok(())
    }

    /// Read the factory calibration from the sensor again.
    pub fn reload_calibration(&mut self) -> Result<(), Error<E>> {
        self.calibration = CalibrationData::load(&mut self.i2c, self.address)?;
        Ok(())
    }

    /// The calibration read when the driver was created.
    pub fn calibration(&self) -> &CalibrationData {
        &self.calibration
    }

    /// `t_fine` from the temperature of the last `read_data`. 0 before the first reading.
    pub fn t_fine(&self) -> i32 {
        self.t_fine
    }

    pub fn poll_limit(&self) -> PollLimit {
        self.poll_limit
    }

    /// Choose how long `read_data` waits for a conversion. The default is `PollLimit::Unbounded`.
    pub fn set_poll_limit(&mut self, poll_limit: PollLimit) {
        self.poll_limit = poll_limit;
    }

    /// Destroys this driver and releases the I2C bus `I`
    pub fn destroy(self) -> I {
        self.i2c
    }

    fn read_register(&mut self, register: Register, buf: &mut [u8]) -> Result<(), Error<E>> {
        read_register(&mut self.i2c, self.address, register, buf)
    }

    fn read_register_byte(&mut self, register: Register) -> Result<u8, Error<E>> {
        let mut buf = [0u8; 1];
        self.read_register(register, &mut buf)?;
        Ok(buf[0])
    }

    fn write_register(&mut self, register: Register, value: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(self.address, &[register as u8, value])
            .map_err(Error::I2c)
    }
}
