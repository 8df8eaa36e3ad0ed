//! Factory calibration ("trimming") parameters.
//!
//! Every BME280 has 32 bytes of compensation coefficients programmed into non-volatile memory at
//! the factory, spread over three register blocks. They are read once when the driver is created
//! and are then used for every reading. See section 4.2.2 of the datasheet.
//!
//! ```text
//!   0x88..=0x9F  24 bytes  dig_T1..T3, dig_P1..P9      little-endian u16/i16
//!   0xA1          1 byte   dig_H1                      u8
//!   0xE1..=0xE7   7 bytes  dig_H2..H6                  mixed, see below
//! ```
use embedded_hal::i2c::I2c;

use crate::{read_register, Error, Register};

/// Length of the temperature and pressure block starting at 0x88.
pub const TEMP_PRESS_CALIB_LEN: usize = 24;
/// Length of the second humidity block starting at 0xE1.
pub const HUM_CALIB_LEN: usize = 7;

/// Keeps the low nibble of 0xE5, which is the low nibble of dig_H4.
pub const H4_LSB_MASK: i16 = 0x0F;
/// dig_H4's 8 high bits (0xE4) sit above the 4 bits borrowed from 0xE5.
pub const H4_MSB_SHIFT: u32 = 4;
/// dig_H5 is 0xE6:0xE5 without the low nibble of 0xE5.
pub const H5_SHIFT: u32 = 4;

/// The compensation coefficients, named as in the datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct CalibrationData {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,

    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,

    pub dig_h1: u8,
    pub dig_h2: i16,
    pub dig_h3: u8,
    /// 12 bits, signed. 0xE4 holds bits 11..4, the low nibble of 0xE5 holds bits 3..0.
    pub dig_h4: i16,
    /// 12 bits, signed. 0xE6 holds bits 11..4, the high nibble of 0xE5 holds bits 3..0.
    pub dig_h5: i16,
    pub dig_h6: i8,
}

impl CalibrationData {
    /// Read all three calibration blocks from the sensor at `address`.
    ///
    /// This is three register reads. Any bus error is returned as-is in `Error::I2c`.
    pub fn load<I, E>(i2c: &mut I, address: u8) -> Result<Self, Error<E>>
    where
        I: I2c<Error = E>,
    {
        let mut temp_press = [0u8; TEMP_PRESS_CALIB_LEN];
        read_register(i2c, address, Register::CalibTempPress, &mut temp_press)?;

        let mut h1 = [0u8; 1];
        read_register(i2c, address, Register::CalibHum1, &mut h1)?;

        let mut hum = [0u8; HUM_CALIB_LEN];
        read_register(i2c, address, Register::CalibHum2, &mut hum)?;

        Ok(Self::from_bytes(&temp_press, h1[0], &hum))
    }

    /// Decode the raw calibration register contents.
    pub fn from_bytes(
        temp_press: &[u8; TEMP_PRESS_CALIB_LEN],
        h1: u8,
        hum: &[u8; HUM_CALIB_LEN],
    ) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([temp_press[i], temp_press[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([temp_press[i], temp_press[i + 1]]);

        // 0xE4 is the top of dig_H4 and is signed. 0xE5/0xE6 read as one little-endian i16 puts
        // dig_H5 in bits 15..4 and the bottom of dig_H4 in bits 3..0.
        let e4 = hum[3] as i8 as i16;
        let e5_e6 = i16::from_le_bytes([hum[4], hum[5]]);

        CalibrationData {
            dig_t1: u16_at(0),
            dig_t2: i16_at(2),
            dig_t3: i16_at(4),

            dig_p1: u16_at(6),
            dig_p2: i16_at(8),
            dig_p3: i16_at(10),
            dig_p4: i16_at(12),
            dig_p5: i16_at(14),
            dig_p6: i16_at(16),
            dig_p7: i16_at(18),
            dig_p8: i16_at(20),
            dig_p9: i16_at(22),

            dig_h1: h1,
            dig_h2: i16::from_le_bytes([hum[0], hum[1]]),
            dig_h3: hum[2],
            dig_h4: (e4 << H4_MSB_SHIFT) | (e5_e6 & H4_LSB_MASK),
            dig_h5: e5_e6 >> H5_SHIFT,
            dig_h6: hum[6] as i8,
        }
    }
}
