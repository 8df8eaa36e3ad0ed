//! Field types for the three control registers and how they are packed into register bytes.
//!
//! The BME280 has three control registers:
//!
//! ```text
//!   ctrl_hum  (0xF2)   [ - - - - - | osrs_h[2:0] ]
//!   ctrl_meas (0xF4)   [ osrs_t[2:0] | osrs_p[2:0] | mode[1:0] ]
//!   config    (0xF5)   [ t_sb[2:0] | filter[2:0] | - | spi3w_en ]
//! ```
//!
//! Packing never masks the field values. Every field type here is an enum whose encoding fits
//! its field, so a packed byte can't bleed into a neighbouring field.

/// Bit position of the standby time in the config register.
pub const STANDBY_SHIFT: u8 = 5;
/// Standby time bits in the config register.
pub const STANDBY_MASK: u8 = 0b1110_0000;
/// Bit position of the IIR filter coefficient in the config register.
pub const FILTER_SHIFT: u8 = 2;
/// IIR filter bits in the config register.
pub const FILTER_MASK: u8 = 0b0001_1100;
/// The 3-wire SPI enable bit. Always written as 0, this driver talks I2C.
pub const SPI3W_EN_MASK: u8 = 0b0000_0001;

/// Bit position of the temperature oversampling in ctrl_meas.
pub const OSRS_T_SHIFT: u8 = 5;
/// Temperature oversampling bits in ctrl_meas.
pub const OSRS_T_MASK: u8 = 0b1110_0000;
/// Bit position of the pressure oversampling in ctrl_meas.
pub const OSRS_P_SHIFT: u8 = 2;
/// Pressure oversampling bits in ctrl_meas.
pub const OSRS_P_MASK: u8 = 0b0001_1100;
/// Power mode bits in ctrl_meas.
pub const MODE_MASK: u8 = 0b0000_0011;

/// Humidity oversampling bits in ctrl_hum.
pub const OSRS_H_MASK: u8 = 0b0000_0111;

/// Sensor power mode.
///
/// Section 3.3 of the datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    /// No measurements are taken. This is the state after power on.
    Sleep = 0b00,
    /// Take one measurement, then go back to Sleep.
    Forced = 0b01,
    /// Measure continuously, waiting the standby time between measurements.
    Normal = 0b11,
}

impl Mode {
    /// The two bit encoding of this mode.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decode the two mode bits. Both 0b01 and 0b10 mean forced mode.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & MODE_MASK {
            0b00 => Mode::Sleep,
            0b11 => Mode::Normal,
            _ => Mode::Forced,
        }
    }
}

/// Oversampling for one of temperature, pressure or humidity.
///
/// `Skip` disables the measurement, the data register then holds 0x80000 (T, P) or 0x8000 (H).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Oversampling {
    Skip = 0b000,
    X1 = 0b001,
    X2 = 0b010,
    X4 = 0b011,
    X8 = 0b100,
    X16 = 0b101,
}

impl Oversampling {
    /// The three bit encoding of this setting.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decode three oversampling bits. 0b110 and 0b111 are both ×16 according to the datasheet.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => Oversampling::Skip,
            0b001 => Oversampling::X1,
            0b010 => Oversampling::X2,
            0b011 => Oversampling::X4,
            0b100 => Oversampling::X8,
            _ => Oversampling::X16,
        }
    }
}

/// Inactive duration between measurements in normal mode (t_sb).
///
/// Table 27 of the datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Standby {
    Ms0_5 = 0b000,
    Ms62_5 = 0b001,
    Ms125 = 0b010,
    Ms250 = 0b011,
    Ms500 = 0b100,
    Ms1000 = 0b101,
    Ms10 = 0b110,
    Ms20 = 0b111,
}

impl Standby {
    /// The three bit encoding of this standby time.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decode three standby bits. All eight encodings are valid.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => Standby::Ms0_5,
            0b001 => Standby::Ms62_5,
            0b010 => Standby::Ms125,
            0b011 => Standby::Ms250,
            0b100 => Standby::Ms500,
            0b101 => Standby::Ms1000,
            0b110 => Standby::Ms10,
            _ => Standby::Ms20,
        }
    }
}

/// IIR filter coefficient. Applies to temperature and pressure, not humidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Filter {
    Off = 0b000,
    X2 = 0b001,
    X4 = 0b010,
    X8 = 0b011,
    X16 = 0b100,
}

impl Filter {
    /// The three bit encoding of this filter coefficient.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decode three filter bits. Anything above 0b100 is ×16.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => Filter::Off,
            0b001 => Filter::X2,
            0b010 => Filter::X4,
            0b011 => Filter::X8,
            _ => Filter::X16,
        }
    }
}

/// Pack standby and filter into a config register byte. spi3w_en is left at 0.
pub const fn pack_config(standby: Standby, filter: Filter) -> u8 {
    ((standby.bits() << STANDBY_SHIFT) | (filter.bits() << FILTER_SHIFT)) & !SPI3W_EN_MASK
}

/// Split a config register byte into (standby, filter).
pub const fn unpack_config(config: u8) -> (Standby, Filter) {
    (
        Standby::from_bits((config & STANDBY_MASK) >> STANDBY_SHIFT),
        Filter::from_bits((config & FILTER_MASK) >> FILTER_SHIFT),
    )
}

/// Pack pressure oversampling, temperature oversampling and mode into a ctrl_meas byte.
pub const fn pack_ctrl_meas(pressure: Oversampling, temperature: Oversampling, mode: Mode) -> u8 {
    (temperature.bits() << OSRS_T_SHIFT) | (pressure.bits() << OSRS_P_SHIFT) | mode.bits()
}

/// Split a ctrl_meas byte into (pressure oversampling, temperature oversampling, mode).
pub const fn unpack_ctrl_meas(ctrl_meas: u8) -> (Oversampling, Oversampling, Mode) {
    (
        Oversampling::from_bits((ctrl_meas & OSRS_P_MASK) >> OSRS_P_SHIFT),
        Oversampling::from_bits((ctrl_meas & OSRS_T_MASK) >> OSRS_T_SHIFT),
        Mode::from_bits(ctrl_meas & MODE_MASK),
    )
}

/// All user configurable register fields in one place.
///
/// `Settings::default()` is what the driver writes when it is created: 250ms standby, IIR filter
/// ×16, humidity ×4, pressure ×1, temperature ×16, sleep mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct Settings {
    pub standby: Standby,
    pub filter: Filter,
    pub humidity_oversampling: Oversampling,
    pub pressure_oversampling: Oversampling,
    pub temperature_oversampling: Oversampling,
    pub mode: Mode,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            standby: Standby::Ms250,
            filter: Filter::X16,
            humidity_oversampling: Oversampling::X4,
            pressure_oversampling: Oversampling::X1,
            temperature_oversampling: Oversampling::X16,
            mode: Mode::Sleep,
        }
    }
}

/// How long `read_data` waits for a conversion to finish.
///
/// The device clears the "measuring" status bit when the data registers hold the new sample. A
/// device that has gone away never does, so `Unbounded` can block forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum PollLimit {
    /// Keep polling until the device reports it is done.
    #[default]
    Unbounded,
    /// Give up with `Error::Timeout` after this many status reads that still report measuring.
    MaxPolls(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The defaults we write at start-up, as register bytes.
    #[test]
    fn default_settings_register_bytes() {
        let settings = Settings::default();
        // 0b011 << 5 | 0b100 << 2 = 0x60 | 0x10
        assert_eq!(pack_config(settings.standby, settings.filter), 0x70);
        // osrs_t 0b101 << 5, osrs_p 0b001 << 2, mode 0b00
        assert_eq!(
            pack_ctrl_meas(
                settings.pressure_oversampling,
                settings.temperature_oversampling,
                settings.mode
            ),
            0b1010_0100
        );
        assert_eq!(settings.humidity_oversampling.bits(), 0b011);
    }

    /// Pressure and temperature sit in different bit positions, make sure they aren't swapped.
    #[test]
    fn ctrl_meas_field_positions() {
        let byte = pack_ctrl_meas(Oversampling::X2, Oversampling::X8, Mode::Normal);
        assert_eq!(byte, 0b1000_1011);
        assert_eq!(
            unpack_ctrl_meas(byte),
            (Oversampling::X2, Oversampling::X8, Mode::Normal)
        );
    }

    #[test]
    fn config_never_sets_spi3w() {
        let byte = pack_config(Standby::Ms20, Filter::X16);
        assert_eq!(byte & SPI3W_EN_MASK, 0);
        assert_eq!(unpack_config(byte), (Standby::Ms20, Filter::X16));
        // A device that has spi3w_en set still decodes.
        assert_eq!(unpack_config(0b0010_1001), (Standby::Ms62_5, Filter::X4));
    }

    /// Reserved encodings decode the way the datasheet says the device treats them.
    #[test]
    fn reserved_encodings() {
        assert_eq!(Mode::from_bits(0b10), Mode::Forced);
        assert_eq!(Oversampling::from_bits(0b110), Oversampling::X16);
        assert_eq!(Oversampling::from_bits(0b111), Oversampling::X16);
        assert_eq!(Filter::from_bits(0b111), Filter::X16);
    }
}
