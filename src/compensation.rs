//! Turning raw ADC codes into °C, Pa and %RH.
//!
//! These are the double precision formulas from section 8.1 of the BME280 datasheet. Temperature
//! must be compensated first: it produces `t_fine`, a fine resolution temperature that both the
//! pressure and the humidity formulas take as input. Using a `t_fine` from a different sample
//! gives plausible looking but wrong values.
use crate::calibration::CalibrationData;

/// Lower bound of the relative humidity output.
pub const HUMIDITY_MIN: f64 = 0.0;
/// Upper bound of the relative humidity output.
pub const HUMIDITY_MAX: f64 = 100.0;

/// Compensated temperature, plus the `t_fine` needed to compensate pressure and humidity of the
/// same sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct Temperature {
    /// Degrees Celsius.
    pub celsius: f64,
    pub t_fine: i32,
}

/// Compensate a 20 bit raw temperature.
pub fn temperature(calib: &CalibrationData, adc_t: u32) -> Temperature {
    let adc_t = adc_t as f64;
    let dig_t1 = calib.dig_t1 as f64;

    let var1 = (adc_t / 16384.0 - dig_t1 / 1024.0) * calib.dig_t2 as f64;
    let delta = adc_t / 131072.0 - dig_t1 / 8192.0;
    let var2 = delta * delta * calib.dig_t3 as f64;

    Temperature {
        celsius: (var1 + var2) / 5120.0,
        // Truncation toward zero, as the datasheet's (BME280_S32_t) cast.
        t_fine: (var1 + var2) as i32,
    }
}

/// Compensate a 20 bit raw pressure into Pascal.
///
/// `t_fine` must come from [`temperature`] on the same sample. Returns exactly 0.0 if the
/// calibration would make the formula divide by zero.
pub fn pressure(calib: &CalibrationData, t_fine: i32, adc_p: u32) -> f64 {
    let mut var1 = t_fine as f64 / 2.0 - 64000.0;
    let mut var2 = var1 * var1 * calib.dig_p6 as f64 / 32768.0;
    var2 += var1 * calib.dig_p5 as f64 * 2.0;
    var2 = var2 / 4.0 + calib.dig_p4 as f64 * 65536.0;
    var1 = (calib.dig_p3 as f64 * var1 * var1 / 524288.0 + calib.dig_p2 as f64 * var1) / 524288.0;
    var1 = (1.0 + var1 / 32768.0) * calib.dig_p1 as f64;

    if var1 == 0.0 {
        return 0.0;
    }

    let mut p = 1048576.0 - adc_p as f64;
    p = (p - var2 / 4096.0) * 6250.0 / var1;
    var1 = calib.dig_p9 as f64 * p * p / 2147483648.0;
    var2 = p * calib.dig_p8 as f64 / 32768.0;
    p + (var1 + var2 + calib.dig_p7 as f64) / 16.0
}

/// Compensate a 16 bit raw humidity into % relative humidity, clamped to 0..=100.
///
/// `t_fine` must come from [`temperature`] on the same sample.
pub fn humidity(calib: &CalibrationData, t_fine: i32, adc_h: u16) -> f64 {
    let var = t_fine as f64 - 76800.0;
    let offset = calib.dig_h4 as f64 * 64.0 + calib.dig_h5 as f64 / 16384.0 * var;
    let gain = calib.dig_h2 as f64 / 65536.0
        * (1.0
            + calib.dig_h6 as f64 / 67108864.0 * var * (1.0 + calib.dig_h3 as f64 / 67108864.0 * var));

    let mut h = (adc_h as f64 - offset) * gain;
    h *= 1.0 - calib.dig_h1 as f64 * h / 524288.0;

    if h > HUMIDITY_MAX {
        HUMIDITY_MAX
    } else if h < HUMIDITY_MIN {
        HUMIDITY_MIN
    } else {
        h
    }
}
