//! PCA9685 16-channel PWM board over Linux I2C.

use linux_embedded_hal::I2cdev;
use pwm_pca9685::{Address, Channel as PwmChannel, Pca9685};
use tracing::debug;
use wavebot_models::Channel;

use crate::config::ServoConfig;
use crate::error::{HwError, ServoError, ServoResult};
use crate::hardware::{duty_ticks, prescale_for, pulse_width_us, PwmSink};

pub struct Pca9685Sink {
    pwm: Pca9685<I2cdev>,
    frequency_hz: f64,
}

impl Pca9685Sink {
    /// Open the bus, program the prescaler and enable outputs.
    pub fn open(config: &ServoConfig) -> ServoResult<Self> {
        let i2c = I2cdev::new(&config.i2c_bus).map_err(|e| {
            ServoError::hardware_unavailable(format!("{}: {:?}", config.i2c_bus, e))
        })?;

        let mut pwm = Pca9685::new(i2c, Address::from(config.i2c_address))
            .map_err(|e| ServoError::hardware_unavailable(format!("PCA9685 init: {:?}", e)))?;

        let prescale = prescale_for(config.pwm_frequency_hz);
        pwm.set_prescale(prescale)
            .map_err(|e| ServoError::hardware_unavailable(format!("PCA9685 prescale: {:?}", e)))?;
        pwm.enable()
            .map_err(|e| ServoError::hardware_unavailable(format!("PCA9685 enable: {:?}", e)))?;

        debug!(prescale, frequency_hz = config.pwm_frequency_hz, "PCA9685 ready");

        Ok(Self {
            pwm,
            frequency_hz: config.pwm_frequency_hz,
        })
    }
}

fn pwm_channel(channel: Channel) -> Option<PwmChannel> {
    let out = match channel.pin() {
        0 => PwmChannel::C0,
        1 => PwmChannel::C1,
        2 => PwmChannel::C2,
        3 => PwmChannel::C3,
        4 => PwmChannel::C4,
        5 => PwmChannel::C5,
        6 => PwmChannel::C6,
        7 => PwmChannel::C7,
        8 => PwmChannel::C8,
        9 => PwmChannel::C9,
        10 => PwmChannel::C10,
        11 => PwmChannel::C11,
        12 => PwmChannel::C12,
        13 => PwmChannel::C13,
        14 => PwmChannel::C14,
        15 => PwmChannel::C15,
        _ => return None,
    };
    Some(out)
}

impl PwmSink for Pca9685Sink {
    fn set_pwm_duty_cycle(&mut self, channel: Channel, angle: f64) -> Result<(), HwError> {
        let out = pwm_channel(channel).ok_or(HwError::UnsupportedChannel(channel))?;
        let off = duty_ticks(pulse_width_us(angle), self.frequency_hz);
        self.pwm
            .set_channel_on_off(out, 0, off)
            .map_err(|e| HwError::bus(format!("{:?}", e)))
    }

    fn name(&self) -> &'static str {
        "pca9685"
    }
}
