use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pwm error: {0}")]
    Pwm(String),
    #[error("no motor output on pin {0}")]
    InvalidPin(u8),
    #[error("imu disconnected")]
    Disconnected,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
