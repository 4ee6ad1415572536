use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SwishError {
    #[error("invalid sample: {0}")]
    InvalidSample(String),
    #[error("no valid calibration baseline")]
    NotCalibrated,
    #[error("calibration incomplete: {have} of {need} shots")]
    CalibrationIncomplete { have: usize, need: usize },
    #[error("calibration not started")]
    CalibrationNotStarted,
    #[error("motor overheat guard tripped")]
    MotorOverheat,
    #[error("emergency stop latched")]
    EmergencyStop,
    #[error("trajectory buffer overflow: {dropped} points dropped")]
    BufferOverflow { dropped: u32 },
    #[error("unknown motor {0}")]
    UnknownMotor(usize),
    #[error("no motors mapped to zone {0}")]
    NoMotorsForZone(String),
    #[error("actuator error: {0}")]
    Actuator(String),
    #[error("sensor error: {0}")]
    Sensor(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing sample source")]
    MissingSource,
    #[error("missing actuator")]
    MissingActuator,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
