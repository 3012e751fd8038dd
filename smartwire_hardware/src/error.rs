use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("bus timeout")]
    Timeout,
    #[error("address 0x{0:02x} not acknowledged")]
    AddressNack(u8),
    #[error("data byte not acknowledged by 0x{0:02x}")]
    DataNack(u8),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
