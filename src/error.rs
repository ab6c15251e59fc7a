use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Config(serde_json::Error),
    Timestamp(time::error::Parse),
    EmptyGroup,
    Provider(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Config(err) => write!(f, "config error: {err}"),
            Error::Timestamp(err) => write!(f, "invalid timestamp: {err}"),
            Error::EmptyGroup => write!(f, "empty snapshot group"),
            Error::Provider(msg) => write!(f, "provider error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Config(err) => Some(err),
            Error::Timestamp(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Config(value)
    }
}

impl From<time::error::Parse> for Error {
    fn from(value: time::error::Parse) -> Self {
        Error::Timestamp(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
