use failure::Fail;

use crate::params::ParameterName;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "invalid configuration: {}", _0)]
    Config(String),

    #[fail(display = "unknown parameter `{}`", _0)]
    UnknownParameter(String),

    #[fail(display = "invalid value {} for parameter {}", value, name)]
    InvalidParameter { name: ParameterName, value: f64 },

    #[fail(display = "pipeline stopped")]
    Stopped,

    #[fail(display = "timed out waiting on channel")]
    TimedOut,

    #[fail(display = "channel counterpart disconnected")]
    Disconnected,

    #[fail(display = "memory probe failed: {}", _0)]
    Probe(String),

    #[fail(display = "unable to spawn generator thread: {}", _0)]
    Spawn(#[fail(cause)] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
