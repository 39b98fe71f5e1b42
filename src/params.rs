use crossbeam_utils::atomic::AtomicCell;
use log::*;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterName {
    Shift,
    Variance,
}

impl ParameterName {
    /// Stops on the parameter sliders. Other values are still accepted.
    pub fn presets(&self) -> &'static [f64] {
        match self {
            ParameterName::Shift => &[-3.0, -1.0, 0.0, 1.0, 3.0],
            ParameterName::Variance => &[1.0, 2.0, 10.0, 100.0],
        }
    }

    fn check(&self, value: f64) -> Result<f64> {
        let valid = match self {
            ParameterName::Shift => value.is_finite(),
            ParameterName::Variance => value.is_finite() && value >= 0.0,
        };
        if !valid {
            return Err(Error::InvalidParameter { name: *self, value });
        }
        Ok(value)
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterName::Shift => write!(f, "shift"),
            ParameterName::Variance => write!(f, "variance"),
        }
    }
}

impl FromStr for ParameterName {
    type Err = Error;

    fn from_str(s: &str) -> Result<ParameterName> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shift" => Ok(ParameterName::Shift),
            "variance" => Ok(ParameterName::Variance),
            other => Err(Error::UnknownParameter(other.to_string())),
        }
    }
}

/// Snapshot of the tunables taken once per aggregation step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Parameters {
    pub shift: f64,
    pub variance: f64,
}

impl Default for Parameters {
    fn default() -> Parameters {
        Parameters {
            shift: 0.0,
            variance: 1.0,
        }
    }
}

impl Parameters {
    /// Scales a standard-normal draw into a random-walk increment.
    pub fn innovation(&self, sample: f64) -> f64 {
        sample * self.variance.sqrt() + self.shift
    }

    pub fn validate(&self) -> Result<()> {
        ParameterName::Shift.check(self.shift)?;
        ParameterName::Variance.check(self.variance)?;
        Ok(())
    }
}

/// Live parameter storage. Each field is written atomically on its own;
/// a reader may see one field updated and the other not yet.
pub struct ParameterStore {
    shift: AtomicCell<f64>,
    variance: AtomicCell<f64>,
}

impl ParameterStore {
    pub fn new(initial: Parameters) -> Result<ParameterStore> {
        initial.validate()?;
        Ok(ParameterStore {
            shift: AtomicCell::new(initial.shift),
            variance: AtomicCell::new(initial.variance),
        })
    }

    pub fn set(&self, name: ParameterName, value: f64) -> Result<()> {
        let value = name.check(value)?;
        match name {
            ParameterName::Shift => self.shift.store(value),
            ParameterName::Variance => self.variance.store(value),
        }
        debug!("parameter {} set to {}", name, value);
        Ok(())
    }

    pub fn snapshot(&self) -> Parameters {
        Parameters {
            shift: self.shift.load(),
            variance: self.variance.load(),
        }
    }
}
