//! Motion sensing.
//!
//! A `MotionSensor` reports the current level of a PIR-style sensor. The
//! capture loop feeds those levels through `RisingEdge` so one continuous
//! high period triggers exactly one capture.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

/// Level-reading motion sensor.
pub trait MotionSensor {
    /// Sensor identifier for logs.
    fn name(&self) -> String;

    /// Returns true while motion is detected.
    fn read(&mut self) -> Result<bool>;
}

/// Rising-edge detector over sensor levels.
#[derive(Clone, Copy, Debug, Default)]
pub struct RisingEdge {
    last: bool,
}

impl RisingEdge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a level sample; returns true only on a low→high transition.
    pub fn update(&mut self, level: bool) -> bool {
        let fired = level && !self.last;
        self.last = level;
        fired
    }
}

/// Sensor backed by a sysfs GPIO `value` file (e.g. `/sys/class/gpio/gpio8/value`).
pub struct SysfsGpioSensor {
    path: PathBuf,
}

impl SysfsGpioSensor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MotionSensor for SysfsGpioSensor {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&mut self) -> Result<bool> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read gpio value {}", self.path.display()))?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(anyhow!(
                "unexpected gpio value {:?} in {}",
                other,
                self.path.display()
            )),
        }
    }
}

/// Synthetic sensor that goes high on every `period`-th poll.
pub struct StubMotionSensor {
    period: u64,
    polls: u64,
}

impl StubMotionSensor {
    pub fn new(period: u64) -> Result<Self> {
        if period == 0 {
            return Err(anyhow!("stub motion period must be greater than zero"));
        }
        Ok(Self { period, polls: 0 })
    }
}

impl MotionSensor for StubMotionSensor {
    fn name(&self) -> String {
        format!("stub://every/{}", self.period)
    }

    fn read(&mut self) -> Result<bool> {
        self.polls += 1;
        Ok(self.polls % self.period == 0)
    }
}

/// Builds a sensor from a source string.
///
/// `stub://every/N` yields a [`StubMotionSensor`]; anything else is treated as
/// a sysfs GPIO value path.
pub fn sensor_from_source(source: &str) -> Result<Box<dyn MotionSensor>> {
    if let Some(rest) = source.strip_prefix("stub://") {
        let period = rest
            .strip_prefix("every/")
            .ok_or_else(|| anyhow!("stub motion source must look like stub://every/N"))?
            .parse::<u64>()
            .map_err(|_| anyhow!("stub motion period must be an integer"))?;
        return Ok(Box::new(StubMotionSensor::new(period)?));
    }
    if source.trim().is_empty() {
        return Err(anyhow!("motion source must not be empty"));
    }
    Ok(Box::new(SysfsGpioSensor::new(source)))
}
