//! Run configuration.
use std::{str::FromStr, time::Duration};

use crate::{error::Error, record::DEFAULT_FEATURE};

/// Nominal chunk size: 1MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

/// Base used to turn the designated negative log feature into a score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogBase {
    E,
    Two,
    Ten,
    Custom(f64),
}

impl Default for LogBase {
    fn default() -> Self {
        Self::E
    }
}

impl LogBase {
    pub fn value(&self) -> f64 {
        match self {
            Self::E => std::f64::consts::E,
            Self::Two => 2.0,
            Self::Ten => 10.0,
            Self::Custom(b) => *b,
        }
    }
}

impl FromStr for LogBase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "e" | "E" => Ok(Self::E),
            "2" => Ok(Self::Two),
            "10" => Ok(Self::Ten),
            other => {
                let base: f64 = other
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid log base {:?}", other)))?;
                if !base.is_finite() || base <= 0.0 || base == 1.0 {
                    return Err(Error::Config(format!(
                        "log base must be positive and different from 1, got {}",
                        base
                    )));
                }
                Ok(Self::Custom(base))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    chunk_size: u64,
    workers: Option<usize>,
    log_base: LogBase,
    feature: String,
    escape: bool,
    heartbeat: Duration,
    stall_after: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: None,
            log_base: LogBase::default(),
            feature: DEFAULT_FEATURE.to_string(),
            escape: true,
            heartbeat: Duration::from_secs(10),
            stall_after: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// `None` means one worker per available CPU.
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_log_base(mut self, log_base: LogBase) -> Self {
        self.log_base = log_base;
        self
    }

    pub fn with_feature(mut self, feature: &str) -> Self {
        self.feature = feature.to_string();
        self
    }

    pub fn with_escape(mut self, escape: bool) -> Self {
        self.escape = escape;
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn with_stall_after(mut self, stall_after: Duration) -> Self {
        self.stall_after = stall_after;
        self
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn workers(&self) -> Option<usize> {
        self.workers
    }

    pub fn log_base(&self) -> LogBase {
        self.log_base
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn escape(&self) -> bool {
        self.escape
    }

    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    pub fn stall_after(&self) -> Duration {
        self.stall_after
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk size must be at least 1 byte".to_string()));
        }
        if self.workers == Some(0) {
            return Err(Error::Config("worker pool needs at least one worker".to_string()));
        }
        if self.feature.is_empty() || self.feature.contains(char::is_whitespace) {
            return Err(Error::Config(format!(
                "invalid feature name {:?}",
                self.feature
            )));
        }
        if self.heartbeat.is_zero() {
            return Err(Error::Config("heartbeat interval must be positive".to_string()));
        }
        let base = self.log_base.value();
        if !base.is_finite() || base <= 0.0 || base == 1.0 {
            return Err(Error::Config(format!("invalid log base {}", base)));
        }
        Ok(())
    }
}
