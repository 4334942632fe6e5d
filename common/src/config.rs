use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    plot::Plot,
    sweep::{SweepSpace, history_fits},
};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("sweep '{name}' has a zero step")]
    ZeroStep { name: &'static str },
    #[error("sweep '{name}' starts at {start} but ends at {end}")]
    Reversed {
        name: &'static str,
        start: u32,
        end: u32,
    },
    #[error("no benchmarks configured")]
    NoBenchmarks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    #[serde(default)]
    pub settings: Settings,
    pub benchmarks: Vec<String>,
    pub sweeps: Sweeps,
    pub plots: Option<Vec<Box<dyn Plot>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the `*.out` result files
    pub data_dir: PathBuf,
    /// Directory the charts are written to
    pub plot_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            plot_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sweeps {
    /// Index bits taken from the program counter
    pub m: SweepRange,
    /// Global history bits, only swept for gshare
    pub n: SweepRange,
}

/// An inclusive, ascending range of sweep values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepRange {
    pub start: u32,
    pub end: u32,
    #[serde(default = "default_step")]
    pub step: u32,
}

fn default_step() -> u32 {
    1
}

impl SweepRange {
    pub fn new(start: u32, end: u32, step: u32) -> Self {
        Self { start, end, step }
    }

    pub fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.step == 0 {
            return Err(ConfigError::ZeroStep { name });
        }
        if self.start > self.end {
            return Err(ConfigError::Reversed {
                name,
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn values(&self) -> Vec<u32> {
        if self.step == 0 {
            return Vec::new();
        }
        (self.start..=self.end).step_by(self.step as usize).collect()
    }
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .context(format!("Reading config {}", path.display()))?;
        let config: Config = serde_yml::from_str(&content)
            .context(format!("Parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.benchmarks.is_empty() {
            return Err(ConfigError::NoBenchmarks);
        }
        self.sweeps.m.validate("m")?;
        self.sweeps.n.validate("n")
    }

    pub fn sweep_space(&self) -> SweepSpace {
        SweepSpace {
            benchmarks: self.benchmarks.clone(),
            m: self.sweeps.m,
            n: self.sweeps.n,
            is_valid: history_fits,
        }
    }
}
