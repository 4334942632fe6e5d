use std::{io, path::Path};

use eyre::Result;
use regex::Regex;
use thiserror::Error;
use tokio::fs::read;

/// Why a result file produced no rate
#[derive(Debug, Error)]
pub enum RateError {
    #[error("could not read result file: {0}")]
    Unreadable(#[from] io::Error),
    #[error("no misprediction rate line")]
    NotFound,
    #[error("malformed misprediction rate '{0}'")]
    Malformed(String),
}

impl RateError {
    pub fn is_missing_file(&self) -> bool {
        matches!(self, RateError::Unreadable(err) if err.kind() == io::ErrorKind::NotFound)
    }
}

/// Pulls the misprediction rate out of a simulator's text output.
///
/// The grammar is the label `misprediction rate:`, optional whitespace, a run of digits and
/// dots, then a literal `%`. Only the first occurrence in the text counts, and it has to be a
/// percentage between 0 and 100.
#[derive(Debug, Clone)]
pub struct RateExtractor {
    re: Regex,
}

impl RateExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            re: Regex::new(r"misprediction rate:\s*([\d.]+)%")?,
        })
    }

    pub fn extract(&self, output: &str) -> Result<f64, RateError> {
        let cap = self.re.captures(output).ok_or(RateError::NotFound)?;
        let number = cap.get(1).ok_or(RateError::NotFound)?.as_str();
        match number.parse::<f64>() {
            Ok(rate) if (0.0..=100.0).contains(&rate) => Ok(rate),
            _ => Err(RateError::Malformed(number.to_owned())),
        }
    }

    pub fn extract_rate(&self, output: &str) -> Option<f64> {
        self.extract(output).ok()
    }

    /// Reads one result file and extracts its rate. The file is closed before this returns.
    pub async fn read_rate(&self, path: &Path) -> Result<f64, RateError> {
        let bytes = read(path).await?;
        self.extract(&String::from_utf8_lossy(&bytes))
    }
}
