use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::runtime::Error;

lazy_static! {
    static ref R1_PATTERN: Regex = Regex::new(r"NoIndex.*R1\.fastq\.gz$").unwrap();
    static ref R2_PATTERN: Regex = Regex::new(r"NoIndex.*R2\.fastq\.gz$").unwrap();
    static ref I1_PATTERN: Regex = Regex::new(r"NoIndex.*I1\.fastq\.gz$").unwrap();
    static ref I2_PATTERN: Regex = Regex::new(r"NoIndex.*I2\.fastq\.gz$").unwrap();
}

///////////////////////////////
/// The synchronized input files for one lane. R1 and I1 are always
/// present; R2 makes the run paired end and I2 is required when the
/// catalog says the run is dual coded.
#[derive(Debug, Clone)]
pub struct InputStreamSet {
    pub r1: PathBuf,
    pub r2: Option<PathBuf>,
    pub i1: PathBuf,
    pub i2: Option<PathBuf>,
}

impl InputStreamSet {
    pub fn discover(dir: &Path, dual_indexed: bool) -> Result<InputStreamSet, Error> {
        let r1 = require_one(dir, &R1_PATTERN, "R1")?;
        let r2 = find_optional(dir, &R2_PATTERN, "R2")?;
        if r2.is_none() {
            info!("No R2 file found, treating the run as single ended");
        }
        let i1 = require_one(dir, &I1_PATTERN, "I1")?;
        //A single coded run ignores any I2 file that happens to be present
        let i2 = if dual_indexed {
            Some(require_one(dir, &I2_PATTERN, "I2")?)
        } else {
            None
        };

        debug!(
            "Input files: R1={:?} R2={:?} I1={:?} I2={:?}",
            r1, r2, i1, i2
        );
        Ok(InputStreamSet { r1, r2, i1, i2 })
    }

    pub fn paired(&self) -> bool {
        self.r2.is_some()
    }
}

fn matches_in_dir(dir: &Path, pattern: &Regex) -> Result<Vec<PathBuf>, Error> {
    let entries =
        fs::read_dir(dir).map_err(|e| Error::channel_io(dir.display().to_string(), e))?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::channel_io(dir.display().to_string(), e))?;
        let name = entry.file_name();
        if pattern.is_match(&name.to_string_lossy()) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

fn require_one(dir: &Path, pattern: &Regex, role: &str) -> Result<PathBuf, Error> {
    let mut found = matches_in_dir(dir, pattern)?;
    if found.len() == 1 {
        Ok(found.remove(0))
    } else {
        Err(Error::input_discovery(role, pattern.as_str(), dir, found.len()))
    }
}

fn find_optional(dir: &Path, pattern: &Regex, role: &str) -> Result<Option<PathBuf>, Error> {
    let mut found = matches_in_dir(dir, pattern)?;
    match found.len() {
        0 => Ok(None),
        1 => Ok(Some(found.remove(0))),
        n => Err(Error::input_discovery(role, pattern.as_str(), dir, n)),
    }
}
