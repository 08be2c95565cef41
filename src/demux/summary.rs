use log::debug;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::runtime::Error;

use super::core::RunCounters;

pub const LOG_FILENAME: &str = "splitting_info.log";

///////////////////////////////
/// Final accounting for one run, persisted once after the loop ends or
/// on a fatal abort
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub assigned: u64,
    pub unassigned: u64,
}

impl RunSummary {
    pub fn from_counters(counters: &RunCounters) -> RunSummary {
        RunSummary {
            assigned: counters.assigned,
            unassigned: counters.unassigned,
        }
    }

    pub fn total(&self) -> u64 {
        self.assigned + self.unassigned
    }

    pub fn assigned_percent(&self) -> f64 {
        percent(self.assigned, self.total())
    }

    pub fn unassigned_percent(&self) -> f64 {
        percent(self.unassigned, self.total())
    }

    /// Write the run log into the sample directory
    pub fn write_log(&self, dir: &Path) -> Result<PathBuf, Error> {
        let path = dir.join(LOG_FILENAME);
        debug!("Writing run log to {:?}", path);

        let mut file =
            File::create(&path).map_err(|e| Error::channel_io(LOG_FILENAME, e))?;
        writeln!(
            file,
            "Assigned reads:   {} ({:.1}%)",
            self.assigned,
            self.assigned_percent()
        )
        .map_err(|e| Error::channel_io(LOG_FILENAME, e))?;
        writeln!(
            file,
            "Unassigned reads: {} ({:.1}%)",
            self.unassigned,
            self.unassigned_percent()
        )
        .map_err(|e| Error::channel_io(LOG_FILENAME, e))?;

        Ok(path)
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}
