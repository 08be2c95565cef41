use anyhow::Result;
use clap::Args;
use log::{debug, info, warn};
use std::path::PathBuf;

use crate::barcode::{BarcodeCatalog, IndexTransform};
use crate::demux::core::{self, DemuxConfig, DemuxStreams, RunCounters};
use crate::demux::{InputStreamSet, OutputChannelPool, RunSummary};
use crate::runtime::Error;

pub const DEFAULT_DATA_DIR: &str = "/primary";

///////////////////////////////
/// Split one lane of raw FASTQ files into per-sample files
#[derive(Args)]
pub struct SplitCMD {
    /// Run folder name, e.g. 20250618_AV240405_AV_B_ET6249_SE75_18062025
    #[arg(value_parser)]
    pub run_folder: String,

    /// Lane number on the flow cell, i.e. L001 is 1
    #[arg(long = "lane-number", default_value_t = 1)]
    pub lane_number: u64,

    /// A UMI follows the barcode in the I1 read; requires --barcode-length
    #[arg(long = "i1-umi")]
    pub i1_umi: bool,

    /// Trim the first N bases from the I1 sequence
    #[arg(long = "i1-trim", value_name = "N", default_value_t = 0)]
    pub i1_trim: usize,

    /// Reverse complement the I1 sequence
    #[arg(long = "i1-revcomp")]
    pub i1_revcomp: bool,

    /// Reverse complement the I2 sequence
    #[arg(long = "i2-revcomp")]
    pub i2_revcomp: bool,

    /// Barcode length, if it differs from the index read length
    #[arg(long = "barcode-length", value_name = "N", default_value_t = 0)]
    pub barcode_length: usize,

    /// Tab-delimited sample sheet (5' barcode, 3' barcode, sample, lane);
    /// without it the barcodes are fetched from the LIMS
    #[arg(long = "sample-sheet", value_parser)]
    pub sample_sheet: Option<PathBuf>,

    /// LIMS connection URL, e.g. mysql://user@host/sierra
    #[arg(long = "db-url")]
    pub db_url: Option<String>,

    /// Root directory holding the run folders
    #[arg(long = "data-dir", value_parser, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,
}

impl SplitCMD {
    /// Run the commandline option. Loads the barcode catalog, opens every
    /// input stream and output channel, then streams the reads through.
    pub fn try_execute(&mut self) -> Result<()> {
        info!("Running command: split, run folder {}", self.run_folder);

        if self.i1_umi && self.barcode_length == 0 {
            return Err(Error::config("--i1-umi requires --barcode-length").into());
        }

        let catalog = match (&self.sample_sheet, &self.db_url) {
            (Some(sheet), None) => BarcodeCatalog::from_sheet(sheet)?,
            (None, Some(url)) => {
                BarcodeCatalog::from_lims(url, &self.run_folder, self.lane_number)?
            }
            (Some(_), Some(_)) => {
                return Err(Error::config("--sample-sheet and --db-url are mutually exclusive").into())
            }
            (None, None) => {
                return Err(Error::config("either --sample-sheet or --db-url is required").into())
            }
        };
        info!(
            "Expecting {} barcodes; dual coded: {}",
            catalog.samples.len(),
            catalog.dual_indexed
        );

        let sample_dir = self.sample_dir();
        let inputs = InputStreamSet::discover(&sample_dir, catalog.dual_indexed)?;
        let mut streams = DemuxStreams::open(&inputs)?;
        let mut pool =
            OutputChannelPool::open_all(&sample_dir, &catalog, self.lane_number, inputs.paired())?;

        let config = DemuxConfig {
            i1: IndexTransform {
                trim: self.i1_trim,
                revcomp: self.i1_revcomp,
                umi: self.i1_umi,
                barcode_length: self.barcode_length,
            },
            i2: IndexTransform {
                revcomp: self.i2_revcomp,
                ..Default::default()
            },
        };

        let mut counters = RunCounters::default();
        let result = core::run(&mut streams, &catalog, &mut pool, &config, &mut counters);
        let summary = RunSummary::from_counters(&counters);

        match result {
            Ok(()) => {
                info!(
                    "Assigned reads:   {} ({:.1}%)",
                    summary.assigned,
                    summary.assigned_percent()
                );
                info!(
                    "Unassigned reads: {} ({:.1}%)",
                    summary.unassigned,
                    summary.unassigned_percent()
                );
                for (channel, records) in pool.record_counts() {
                    debug!("{}: {} reads", channel, records);
                }
                summary.write_log(&sample_dir)?;
                pool.close_all()?;
                info!("Split has finished successfully");
                Ok(())
            }
            Err(e) => {
                //The channels already opened are finished by drop; the log
                //still records what was processed before the abort
                drop(pool);
                if let Err(log_err) = summary.write_log(&sample_dir) {
                    warn!("Could not write run log after abort: {}", log_err);
                }
                Err(e.into())
            }
        }
    }

    /// The directory holding the lane's raw NoIndex files; outputs and the
    /// run log go next to them
    fn sample_dir(&self) -> PathBuf {
        self.data_dir
            .join(&self.run_folder)
            .join("Unaligned")
            .join("Project_External")
            .join(format!("Sample_lane{}", self.lane_number))
    }
}
