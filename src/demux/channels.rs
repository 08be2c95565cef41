use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::barcode::BarcodeCatalog;
use crate::fileformat::FastqRecord;
use crate::runtime::Error;

/// Filename token for the unassigned sentinel files
pub const UNASSIGNED_TOKEN: &str = "NoCode";

//Matches the compression level the facility has always used
const GZIP_LEVEL: u32 = 3;

///////////////////////////////
/// One compressed output destination, exclusively owned by the pool
pub struct OutputChannel {
    name: String,
    writer: BufWriter<GzEncoder<File>>,
    records: u64,
    bytes: u64,
}

impl OutputChannel {
    fn create(dir: &Path, filename: &str) -> Result<OutputChannel, Error> {
        let path = dir.join(filename);
        let file = File::create(&path).map_err(|e| Error::channel_io(filename, e))?;
        let encoder = GzEncoder::new(file, Compression::new(GZIP_LEVEL));
        Ok(OutputChannel {
            name: filename.to_string(),
            writer: BufWriter::new(encoder),
            records: 0,
            bytes: 0,
        })
    }

    fn write_record(&mut self, record: &FastqRecord) -> Result<(), Error> {
        let n = record
            .write_to(&mut self.writer)
            .map_err(|e| Error::channel_io(self.name.clone(), e))?;
        self.records += 1;
        self.bytes += n as u64;
        Ok(())
    }

    /// Finish the gzip stream. Consumes the channel so it can only happen
    /// once; dropping an unclosed channel still writes the trailer, but
    /// without surfacing errors.
    fn close(self) -> Result<(), Error> {
        let name = self.name;
        let encoder = self
            .writer
            .into_inner()
            .map_err(|e| Error::channel_io(name.clone(), e.into_error()))?;
        encoder
            .finish()
            .map_err(|e| Error::channel_io(name, e))?;
        Ok(())
    }
}

///////////////////////////////
/// All output destinations for one run: one channel per barcode key
/// (two if paired end) plus the fixed unassigned sentinels. Every
/// channel is opened before the first read is processed.
pub struct OutputChannelPool {
    r1: HashMap<String, OutputChannel>,
    r2: HashMap<String, OutputChannel>,
    unassigned_r1: OutputChannel,
    unassigned_r2: Option<OutputChannel>,
    unassigned_i1: OutputChannel,
    unassigned_i2: Option<OutputChannel>,
}

impl OutputChannelPool {
    pub fn open_all(
        dir: &Path,
        catalog: &BarcodeCatalog,
        lane_number: u64,
        paired: bool,
    ) -> Result<OutputChannelPool, Error> {
        let mut r1 = HashMap::new();
        let mut r2 = HashMap::new();

        //Barcode keys are unique and part of the filename, so two samples
        //sanitizing to the same name cannot collide; keep a guard anyway
        let mut seen = HashSet::new();

        for (key, sample) in &catalog.samples {
            let filename = sample_filename(catalog.lane_id, key, sample, lane_number, "R1");
            if !seen.insert(filename.clone()) {
                return Err(Error::config(format!(
                    "output filename collision: {}",
                    filename
                )));
            }
            r1.insert(key.clone(), OutputChannel::create(dir, &filename)?);

            if paired {
                let filename = sample_filename(catalog.lane_id, key, sample, lane_number, "R2");
                r2.insert(key.clone(), OutputChannel::create(dir, &filename)?);
            }
        }

        let unassigned_r1 = OutputChannel::create(dir, &unassigned_filename(lane_number, "R1"))?;
        let unassigned_r2 = if paired {
            Some(OutputChannel::create(dir, &unassigned_filename(lane_number, "R2"))?)
        } else {
            None
        };
        let unassigned_i1 = OutputChannel::create(dir, &unassigned_filename(lane_number, "I1"))?;
        let unassigned_i2 = if catalog.dual_indexed {
            Some(OutputChannel::create(dir, &unassigned_filename(lane_number, "I2"))?)
        } else {
            None
        };

        debug!(
            "Opened {} output channels in {:?}",
            r1.len() + r2.len() + 2 + paired as usize + catalog.dual_indexed as usize,
            dir
        );

        Ok(OutputChannelPool {
            r1,
            r2,
            unassigned_r1,
            unassigned_r2,
            unassigned_i1,
            unassigned_i2,
        })
    }

    /// Write an assigned read (pair) to its sample's channel(s)
    pub fn write_assigned(
        &mut self,
        key: &str,
        rec_r1: &FastqRecord,
        rec_r2: Option<&FastqRecord>,
    ) -> Result<(), Error> {
        let channel = self
            .r1
            .get_mut(key)
            .ok_or_else(|| Error::config(format!("no output channel for barcode '{}'", key)))?;
        channel.write_record(rec_r1)?;

        if let Some(rec) = rec_r2 {
            let channel = self
                .r2
                .get_mut(key)
                .ok_or_else(|| Error::config(format!("no R2 channel for barcode '{}'", key)))?;
            channel.write_record(rec)?;
        }
        Ok(())
    }

    /// Write an unassigned read group: the untouched reads to the
    /// unassigned read channels, the raw index reads to the index
    /// sentinels
    pub fn write_unassigned(
        &mut self,
        rec_r1: &FastqRecord,
        rec_r2: Option<&FastqRecord>,
        rec_i1: &FastqRecord,
        rec_i2: Option<&FastqRecord>,
    ) -> Result<(), Error> {
        self.unassigned_r1.write_record(rec_r1)?;
        if let (Some(channel), Some(rec)) = (self.unassigned_r2.as_mut(), rec_r2) {
            channel.write_record(rec)?;
        }
        self.unassigned_i1.write_record(rec_i1)?;
        if let (Some(channel), Some(rec)) = (self.unassigned_i2.as_mut(), rec_i2) {
            channel.write_record(rec)?;
        }
        Ok(())
    }

    /// Records written per channel, for the end-of-run debug log
    pub fn record_counts(&self) -> Vec<(String, u64)> {
        let mut counts = Vec::new();
        for channel in self
            .r1
            .values()
            .chain(self.r2.values())
            .chain([&self.unassigned_r1, &self.unassigned_i1])
            .chain(self.unassigned_r2.iter())
            .chain(self.unassigned_i2.iter())
        {
            counts.push((channel.name.clone(), channel.records));
        }
        counts.sort();
        counts
    }

    /// Finish every gzip stream. Consuming the pool makes a double close
    /// impossible; if one channel fails the rest are finished by drop.
    pub fn close_all(self) -> Result<(), Error> {
        for (_, channel) in self.r1 {
            channel.close()?;
        }
        for (_, channel) in self.r2 {
            channel.close()?;
        }
        self.unassigned_r1.close()?;
        if let Some(channel) = self.unassigned_r2 {
            channel.close()?;
        }
        self.unassigned_i1.close()?;
        if let Some(channel) = self.unassigned_i2 {
            channel.close()?;
        }
        Ok(())
    }
}

fn sample_filename(lane_id: u64, key: &str, sample: &str, lane_number: u64, mate: &str) -> String {
    format!(
        "lane{}_{}_{}_L00{}_{}.fastq.gz",
        lane_id, key, sample, lane_number, mate
    )
}

fn unassigned_filename(lane_number: u64, mate: &str) -> String {
    format!(
        "lane{}_{}_L00{}_{}.fastq.gz",
        lane_number, UNASSIGNED_TOKEN, lane_number, mate
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::SampleBarcodeMap;
    use flate2::read::MultiGzDecoder;
    use std::io::Read;

    fn test_catalog(dual: bool) -> BarcodeCatalog {
        let mut samples = SampleBarcodeMap::new();
        if dual {
            samples.insert("AAAA_TTTT".to_string(), "Sample1".to_string());
        } else {
            samples.insert("AAAA".to_string(), "Sample1".to_string());
            samples.insert("CCCC".to_string(), "Sample2".to_string());
        }
        BarcodeCatalog {
            samples,
            dual_indexed: dual,
            lane_id: 5,
        }
    }

    fn record(id: &str) -> FastqRecord {
        FastqRecord {
            id: id.to_string(),
            seq: "ACGT".to_string(),
            sep: "+".to_string(),
            qual: "FFFF".to_string(),
        }
    }

    fn read_gz(path: &Path) -> String {
        let mut out = String::new();
        MultiGzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn filenames_encode_lane_key_and_sample() {
        assert_eq!(
            sample_filename(5, "AAAA", "Sample1", 1, "R1"),
            "lane5_AAAA_Sample1_L001_R1.fastq.gz"
        );
        assert_eq!(
            unassigned_filename(1, "I2"),
            "lane1_NoCode_L001_I2.fastq.gz"
        );
    }

    #[test]
    fn opens_all_channels_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let pool =
            OutputChannelPool::open_all(dir.path(), &test_catalog(false), 1, true).unwrap();

        for name in [
            "lane5_AAAA_Sample1_L001_R1.fastq.gz",
            "lane5_AAAA_Sample1_L001_R2.fastq.gz",
            "lane5_CCCC_Sample2_L001_R1.fastq.gz",
            "lane5_CCCC_Sample2_L001_R2.fastq.gz",
            "lane1_NoCode_L001_R1.fastq.gz",
            "lane1_NoCode_L001_R2.fastq.gz",
            "lane1_NoCode_L001_I1.fastq.gz",
        ] {
            assert!(dir.path().join(name).exists(), "missing {}", name);
        }
        //single coded: no I2 sentinel
        assert!(!dir.path().join("lane1_NoCode_L001_I2.fastq.gz").exists());

        pool.close_all().unwrap();
    }

    #[test]
    fn dual_coded_pool_has_i2_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let pool =
            OutputChannelPool::open_all(dir.path(), &test_catalog(true), 1, false).unwrap();
        assert!(dir.path().join("lane1_NoCode_L001_I2.fastq.gz").exists());
        pool.close_all().unwrap();
    }

    #[test]
    fn written_records_survive_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool =
            OutputChannelPool::open_all(dir.path(), &test_catalog(false), 1, false).unwrap();

        pool.write_assigned("AAAA", &record("@r1 AAAA"), None).unwrap();
        pool.write_assigned("AAAA", &record("@r2 AAAA"), None).unwrap();
        pool.write_unassigned(&record("@r3"), None, &record("@i3"), None)
            .unwrap();
        pool.close_all().unwrap();

        let sample = read_gz(&dir.path().join("lane5_AAAA_Sample1_L001_R1.fastq.gz"));
        assert_eq!(sample, "@r1 AAAA\nACGT\n+\nFFFF\n@r2 AAAA\nACGT\n+\nFFFF\n");

        let unassigned = read_gz(&dir.path().join("lane1_NoCode_L001_R1.fastq.gz"));
        assert!(unassigned.starts_with("@r3\n"));
        let index = read_gz(&dir.path().join("lane1_NoCode_L001_I1.fastq.gz"));
        assert!(index.starts_with("@i3\n"));
    }

    #[test]
    fn dropping_an_open_pool_still_writes_valid_gzip() {
        //abort path: the pool goes out of scope without close_all
        let dir = tempfile::tempdir().unwrap();
        {
            let mut pool =
                OutputChannelPool::open_all(dir.path(), &test_catalog(false), 1, false).unwrap();
            pool.write_assigned("AAAA", &record("@r1 AAAA"), None).unwrap();
        }
        let sample = read_gz(&dir.path().join("lane5_AAAA_Sample1_L001_R1.fastq.gz"));
        assert_eq!(sample, "@r1 AAAA\nACGT\n+\nFFFF\n");
    }

    #[test]
    fn record_counts_track_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool =
            OutputChannelPool::open_all(dir.path(), &test_catalog(false), 1, false).unwrap();
        pool.write_assigned("AAAA", &record("@r1"), None).unwrap();
        pool.write_unassigned(&record("@r2"), None, &record("@i2"), None)
            .unwrap();

        let counts: HashMap<String, u64> = pool.record_counts().into_iter().collect();
        assert_eq!(counts["lane5_AAAA_Sample1_L001_R1.fastq.gz"], 1);
        assert_eq!(counts["lane5_CCCC_Sample2_L001_R1.fastq.gz"], 0);
        assert_eq!(counts["lane1_NoCode_L001_R1.fastq.gz"], 1);
        assert_eq!(counts["lane1_NoCode_L001_I1.fastq.gz"], 1);
        pool.close_all().unwrap();
    }

    #[test]
    fn unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool =
            OutputChannelPool::open_all(dir.path(), &test_catalog(false), 1, false).unwrap();
        let err = pool.write_assigned("GGGG", &record("@r1"), None).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        pool.close_all().unwrap();
    }
}
