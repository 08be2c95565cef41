use log::{debug, info};

use crate::barcode::catalog::BARCODE_KEY_SEPARATOR;
use crate::barcode::{BarcodeCatalog, IndexTransform};
use crate::fileformat::{FastqRecord, InputReader};
use crate::runtime::Error;

use super::discover::InputStreamSet;

/// Joins the UMI onto the read identifier, after the barcode key
pub const UMI_SEPARATOR: char = ':';

const PROGRESS_INTERVAL: u64 = 100_000;

///////////////////////////////
/// Open readers over the synchronized input files
pub struct DemuxStreams {
    pub r1: InputReader,
    pub r2: Option<InputReader>,
    pub i1: InputReader,
    pub i2: Option<InputReader>,
}

impl DemuxStreams {
    pub fn open(inputs: &InputStreamSet) -> Result<DemuxStreams, Error> {
        Ok(DemuxStreams {
            r1: InputReader::open(&inputs.r1)?,
            r2: inputs.r2.as_deref().map(InputReader::open).transpose()?,
            i1: InputReader::open(&inputs.i1)?,
            i2: inputs.i2.as_deref().map(InputReader::open).transpose()?,
        })
    }
}

/// How each index stream is transformed before the lookup. Only index 1
/// supports trimming and UMI extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemuxConfig {
    pub i1: IndexTransform,
    pub i2: IndexTransform,
}

/// Mutated once per read group inside the loop; assigned + unassigned
/// always equals the number of groups consumed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub assigned: u64,
    pub unassigned: u64,
}

impl RunCounters {
    pub fn total(&self) -> u64 {
        self.assigned + self.unassigned
    }
}

///////////////////////////////
/// The main loop. Reads one record from every open stream per iteration,
/// transforms the index sequence(s) into a barcode key, and routes the
/// read (pair) to its channel. Any failure is fatal; the caller closes
/// the channels and the counters reflect what was processed so far.
pub fn run(
    streams: &mut DemuxStreams,
    catalog: &BarcodeCatalog,
    pool: &mut super::OutputChannelPool,
    config: &DemuxConfig,
    counters: &mut RunCounters,
) -> Result<(), Error> {
    let mut ordinal: u64 = 0;

    loop {
        //End of the primary stream ends the run
        let rec_r1 = match streams.r1.next_record()? {
            Some(rec) => rec,
            None => break,
        };
        ordinal += 1;

        let rec_r2 = next_secondary(streams.r2.as_mut(), ordinal)?;
        let rec_i1 = match streams.i1.next_record()? {
            Some(rec) => rec,
            None => {
                return Err(Error::synchronization(
                    ordinal,
                    format!("{} ended before the primary stream", streams.i1.label()),
                ))
            }
        };
        let rec_i2 = next_secondary(streams.i2.as_mut(), ordinal)?;

        if rec_r1.short_id() != rec_i1.short_id() {
            return Err(Error::synchronization(
                ordinal,
                format!(
                    "primary read ID '{}' does not match index read ID '{}'",
                    rec_r1.short_id(),
                    rec_i1.short_id()
                ),
            ));
        }

        let index1 = config.i1.apply(&rec_i1.seq)?;
        let key = match &rec_i2 {
            Some(rec) => {
                let index2 = config.i2.apply(&rec.seq)?;
                format!(
                    "{}{}{}",
                    index1.barcode, BARCODE_KEY_SEPARATOR, index2.barcode
                )
            }
            None => index1.barcode,
        };

        if catalog.samples.contains_key(&key) {
            let mut rec_r1 = rec_r1;
            tag_read(&mut rec_r1, &key, index1.umi.as_deref());
            let rec_r2 = rec_r2.map(|mut rec| {
                tag_read(&mut rec, &key, index1.umi.as_deref());
                rec
            });
            pool.write_assigned(&key, &rec_r1, rec_r2.as_ref())?;
            counters.assigned += 1;
        } else {
            pool.write_unassigned(&rec_r1, rec_r2.as_ref(), &rec_i1, rec_i2.as_ref())?;
            counters.unassigned += 1;
        }

        if ordinal % PROGRESS_INTERVAL == 0 {
            debug!("Processed {} read groups", ordinal);
        }
    }

    info!("Processed {} read groups in total", ordinal);
    Ok(())
}

/// Read the matching record from a secondary stream. A secondary stream
/// ending before the primary one means the inputs are out of step.
fn next_secondary(
    reader: Option<&mut InputReader>,
    ordinal: u64,
) -> Result<Option<FastqRecord>, Error> {
    let reader = match reader {
        Some(reader) => reader,
        None => return Ok(None),
    };
    match reader.next_record()? {
        Some(rec) => Ok(Some(rec)),
        None => Err(Error::synchronization(
            ordinal,
            format!("{} ended before the primary stream", reader.label()),
        )),
    }
}

/// Append the barcode key, and in UMI mode the UMI, to a read identifier
fn tag_read(record: &mut FastqRecord, key: &str, umi: Option<&str>) {
    record.id.push(' ');
    record.id.push_str(key);
    if let Some(umi) = umi {
        record.id.push(UMI_SEPARATOR);
        record.id.push_str(umi);
    }
}
