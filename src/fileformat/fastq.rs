use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use crate::runtime::Error;

///////////////////////////////
/// One FASTQ read: the four raw lines with their line endings stripped.
/// The separator line is kept verbatim as some producers put the read
/// name there again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqRecord {
    pub id: String,
    pub seq: String,
    pub sep: String,
    pub qual: String,
}

impl FastqRecord {
    /// Identifier up to the first space. Used to check that parallel
    /// streams are still in step.
    pub fn short_id(&self) -> &str {
        self.id.split(' ').next().unwrap_or_default()
    }

    /// Write the record back out as four lines. Returns the number of
    /// bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<usize> {
        let mut n = 0;
        for line in [&self.id, &self.seq, &self.sep, &self.qual] {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            n += line.len() + 1;
        }
        Ok(n)
    }
}

/// Reader over a possibly compressed FASTQ file
pub type InputReader = FastqReader<BufReader<Box<dyn Read>>>;

///////////////////////////////
/// Lazy iterator over the records of one FASTQ stream. Once the stream
/// is exhausted the reader is done; re-reading means reopening the file.
pub struct FastqReader<R: BufRead> {
    reader: R,
    label: String,
}

impl InputReader {
    /// Open a FASTQ file, decompressing transparently if needed
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)
            .map_err(|e| Error::channel_io(path.display().to_string(), e))?;
        let (reader, compression) = niffler::get_reader(Box::new(file))
            .map_err(|e| Error::parse_error(path.display().to_string(), Some(e.to_string())))?;
        debug!(
            "Opened file {} with compression {:?}",
            path.display(),
            compression
        );
        Ok(FastqReader {
            reader: BufReader::new(reader),
            label: path.display().to_string(),
        })
    }
}

impl<R: BufRead> FastqReader<R> {
    pub fn new<L: Into<String>>(reader: R, label: L) -> FastqReader<R> {
        FastqReader {
            reader,
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Read the next record. A clean end of input, or a blank identifier
    /// line, yields None. An identifier without the remaining three lines
    /// is a parse error.
    pub fn next_record(&mut self) -> Result<Option<FastqRecord>, Error> {
        let id = match self.read_line()? {
            Some(line) => line,
            None => return Ok(None),
        };
        if id.is_empty() {
            return Ok(None);
        }
        let seq = self.require_line()?;
        let sep = self.require_line()?;
        let qual = self.require_line()?;
        Ok(Some(FastqRecord { id, seq, sep, qual }))
    }

    fn read_line(&mut self) -> Result<Option<String>, Error> {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .map_err(|e| Error::channel_io(self.label.clone(), e))?;
        if n == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    fn require_line(&mut self) -> Result<String, Error> {
        self.read_line()?
            .ok_or_else(|| Error::parse_error(self.label.clone(), Some("truncated FASTQ record")))
    }
}

impl<R: BufRead> Iterator for FastqReader<R> {
    type Item = Result<FastqRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
