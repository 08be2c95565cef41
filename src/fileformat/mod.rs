pub mod fastq;

pub use fastq::{FastqReader, FastqRecord, InputReader};
