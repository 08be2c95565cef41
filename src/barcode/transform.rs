use crate::runtime::Error;

///////////////////////////////
/// Result of transforming one raw index sequence: the barcode portion
/// and, in UMI mode, the tail that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedIndex {
    pub barcode: String,
    pub umi: Option<String>,
}

///////////////////////////////
/// Settings for one index stream. The order of operations is a contract:
/// trim, then reverse-complement, then UMI split or length truncation.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexTransform {
    /// Drop this many bases from the start of the raw sequence
    pub trim: usize,
    pub revcomp: bool,
    /// A UMI follows the barcode; only meaningful with barcode_length > 0
    pub umi: bool,
    /// Expected barcode length, 0 meaning the full index read
    pub barcode_length: usize,
}

impl IndexTransform {
    pub fn apply(&self, raw: &str) -> Result<TransformedIndex, Error> {
        let mut seq = raw.get(self.trim..).unwrap_or("").to_string();

        if self.revcomp {
            seq = reverse_complement(&seq)?;
        }

        if self.umi && self.barcode_length > 0 {
            let cut = self.barcode_length.min(seq.len());
            let umi = seq.split_off(cut);
            return Ok(TransformedIndex {
                barcode: seq,
                umi: Some(umi),
            });
        }

        if self.barcode_length > 0 {
            seq.truncate(self.barcode_length);
        }

        Ok(TransformedIndex {
            barcode: seq,
            umi: None,
        })
    }
}

/// Reverse complement a DNA sequence over {A,C,G,T,N}, case insensitive.
/// Any other character is fatal.
pub fn reverse_complement(seq: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(seq.len());
    for base in seq.bytes().rev() {
        let complement = match base.to_ascii_uppercase() {
            b'A' => 'T',
            b'T' => 'A',
            b'C' => 'G',
            b'G' => 'C',
            b'N' => 'N',
            other => return Err(Error::malformed_sequence(other)),
        };
        out.push(complement);
    }
    Ok(out)
}
