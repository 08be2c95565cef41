use lazy_static::lazy_static;
use log::{debug, info};
use mysql::prelude::Queryable;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

use crate::runtime::Error;

/// Barcode key -> sanitized sample name
pub type SampleBarcodeMap = HashMap<String, String>;

/// Joins the two index sequences of a dual coded key
pub const BARCODE_KEY_SEPARATOR: char = '_';

//Same schema Sierra uses: 5' barcode, 3' barcode, sample name, lane id
const LIMS_QUERY: &str = "SELECT barcode.`5_prime_barcode`, barcode.`3_prime_barcode`, \
     barcode.name, lane.id \
     FROM run, flowcell, lane, barcode \
     WHERE run.run_folder_name = ? AND run.flowcell_id = flowcell.id \
     AND run.flowcell_id = lane.flowcell_id AND lane.lane_number = ? \
     AND lane.sample_id = barcode.sample_id";

lazy_static! {
    static ref SAMPLE_NAME_DISALLOWED: Regex = Regex::new(r"[^a-zA-Z0-9.\-_]+_?").unwrap();
}

///////////////////////////////
/// The run's expected barcode -> sample mapping, loaded once before any
/// stream is opened and read-only afterwards.
#[derive(Debug, Clone)]
pub struct BarcodeCatalog {
    pub samples: SampleBarcodeMap,
    pub dual_indexed: bool,
    /// Lane identity used in output filenames
    pub lane_id: u64,
}

impl BarcodeCatalog {
    /// Fetch the expected barcodes from the LIMS database
    pub fn from_lims(db_url: &str, run_folder: &str, lane_number: u64) -> Result<BarcodeCatalog, Error> {
        let opts = mysql::Opts::from_url(db_url)
            .map_err(|e| Error::resource_lookup(db_url, Some(e.to_string())))?;
        let mut conn = mysql::Conn::new(opts)
            .map_err(|e| Error::resource_lookup(db_url, Some(e.to_string())))?;

        let rows: Vec<(String, String, String, u64)> = conn
            .exec(LIMS_QUERY, (run_folder, lane_number))
            .map_err(|e| Error::resource_lookup(db_url, Some(e.to_string())))?;

        if rows.is_empty() {
            return Err(Error::resource_lookup(
                db_url,
                Some(format!(
                    "no barcodes found for run '{}' lane {}",
                    run_folder, lane_number
                )),
            ));
        }
        info!("Found {} expected barcodes in the LIMS", rows.len());

        BarcodeCatalog::build(rows)
    }

    /// Read the expected barcodes from a local tab-delimited sheet with a
    /// header line and columns {5' barcode, 3' barcode, sample name, lane}
    pub fn from_sheet(path: &Path) -> Result<BarcodeCatalog, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(path)
            .map_err(|e| Error::config(format!("cannot read sample sheet {}: {}", path.display(), e)))?;

        let headers = reader
            .headers()
            .map_err(|e| Error::config(format!("sample sheet {}: {}", path.display(), e)))?;
        if headers.len() != 4 {
            return Err(Error::config(format!(
                "sample sheet {} has a malformed header: {} columns, expected 4",
                path.display(),
                headers.len()
            )));
        }

        let mut entries = Vec::new();
        for row in reader.records() {
            let row = row
                .map_err(|e| Error::config(format!("sample sheet {}: {}", path.display(), e)))?;
            let lane: u64 = row[3].trim().parse().map_err(|_| {
                Error::config(format!(
                    "sample sheet {}: bad lane number '{}'",
                    path.display(),
                    &row[3]
                ))
            })?;
            entries.push((
                row[0].trim().to_string(),
                row[1].trim().to_string(),
                row[2].trim().to_string(),
                lane,
            ));
        }

        if entries.is_empty() {
            return Err(Error::config(format!(
                "sample sheet {} contains no samples",
                path.display()
            )));
        }
        info!("Found {} expected barcodes in the sample sheet", entries.len());

        BarcodeCatalog::build(entries)
    }

    /// Build the map from (5' barcode, 3' barcode, sample name, lane id)
    /// entries. Dual indexing is decided once, from the first entry, and
    /// applied to the whole run.
    fn build(entries: Vec<(String, String, String, u64)>) -> Result<BarcodeCatalog, Error> {
        let first = entries
            .first()
            .ok_or_else(|| Error::config("empty barcode catalog"))?;
        let dual_indexed = !first.1.trim().is_empty();
        let lane_id = first.3;
        if dual_indexed {
            debug!("First entry has a 3' barcode; treating the run as dual coded");
        } else {
            debug!("First entry has no 3' barcode; treating the run as single coded");
        }

        let mut samples = SampleBarcodeMap::new();
        for (bc1, bc2, name, _lane) in entries {
            let key = if dual_indexed {
                format!("{}{}{}", bc1.trim(), BARCODE_KEY_SEPARATOR, bc2.trim())
            } else {
                bc1.trim().to_string()
            };
            let sample = clean_sample_name(name.trim());
            if samples.insert(key.clone(), sample).is_some() {
                return Err(Error::config(format!(
                    "duplicate barcode key '{}' in sample catalog",
                    key
                )));
            }
        }

        Ok(BarcodeCatalog {
            samples,
            dual_indexed,
            lane_id,
        })
    }
}

/// Collapse any run of characters outside [A-Za-z0-9.-_] (and one
/// underscore directly after it) to a single underscore
pub fn clean_sample_name(name: &str) -> String {
    SAMPLE_NAME_DISALLOWED.replace_all(name, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sample_names_are_sanitized() {
        assert_eq!(clean_sample_name("Sample 1"), "Sample_1");
        assert_eq!(clean_sample_name("a!!b"), "a_b");
        assert_eq!(clean_sample_name("weird _name"), "weird_name");
        assert_eq!(clean_sample_name("ok.Sample-2_x"), "ok.Sample-2_x");
        assert_eq!(clean_sample_name("trailing?"), "trailing_");
    }

    fn write_sheet(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn sheet_single_coded() {
        let sheet = write_sheet(
            "barcode5\tbarcode3\tsample\tlane\n\
             AAAA\t\tSample 1\t7\n\
             CCCC\t\tSample2\t7\n",
        );
        let catalog = BarcodeCatalog::from_sheet(sheet.path()).unwrap();
        assert!(!catalog.dual_indexed);
        assert_eq!(catalog.lane_id, 7);
        assert_eq!(catalog.samples.len(), 2);
        assert_eq!(catalog.samples["AAAA"], "Sample_1");
        assert_eq!(catalog.samples["CCCC"], "Sample2");
    }

    #[test]
    fn sheet_dual_coded() {
        let sheet = write_sheet(
            "barcode5\tbarcode3\tsample\tlane\n\
             AAAA\tTTTT\tSample1\t1\n\
             CCCC\tGGGG\tSample2\t1\n",
        );
        let catalog = BarcodeCatalog::from_sheet(sheet.path()).unwrap();
        assert!(catalog.dual_indexed);
        assert_eq!(catalog.samples["AAAA_TTTT"], "Sample1");
        assert_eq!(catalog.samples["CCCC_GGGG"], "Sample2");
    }

    #[test]
    fn sheet_with_wrong_column_count_is_rejected() {
        let sheet = write_sheet(
            "barcode5\tbarcode3\tsample\tlane\n\
             AAAA\t\tSample1\n",
        );
        let err = BarcodeCatalog::from_sheet(sheet.path()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn sheet_with_bad_lane_is_rejected() {
        let sheet = write_sheet(
            "barcode5\tbarcode3\tsample\tlane\n\
             AAAA\t\tSample1\tfirst\n",
        );
        let err = BarcodeCatalog::from_sheet(sheet.path()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn sheet_with_no_samples_is_rejected() {
        let sheet = write_sheet("barcode5\tbarcode3\tsample\tlane\n");
        let err = BarcodeCatalog::from_sheet(sheet.path()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let sheet = write_sheet(
            "barcode5\tbarcode3\tsample\tlane\n\
             AAAA\t\tSample1\t1\n\
             AAAA\t\tSample2\t1\n",
        );
        let err = BarcodeCatalog::from_sheet(sheet.path()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn missing_sheet_is_rejected() {
        let err = BarcodeCatalog::from_sheet(Path::new("/no/such/sheet.tsv")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
