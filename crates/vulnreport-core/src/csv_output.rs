use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};
use crate::report::{ReportRow, HEADER};

/// Write the header row plus every report row to `path`, comma-delimited
/// UTF-8. Never overwrites: the file is opened with `create_new`, so a
/// pre-existing file fails without being touched.
pub fn write_report(path: &Path, rows: &[ReportRow]) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                Error::OutputExists(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(HEADER)?;
    for row in rows {
        writer.write_record(row.as_record())?;
    }
    writer.flush()?;
    Ok(())
}
