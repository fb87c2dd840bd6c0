//! Recipient lists stored as CSV with a header row.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::domain::Recipient;
use crate::errors::Error;

/// Where a campaign reads its recipients from.
pub trait RecipientSource {
    /// Reads the whole list, in source order.
    fn read(&self) -> Result<Vec<Recipient>, Error>;
}

impl RecipientSource for Vec<Recipient> {
    fn read(&self) -> Result<Vec<Recipient>, Error> {
        Ok(self.clone())
    }
}

/// A CSV file on disk.
pub struct CsvRecipientSource {
    path: PathBuf,
}

impl CsvRecipientSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecipientSource for CsvRecipientSource {
    fn read(&self) -> Result<Vec<Recipient>, Error> {
        Ok(read_table_from_path(&self.path)?.rows)
    }
}

/// Rows of a CSV file together with its header order.
#[derive(Debug, Default)]
pub struct RecipientTable {
    pub headers: Vec<String>,
    pub rows: Vec<Recipient>,
}

/// Parses CSV data. Short rows simply lack the trailing fields.
pub fn read_table<R: io::Read>(reader: R) -> Result<RecipientTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| (header.clone(), value.to_owned()))
                .collect(),
        );
    }

    Ok(RecipientTable { headers, rows })
}

pub fn read_table_from_path(path: &Path) -> Result<RecipientTable, Error> {
    let source_error = |source: csv::Error| Error::SourceRead {
        path: path.display().to_string(),
        source,
    };
    let file = File::open(path).map_err(|e| source_error(e.into()))?;
    read_table(file).map_err(source_error)
}

/// Writes `rows` as CSV using `headers` for the column order.
pub fn write_table<W: io::Write>(
    writer: W,
    headers: &[String],
    rows: &[Recipient],
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(headers.iter().map(|header| row.get(header).unwrap_or_default()))?;
    }
    writer.flush()?;
    Ok(())
}
