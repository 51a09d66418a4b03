use csv::{ReaderBuilder, StringRecord, Trim};

use crate::database::record::{check_field_name, FieldValue, Record, RecordError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    #[error("CSV header error: {0}")]
    Header(#[from] RecordError),
}

/// A fully buffered CSV upload: the header row plus every data row.
///
/// Cells are kept as text. Rows may be ragged: missing trailing cells leave
/// the field out of the record and surplus cells are ignored.
#[derive(Debug, Clone)]
pub struct CsvUpload {
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl CsvUpload {
    pub fn from_bytes(data: &[u8]) -> Result<Self, CsvError> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::Headers)
            .from_reader(data);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        // Blank headers are skipped, every other one must be a usable field name
        for header in headers.iter().filter(|h| !h.is_empty()) {
            check_field_name(header)?;
        }
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    /// Non-blank header names, in file order
    pub fn labels(&self) -> Vec<&str> {
        self.headers
            .iter()
            .map(String::as_str)
            .filter(|h| !h.is_empty())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row `index` as a record with an assigned id
    pub fn row_record(&self, index: usize) -> Option<Record> {
        let row = self.rows.get(index)?;
        let record: Record = self
            .headers
            .iter()
            .zip(row.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, cell)| (header.as_str(), FieldValue::Text(cell.to_string())))
            .collect();
        Some(record.with_assigned_id())
    }

    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.rows.len()).filter_map(move |i| self.row_record(i))
    }
}
