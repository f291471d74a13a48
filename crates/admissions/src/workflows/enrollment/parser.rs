use std::collections::BTreeMap;
use std::io::Read;

use serde::Serialize;

/// One data row of a registrar upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRow {
    /// 1-based line number within the uploaded file (the header is line 1).
    pub line: u64,
    pub values: BTreeMap<String, String>,
}

impl RawRow {
    pub fn value(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrarSheet {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Keys cells by header; rows whose cells are all blank yield `None`.
pub(crate) fn assemble_row<I, S>(headers: &[String], line: u64, cells: I) -> Option<RawRow>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let cells: Vec<String> = cells.into_iter().map(Into::into).collect();
    if cells.iter().all(|cell| cell.trim().is_empty()) {
        return None;
    }

    let mut values = BTreeMap::new();
    for (position, header) in headers.iter().enumerate() {
        if header.is_empty() {
            continue;
        }
        let cell = cells.get(position).cloned().unwrap_or_default();
        values.insert(header.clone(), cell);
    }
    Some(RawRow { line, values })
}

pub(crate) fn parse_sheet<R: Read>(reader: R) -> Result<RegistrarSheet, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map(|position| position.line())
            .unwrap_or(index as u64 + 2);
        rows.extend(assemble_row(&headers, line, record.iter()));
    }

    Ok(RegistrarSheet { headers, rows })
}
