use std::io::Cursor;

use calamine::{Data, Reader};

use super::normalizer::format_date_key;
use super::parser::{assemble_row, RegistrarSheet};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

/// Excel uploads are xlsx (zip container) or legacy xls (OLE compound file).
pub(crate) fn is_workbook(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC)
}

/// Reads the first worksheet; a workbook without sheets yields an empty sheet.
pub(crate) fn parse_workbook(bytes: &[u8]) -> Result<RegistrarSheet, calamine::Error> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(RegistrarSheet {
            headers: Vec::new(),
            rows: Vec::new(),
        });
    };
    let range = range?;

    let first_row = range.start().map(|(row, _)| u64::from(row)).unwrap_or(0);
    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|cells| {
            cells
                .iter()
                .map(|cell| cell_text(cell).trim_start_matches('\u{feff}').to_string())
                .collect()
        })
        .unwrap_or_default();

    let rows = rows
        .enumerate()
        .filter_map(|(index, cells)| {
            let line = first_row + index as u64 + 2;
            assemble_row(&headers, line, cells.iter().map(cell_text))
        })
        .collect();

    Ok(RegistrarSheet { headers, rows })
}

/// Typed date cells become `YYYY-MM-DD` so they key the same way as CSV dates.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(value) => value.trim().to_string(),
        Data::DateTime(value) => value
            .as_datetime()
            .map(|moment| format_date_key(moment.date()))
            .unwrap_or_else(|| cell.to_string()),
        Data::DateTimeIso(value) | Data::DurationIso(value) => value.trim().to_string(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", *value as i64)
        }
        other => other.to_string(),
    }
}
