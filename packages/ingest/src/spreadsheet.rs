//! Reading tabular files into raw rows.
//!
//! The first row is the header. Cells keep their native type so the
//! normalizer can tell a date serial from date text.

use std::io::Cursor;

use calamine::{Data, Reader as _, open_workbook_auto_from_rs};
use police_perf_normalize::{RawRow, RawValue};

use crate::IngestError;

fn cell_value(cell: &Data) -> RawValue {
    match cell {
        Data::Empty | Data::Error(_) => RawValue::Empty,
        Data::Bool(b) => RawValue::Bool(*b),
        #[allow(clippy::cast_precision_loss)]
        Data::Int(i) => RawValue::Number(*i as f64),
        Data::Float(f) => RawValue::Number(*f),
        Data::DateTime(d) => RawValue::Number(d.as_f64()),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            RawValue::Text(s.trim().to_string())
        }
    }
}

fn header_text(cell: &Data) -> String {
    cell_value(cell).as_text().unwrap_or_default().trim().to_string()
}

/// Reads the first sheet of an `.xlsx`, `.xls`, `.xlsm`, or `.ods` file.
///
/// # Errors
///
/// Returns [`IngestError::Spreadsheet`] if the workbook cannot be parsed
/// or has no sheets.
pub fn read_workbook(bytes: Vec<u8>) -> Result<Vec<RawRow>, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Malformed {
            message: "Workbook has no sheets".to_string(),
        })??;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row.iter().map(header_text).collect();

    let parsed: Vec<RawRow> = rows
        .map(|cells| {
            headers
                .iter()
                .zip(cells)
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, cell)| (header.clone(), cell_value(cell)))
                .collect::<RawRow>()
        })
        .filter(|row| !row.is_blank())
        .collect();

    log::info!("Parsed {} rows from workbook", parsed.len());
    Ok(parsed)
}

/// Reads a CSV file with a header row.
///
/// # Errors
///
/// Returns [`IngestError::Csv`] if the file cannot be parsed.
pub fn read_csv(bytes: &[u8]) -> Result<Vec<RawRow>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_owned())
        .collect();

    let mut parsed = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: RawRow = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(i, header)| {
                let value = record.get(i).unwrap_or("");
                let cell = if value.is_empty() {
                    RawValue::Empty
                } else {
                    RawValue::Text(value.to_owned())
                };
                (header.clone(), cell)
            })
            .collect();
        if !row.is_blank() {
            parsed.push(row);
        }
    }

    log::info!("Parsed {} rows from CSV", parsed.len());
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_are_keyed_by_header() {
        let csv = b"\xef\xbb\xbfDistrict,Category,Cases Registered,Cases Solved,Date\n\
                    Ganjam,NBW,120,80,2023-05-15\n\
                    ,,,,\n\
                    Puri,Others,4,1,2023-05-16\n";
        let rows = read_csv(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].get("District"),
            Some(&RawValue::Text("Ganjam".to_string()))
        );
        assert_eq!(
            rows[1].get("Cases Registered"),
            Some(&RawValue::Text("4".to_string()))
        );
    }

    #[test]
    fn short_csv_records_leave_missing_cells_empty() {
        let rows = read_csv(b"District,Value\nCuttack\n").unwrap();
        assert_eq!(rows[0].get("Value"), Some(&RawValue::Empty));
    }

    #[test]
    fn workbook_cells_keep_native_types() {
        assert_eq!(cell_value(&Data::Int(7)), RawValue::Number(7.0));
        assert_eq!(cell_value(&Data::Float(45_061.0)), RawValue::Number(45_061.0));
        assert_eq!(
            cell_value(&Data::String(" Ganjam ".to_string())),
            RawValue::Text("Ganjam".to_string())
        );
        assert_eq!(cell_value(&Data::Empty), RawValue::Empty);
    }

    #[test]
    fn garbage_is_not_a_workbook() {
        assert!(read_workbook(b"not a spreadsheet".to_vec()).is_err());
    }
}
