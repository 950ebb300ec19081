//! Excel workbook export.

use police_perf_record_models::PerformanceRecord;
use rust_xlsxwriter::{Format, Workbook};

use crate::{ExportError, ExportRow, HEADERS};

/// Sheet name of the exported workbook.
pub const SHEET_NAME: &str = "Performance Records";

/// Writes records to an in-memory `.xlsx` workbook. Counts are numeric
/// cells; dates are `YYYY-MM-DD` text.
///
/// # Errors
///
/// Returns [`ExportError::Xlsx`] if the workbook cannot be built.
#[allow(clippy::cast_precision_loss)]
pub fn to_xlsx(records: &[PerformanceRecord]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, header) in (0u16..).zip(HEADERS) {
        sheet.write_string_with_format(0, col, header, &bold)?;
    }

    for (row, record) in (1u32..).zip(records) {
        let line = ExportRow::from(record);
        sheet.write_string(row, 0, &line.district)?;
        sheet.write_string(row, 1, &line.category)?;
        sheet.write_number(row, 2, line.cases_registered as f64)?;
        sheet.write_number(row, 3, line.cases_solved as f64)?;
        sheet.write_string(row, 4, &line.date)?;
    }

    sheet.set_column_width(0, 14)?;
    sheet.set_column_width(1, 24)?;
    sheet.set_column_width(2, 16)?;
    sheet.set_column_width(3, 14)?;
    sheet.set_column_width(4, 12)?;

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample;

    #[test]
    fn workbook_is_a_zip_container() {
        let bytes = to_xlsx(&sample(3)).unwrap();
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn empty_export_still_has_headers() {
        assert!(!to_xlsx(&[]).unwrap().is_empty());
    }
}
