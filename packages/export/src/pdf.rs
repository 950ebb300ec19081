//! Paginated PDF table.
//!
//! A4 portrait, Helvetica, one line per record. The first page carries the
//! title and generation time; every page repeats the header row.

use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use police_perf_record_models::PerformanceRecord;

use crate::{ExportError, ExportRow, HEADERS};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 40;
const LINE_HEIGHT: i64 = 16;
const FONT_SIZE: i64 = 10;
const TITLE_SIZE: i64 = 16;
const TITLE_BLOCK: i64 = 48;
const COLUMNS: [i64; 5] = [40, 130, 300, 400, 490];

/// Title line on the first page.
pub const TITLE: &str = "Police Performance Records";

/// Rows that fit below the header on a page.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub const fn rows_per_page(first_page: bool) -> usize {
    let mut usable = PAGE_HEIGHT - 2 * MARGIN - LINE_HEIGHT;
    if first_page {
        usable -= TITLE_BLOCK;
    }
    (usable / LINE_HEIGHT) as usize
}

fn pdf_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf {
        message: e.to_string(),
    }
}

fn text_at(ops: &mut Vec<Operation>, font: &str, size: i64, x: i64, y: i64, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.as_bytes().to_vec()), Object::Integer(size)],
    ));
    ops.push(Operation::new(
        "Td",
        vec![Object::Integer(x), Object::Integer(y)],
    ));
    ops.push(Operation::new("Tj", vec![Object::string_literal(text)]));
    ops.push(Operation::new("ET", vec![]));
}

fn row_at(ops: &mut Vec<Operation>, font: &str, y: i64, cells: &[String]) {
    for (x, cell) in COLUMNS.iter().zip(cells) {
        text_at(ops, font, FONT_SIZE, *x, y, cell);
    }
}

/// Splits rows into pages.
fn paginate(rows: &[ExportRow]) -> Vec<&[ExportRow]> {
    let first = rows_per_page(true).min(rows.len());
    let (head, mut rest) = rows.split_at(first);
    let mut pages = vec![head];
    while !rest.is_empty() {
        let take = rows_per_page(false).min(rest.len());
        let (page, tail) = rest.split_at(take);
        pages.push(page);
        rest = tail;
    }
    pages
}

fn page_content(
    rows: &[ExportRow],
    first_page: bool,
    generated_at: DateTime<Utc>,
    total: usize,
) -> Vec<Operation> {
    let header: Vec<String> = HEADERS.iter().map(ToString::to_string).collect();
    let mut ops = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    if first_page {
        text_at(&mut ops, "F2", TITLE_SIZE, MARGIN, y - TITLE_SIZE, TITLE);
        text_at(
            &mut ops,
            "F1",
            FONT_SIZE,
            MARGIN,
            y - TITLE_SIZE - LINE_HEIGHT,
            &format!(
                "Generated {} - {total} records",
                generated_at.format("%Y-%m-%d %H:%M UTC")
            ),
        );
        y -= TITLE_BLOCK;
    }

    y -= LINE_HEIGHT;
    row_at(&mut ops, "F2", y, &header);

    for row in rows {
        y -= LINE_HEIGHT;
        row_at(&mut ops, "F1", y, &row.cells());
    }

    ops
}

/// Renders records as a PDF table.
///
/// # Errors
///
/// Returns [`ExportError::Pdf`] if the document cannot be encoded.
pub fn to_pdf(
    records: &[PerformanceRecord],
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, ExportError> {
    let rows: Vec<ExportRow> = records.iter().map(ExportRow::from).collect();

    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids = Vec::new();
    for (index, page_rows) in paginate(&rows).into_iter().enumerate() {
        let content = Content {
            operations: page_content(page_rows, index == 0, generated_at, rows.len()),
        };
        let stream = Stream::new(dictionary! {}, content.encode().map_err(pdf_error)?);
        let content_id = doc.add_object(stream);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = i64::try_from(kids.len()).map_err(pdf_error)?;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(count),
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(pdf_error)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;
    use crate::test_support::sample;

    #[test]
    fn small_export_fits_on_one_page() {
        let rows: Vec<ExportRow> = sample(5).iter().map(ExportRow::from).collect();
        assert_eq!(paginate(&rows).len(), 1);
    }

    #[test]
    fn long_export_is_paginated() {
        let count = rows_per_page(true) + rows_per_page(false) + 1;
        let rows: Vec<ExportRow> = sample(count).iter().map(ExportRow::from).collect();
        let pages = paginate(&rows);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages.iter().map(|p| p.len()).sum::<usize>(), count);
    }

    #[test]
    fn renders_pdf_header() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bytes = to_pdf(&sample(80), at).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
    }

    #[test]
    fn empty_export_has_one_page() {
        assert_eq!(paginate(&[]).len(), 1);
    }
}
