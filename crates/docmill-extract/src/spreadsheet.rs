//! XLSX extractor.
//!
//! The first row of each sheet is its header. Every data row with at least
//! one non-blank cell becomes a [`SheetRow`]; rows carry every column,
//! blanks included. No images and no summarization.

use async_trait::async_trait;
use calamine::{Data, ExcelDateTime, Reader, Xlsx};
use docmill_core::{
    total_elapsed, DocumentContent, DocumentExtractor, DocumentMetadata, DocumentRecord,
    ExtractError, FileKind, SheetRow,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use crate::pdf::file_name;

const OVERALL_SUMMARY: &str = "Spreadsheet data extracted successfully.";

/// Extractor for XLSX workbooks.
pub struct SpreadsheetExtractor;

impl SpreadsheetExtractor {
    /// Create a new spreadsheet extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for SpreadsheetExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentExtractor for SpreadsheetExtractor {
    fn kind(&self) -> FileKind {
        FileKind::Spreadsheet
    }

    async fn extract(&self, path: &Path) -> Result<DocumentRecord, ExtractError> {
        debug!("Extracting spreadsheet: {:?}", path);
        let start = Instant::now();

        let bytes = tokio::fs::read(path).await?;
        let file_size = bytes.len() as u64;

        let (sheet_count, rows) = tokio::task::spawn_blocking(move || read_workbook(bytes))
            .await
            .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))??;

        debug!("{} rows from {} sheets", rows.len(), sheet_count);

        Ok(DocumentRecord {
            metadata: DocumentMetadata {
                file_name: file_name(path),
                file_type: FileKind::Spreadsheet,
                file_size,
                unit_count: sheet_count,
                rows_extracted: Some(rows.len()),
            },
            content: DocumentContent::Rows(rows),
            overall_summary: OVERALL_SUMMARY.to_string(),
            total_time_taken: total_elapsed(start.elapsed()),
        })
    }
}

/// Read every sheet. Returns the sheet count and the non-blank rows.
fn read_workbook(bytes: Vec<u8>) -> Result<(usize, Vec<SheetRow>), ExtractError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::Parse(format!("invalid XLSX workbook: {e}")))?;

    let sheet_names = workbook.sheet_names();
    let mut rows = Vec::new();

    for sheet in &sheet_names {
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| ExtractError::Parse(format!("sheet '{sheet}': {e}")))?;

        let mut sheet_rows = range.rows();
        let Some(header_row) = sheet_rows.next() else {
            continue;
        };
        let header = header_names(header_row);

        for (i, row) in sheet_rows.enumerate() {
            let cells: Vec<String> = (0..header.len())
                .map(|c| row.get(c).map(cell_text).unwrap_or_default())
                .collect();
            if cells.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let row_number = u32::try_from(i + 1)
                .map_err(|_| ExtractError::Failed(format!("sheet '{sheet}' has too many rows")))?;
            rows.push(SheetRow {
                sheet: sheet.clone(),
                row_number,
                row_data: header.iter().cloned().zip(cells).collect::<IndexMap<_, _>>(),
            });
        }
    }

    Ok((sheet_names.len(), rows))
}

const MS_PER_DAY: f64 = 86_400_000.0;

/// Coerce a cell to text. Empty cells become `""`; date-formatted cells
/// become `YYYY-MM-DD HH:MM:SS` and durations `<d> days HH:MM:SS`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::DateTime(dt) if dt.is_duration() => duration_text(dt.as_f64()),
        Data::DateTime(dt) => datetime_text(dt),
        other => other.to_string(),
    }
}

fn datetime_text(dt: &ExcelDateTime) -> String {
    let (year, month, day, hour, min, sec, milli) = dt.to_ymd_hms_milli();
    let mut text = format!("{year:04}-{month:02}-{day:02} {hour:02}:{min:02}:{sec:02}");
    if milli > 0 {
        text.push_str(&format!(".{:06}", u32::from(milli) * 1000));
    }
    text
}

/// Format a duration given in days.
#[allow(clippy::cast_possible_truncation)]
fn duration_text(days: f64) -> String {
    let total = (days * MS_PER_DAY).round() as i64;
    let sign = if total < 0 { "-" } else { "" };
    let ms = total.unsigned_abs();

    let (d, rest) = (ms / 86_400_000, ms % 86_400_000);
    let (h, rest) = (rest / 3_600_000, rest % 3_600_000);
    let (m, rest) = (rest / 60_000, rest % 60_000);
    let (s, milli) = (rest / 1000, rest % 1000);

    let mut text = format!("{sign}{d} days {h:02}:{m:02}:{s:02}");
    if milli > 0 {
        text.push_str(&format!(".{:06}", milli * 1000));
    }
    text
}

/// Column names from the header row: blanks become `Unnamed: <i>` and
/// repeated names get `.1`, `.2`, ... suffixes.
fn header_names(row: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    row.iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell_text(cell).trim().to_string();
            let name = if name.is_empty() {
                format!("Unnamed: {i}")
            } else {
                name
            };

            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{name}.{count}")
            };
            *count += 1;
            unique
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_xlsx;

    #[test]
    fn test_header_names() {
        let row = vec![
            Data::String("Name".to_string()),
            Data::Empty,
            Data::String("Name".to_string()),
            Data::String("Name".to_string()),
            Data::Float(2024.0),
        ];
        assert_eq!(
            header_names(&row),
            vec!["Name", "Unnamed: 1", "Name.1", "Name.2", "2024"]
        );
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("x".to_string())), "x");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::Bool(true)), "true");
    }

    #[test]
    fn test_date_cells_render_as_dates() {
        use calamine::ExcelDateTimeType;

        let date = |v| Data::DateTime(ExcelDateTime::new(v, ExcelDateTimeType::DateTime, false));
        assert_eq!(cell_text(&date(45306.0)), "2024-01-15 00:00:00");
        assert_eq!(cell_text(&date(45306.5)), "2024-01-15 12:00:00");

        let duration =
            Data::DateTime(ExcelDateTime::new(0.0625, ExcelDateTimeType::TimeDelta, false));
        assert_eq!(cell_text(&duration), "0 days 01:30:00");

        let iso = Data::DateTimeIso("2024-01-15T08:30:00".to_string());
        assert_eq!(cell_text(&iso), "2024-01-15T08:30:00");
    }

    #[test]
    fn test_date_formatted_workbook_cells() {
        let bytes = sample_xlsx(&[(
            "Invoices",
            vec![
                vec!["Client", "Due", "Billed"],
                vec!["Acme", "#1:45306", "#0:1200"],
                vec!["Globex", "#2:45306.75", ""],
            ],
        )]);

        let (_, rows) = read_workbook(bytes).unwrap();

        assert_eq!(rows[0].row_data["Due"], "2024-01-15 00:00:00");
        assert_eq!(rows[0].row_data["Billed"], "1200");
        assert_eq!(rows[1].row_data["Due"], "2024-01-15 18:00:00");
    }

    #[test]
    fn test_blank_rows_are_excluded() {
        let bytes = sample_xlsx(&[(
            "Budget",
            vec![
                vec!["Item", "Cost", "Note"],
                vec!["Rent", "1200", ""],
                vec!["", "", ""],
                vec!["", "", "   "],
                vec!["", "", "late fee"],
            ],
        )]);

        let (sheet_count, rows) = read_workbook(bytes).unwrap();

        assert_eq!(sheet_count, 1);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 1);
        assert_eq!(rows[1].row_number, 4);

        // One non-blank cell still keeps every column
        let last = &rows[1].row_data;
        assert_eq!(last.len(), 3);
        assert_eq!(last["Item"], "");
        assert_eq!(last["Cost"], "");
        assert_eq!(last["Note"], "late fee");
        let keys: Vec<&String> = last.keys().collect();
        assert_eq!(keys, vec!["Item", "Cost", "Note"]);
    }

    #[test]
    fn test_row_numbers_restart_per_sheet() {
        let bytes = sample_xlsx(&[
            ("First", vec![vec!["A"], vec!["1"], vec!["2"]]),
            ("Second", vec![vec!["B"], vec!["x"]]),
        ]);

        let (sheet_count, rows) = read_workbook(bytes).unwrap();

        assert_eq!(sheet_count, 2);
        let numbered: Vec<(&str, u32)> = rows
            .iter()
            .map(|r| (r.sheet.as_str(), r.row_number))
            .collect();
        assert_eq!(numbered, vec![("First", 1), ("First", 2), ("Second", 1)]);
    }

    #[test]
    fn test_invalid_workbook() {
        let err = read_workbook(b"not a zip".to_vec()).unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }

    #[tokio::test]
    async fn test_extract_spreadsheet_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("budget.xlsx");
        std::fs::write(
            &path,
            sample_xlsx(&[("Sheet1", vec![vec!["Item", "Cost"], vec!["Rent", "1200"]])]),
        )
        .unwrap();

        let record = SpreadsheetExtractor::new().extract(&path).await.unwrap();

        assert_eq!(record.metadata.file_type, FileKind::Spreadsheet);
        assert_eq!(record.metadata.unit_count, 1);
        assert_eq!(record.metadata.rows_extracted, Some(1));
        assert_eq!(record.overall_summary, OVERALL_SUMMARY);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["rows"][0]["row_data"]["Cost"], "1200");
        assert_eq!(value["rows"][0]["sheet"], "Sheet1");
    }
}
