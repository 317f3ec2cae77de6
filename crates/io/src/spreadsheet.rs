// Transcript import from exported grade sheets (xlsx/xls/ods, CSV)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use gradcheck_recon::config::TranscriptColumns;
use gradcheck_recon::{ReconError, StudentIdentity, TranscriptCourse, TranscriptRecord};

/// Sheet read when present; otherwise the first sheet is used.
pub const PREFERRED_SHEET: &str = "总表";

/// Read a grade sheet into a transcript record for `student`. Every row must
/// carry the columns named by `columns.required_keys`.
pub fn import(
    path: &Path,
    student: StudentIdentity,
    columns: &TranscriptColumns,
) -> Result<TranscriptRecord, ReconError> {
    let grid = match extension(path).as_deref() {
        Some("csv") => read_csv(path),
        Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => read_workbook(path),
        Some(other) => Err(format!("unsupported transcript file type: .{other}")),
        None => Err(format!("{}: missing file extension", path.display())),
    }
    .map_err(ReconError::Io)?;

    let courses = rows_to_courses(grid);
    if courses.is_empty() {
        return Err(ReconError::TranscriptSchema(format!(
            "{}: no course rows found",
            path.display()
        )));
    }

    let record = TranscriptRecord {
        student,
        courses: courses.into_iter().map(TranscriptCourse::new).collect(),
    };
    record
        .check_required_keys(&columns.required_keys)
        .map_err(|e| match e {
            ReconError::TranscriptSchema(msg) => {
                ReconError::TranscriptSchema(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
    info!(path = %path.display(), courses = record.courses.len(), "transcript sheet imported");
    Ok(record)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Row 0 names the columns. Blank header columns are dropped, blank rows
/// skipped, and a repeated header keeps its first column.
pub fn rows_to_courses(grid: Vec<Vec<Value>>) -> Vec<Map<String, Value>> {
    let mut rows = grid.into_iter();
    let Some(header) = rows.next() else {
        return Vec::new();
    };

    let mut columns: Vec<(usize, String)> = Vec::new();
    for (i, cell) in header.iter().enumerate() {
        let name = cell_text(cell);
        if name.is_empty() {
            debug!(column = i, "blank header column dropped");
            continue;
        }
        if columns.iter().any(|(_, n)| *n == name) {
            debug!(column = i, header = %name, "repeated header column dropped");
            continue;
        }
        columns.push((i, name));
    }

    rows.filter(|row| !row.iter().all(is_blank))
        .map(|row| {
            let mut map = Map::new();
            for (i, name) in &columns {
                let value = row.get(*i).cloned().unwrap_or_else(|| Value::String(String::new()));
                map.insert(name.clone(), value);
            }
            map
        })
        .collect()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Workbooks
// ---------------------------------------------------------------------------

pub fn read_workbook(path: &Path) -> Result<Vec<Vec<Value>>, String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open spreadsheet: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet = sheet_names
        .iter()
        .find(|n| n.as_str() == PREFERRED_SHEET)
        .or_else(|| sheet_names.first())
        .cloned()
        .ok_or_else(|| "Spreadsheet contains no sheets".to_string())?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet, e))?;
    debug!(sheet = %sheet, rows = range.height(), "reading transcript sheet");

    Ok(range
        .rows()
        .map(|row| row.iter().map(data_to_json).collect())
        .collect())
}

/// Numbers stay numbers (integral floats become integers), dates become
/// `YYYY-MM-DD`, everything else trimmed text.
pub fn data_to_json(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::String(String::new()),
        Data::String(s) => Value::String(s.trim().to_string()),
        Data::Float(n) => float_to_json(*n),
        Data::Int(n) => Value::Number((*n).into()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Error(e) => Value::String(format!("#{:?}", e)),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) if datetime.time() == chrono::NaiveTime::MIN => {
                Value::String(datetime.format("%Y-%m-%d").to_string())
            }
            Some(datetime) => Value::String(datetime.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => float_to_json(dt.as_f64()),
        },
        Data::DateTimeIso(s) => Value::String(iso_date(s)),
        Data::DurationIso(s) => Value::String(s.clone()),
    }
}

fn float_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::Number((n as i64).into())
    } else {
        Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(n.to_string()))
    }
}

fn iso_date(s: &str) -> String {
    match chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        Ok(dt) if dt.time() == chrono::NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
        _ => s.to_string(),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Decode as UTF-8, falling back to GBK (common for grade sheets exported on
/// Chinese-locale Windows).
pub fn decode_bytes(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s.trim_start_matches('\u{feff}').to_string(),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::GBK.decode(&bytes);
            decoded.into_owned()
        }
    }
}

pub fn read_csv(path: &Path) -> Result<Vec<Vec<Value>>, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    parse_csv(&decode_bytes(bytes))
}

pub fn parse_csv(content: &str) -> Result<Vec<Vec<Value>>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        grid.push(
            record
                .iter()
                .map(|field| Value::String(field.trim().to_string()))
                .collect(),
        );
    }
    Ok(grid)
}
