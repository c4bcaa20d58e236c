//! Delimited file reader with encoding and delimiter auto-detection.
//!
//! Turns CSV-like text into a typed [`Dataset`]. No mapping logic here.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::{Dataset, Value};

/// Plain decimal numbers; multi-digit integer parts may not start with 0.
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?$").expect("valid number pattern"));

/// Candidate delimiters, in tie-break order.
const DELIMITERS: [char; 4] = [';', ',', '\t', '|'];

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed records
    pub dataset: Dataset,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

/// Untyped table: header row plus raw cells.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Unknown encodings and invalid UTF-8 fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = DELIMITERS[0];
    let mut best_count = 0;

    for &sep in &DELIMITERS {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Type one raw cell.
///
/// Empty (after trimming) is absent. A plain decimal number is a number only
/// when it is written back exactly as read, so identifiers beyond f64
/// precision (`12345678901234567890`) and padded decimals (`19.90`) stay
/// text. Digit strings with leading zeros stay text. Anything else is text.
pub fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Absent;
    }
    if NUMBER_RE.is_match(trimmed) {
        if let Ok(n) = trimmed.parse::<f64>() {
            let number = Value::Number(n);
            if n.is_finite() && number.to_string() == trimmed {
                return number;
            }
        }
    }
    Value::Text(trimmed.to_string())
}

/// Read a delimited table without typing the cells.
///
/// Short rows are padded with empty cells; extra cells are dropped.
pub fn read_raw_table(content: &str, delimiter: char) -> CsvResult<RawTable> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }
    if !delimiter.is_ascii() {
        return Err(CsvError::Parse {
            line: 0,
            message: format!("Delimiter '{}' is not a single-byte character", delimiter),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(row_idx as u64 + 2);
        if record.len() > headers.len() {
            warn!(
                "Line {}: {} cells for {} columns, extra cells ignored",
                line,
                record.len(),
                headers.len()
            );
        }
        let row: Vec<String> = (0..headers.len())
            .map(|i| record.get(i).unwrap_or("").to_string())
            .collect();
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

/// Parse delimited text with an explicit delimiter.
///
/// # Example
/// ```ignore
/// use fieldmap::parse_str;
///
/// let result = parse_str("name;age\nAlice;30\nBob;25", ';').unwrap();
///
/// assert_eq!(result.dataset.len(), 2);
/// assert_eq!(result.dataset.get(0, "age"), Some(&fieldmap::Value::Number(30.0)));
/// ```
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<ParseResult> {
    parse_decoded(content, delimiter, "utf-8".to_string())
}

fn parse_decoded(content: &str, delimiter: char, encoding: String) -> CsvResult<ParseResult> {
    let table = read_raw_table(content, delimiter)?;
    let rows: Vec<Vec<Value>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| parse_cell(cell)).collect())
        .collect();
    let dataset = Dataset::from_rows(table.headers.clone(), rows)?;

    debug!(
        "Parsed {} record(s) with {} column(s), delimiter '{}'",
        dataset.len(),
        table.headers.len(),
        format_delimiter(delimiter)
    );

    Ok(ParseResult {
        dataset,
        encoding,
        delimiter,
        headers: table.headers,
    })
}

/// Parse bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    parse_bytes(bytes, None)
}

/// Parse bytes with auto-detected encoding and an optional forced delimiter.
pub fn parse_bytes(bytes: &[u8], delimiter: Option<char>) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    parse_decoded(&content, delimiter, encoding)
}

/// Parse a file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_file_auto("/path/to/file.csv")?;
/// println!("Encoding: {}, Delimiter: '{}'", result.encoding, result.delimiter);
/// println!("Records: {}", result.dataset.len());
/// ```
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    parse_file(path, None)
}

/// Parse a file with an optional forced delimiter.
pub fn parse_file<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes, delimiter)
}

/// Printable form of a delimiter.
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
