//! Dataset writers.
//!
//! Delimited text (absent cells written empty) and JSON (an array of objects
//! in schema order, absent cells as `null`).

use std::fs;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::Dataset;

/// Output format for mapped datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    /// Pick the format from a file extension; `.json` is JSON, anything else CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}

/// Render a dataset as delimited text with a header row.
pub fn to_csv_string(dataset: &Dataset, delimiter: char) -> CsvResult<String> {
    if !delimiter.is_ascii() {
        return Err(CsvError::Parse {
            line: 0,
            message: format!("Delimiter '{}' is not a single-byte character", delimiter),
        });
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter as u8)
        .from_writer(Vec::new());

    writer.write_record(dataset.fields())?;
    for record in dataset.records() {
        writer.write_record(record.values().iter().map(|v| v.to_string()))?;
    }

    let bytes = writer.into_inner().map_err(|e| CsvError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Render a dataset as a pretty-printed JSON array.
pub fn to_json(dataset: &Dataset) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(dataset)
}

/// Render a dataset in the given format.
pub fn render(dataset: &Dataset, format: OutputFormat, delimiter: char) -> CsvResult<String> {
    match format {
        OutputFormat::Csv => to_csv_string(dataset, delimiter),
        OutputFormat::Json => to_json(dataset).map_err(|e| CsvError::Parse {
            line: 0,
            message: e.to_string(),
        }),
    }
}

/// Write a dataset to a delimited file.
pub fn write_csv(dataset: &Dataset, path: &Path, delimiter: char) -> CsvResult<()> {
    let content = to_csv_string(dataset, delimiter)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;

    fn sample() -> Dataset {
        Dataset::from_rows(
            vec!["FullName".into(), "AgeGroup".into(), "Score".into()],
            vec![
                vec![Value::from("JOHN"), Value::from("Middle"), Value::Number(7.0)],
                vec![Value::from("ANN, JR"), Value::Absent, Value::Number(2.5)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_csv_output() {
        let csv = to_csv_string(&sample(), ',').unwrap();
        assert_eq!(
            csv,
            "FullName,AgeGroup,Score\nJOHN,Middle,7\n\"ANN, JR\",,2.5\n"
        );
    }

    #[test]
    fn test_json_output() {
        let json = to_json(&sample()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["FullName"], "JOHN");
        assert_eq!(parsed[0]["Score"], 7.0);
        assert!(parsed[1]["AgeGroup"].is_null());
        // Field order follows the schema, not the alphabet.
        assert!(json.find("FullName").unwrap() < json.find("AgeGroup").unwrap());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("out.JSON")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_path(Path::new("out.tsv")), OutputFormat::Csv);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&sample(), &path, ';').unwrap();

        let parsed = crate::parser::parse_file_auto(&path).unwrap();
        assert_eq!(parsed.dataset, sample());
    }
}
