//! Local file sources.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use serde_json::Value;

use super::{DataSource, SourceError};
use crate::records::RawRow;

/// Parse CSV with a header row into raw rows. Every cell is a string;
/// short records leave trailing columns absent.
pub(crate) fn rows_from_csv<R: Read>(reader: R) -> Result<Vec<RawRow>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), Value::String(v.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Parse a JSON array of objects into raw rows.
pub(crate) fn rows_from_json(text: &str) -> Result<Vec<RawRow>, SourceError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(SourceError::Shape(json_kind(&value)));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            other => Err(SourceError::Shape(json_kind(&other))),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn read(path: &PathBuf) -> Result<String, SourceError> {
    fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.clone(),
        source,
    })
}

// ---------------------------------------------------------------------------
// CSV file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for CsvFileSource {
    fn fetch(&mut self) -> Result<Vec<RawRow>, SourceError> {
        let text = read(&self.path)?;
        Ok(rows_from_csv(text.as_bytes())?)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for JsonFileSource {
    fn fetch(&mut self) -> Result<Vec<RawRow>, SourceError> {
        rows_from_json(&read(&self.path)?)
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_keep_header_names() {
        let text = "NC Number,Status,Cost of Rework\nNC-1,Open,$10.00\nNC-2,Closed\n";
        let rows = rows_from_csv(text.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Cost of Rework"], Value::String("$10.00".into()));
        assert!(rows[1].get("Cost of Rework").is_none());
    }

    #[test]
    fn json_rows_must_be_objects() {
        let rows = rows_from_json(r#"[{"NC Number": "1", "Cost Avoided": 12.5}]"#).unwrap();
        assert_eq!(rows[0]["Cost Avoided"], serde_json::json!(12.5));

        assert!(matches!(rows_from_json("{}"), Err(SourceError::Shape("an object"))));
        assert!(matches!(rows_from_json("[1]"), Err(SourceError::Shape("a number"))));
    }

    #[test]
    fn csv_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nc.csv");
        fs::write(&path, "NC Number,Status\nNC-9,Open\n").unwrap();

        let mut source = CsvFileSource::new(&path);
        let rows = source.fetch().unwrap();
        assert_eq!(rows[0]["NC Number"], Value::String("NC-9".into()));
        assert!(source.describe().ends_with("nc.csv"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut source = JsonFileSource::new("/definitely/not/here.json");
        assert!(matches!(source.fetch(), Err(SourceError::Io { .. })));
    }
}
