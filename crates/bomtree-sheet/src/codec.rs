use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::ImportError;

/// A single worksheet: ordered rows of text cells, the first row being the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, header: Vec<String>) -> Self {
        Self {
            name: name.into(),
            rows: vec![header],
        }
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Rows after the header.
    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or_default()
    }

    pub fn read_csv<R: Read>(name: impl Into<String>, reader: R) -> Result<Self, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            // fully blank lines carry no data
            if record.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self {
            name: name.into(),
            rows,
        })
    }

    pub fn from_csv_str(name: impl Into<String>, content: &str) -> Result<Self, ImportError> {
        Self::read_csv(name, content.as_bytes())
    }

    pub fn open(path: &Path) -> Result<Self, ImportError> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::read_csv(name, File::open(path)?)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ImportError> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, ImportError> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn save(&self, path: &Path) -> Result<(), ImportError> {
        self.write_csv(File::create(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_skips_blank_lines_and_keeps_ragged_rows() {
        let sheet = Sheet::from_csv_str(
            "bom",
            "Part Number,Description\nA-1,First\n,\nA-2\n\"A-3\",\"Quoted, with comma\"\n",
        )
        .unwrap();
        assert_eq!(sheet.header().unwrap(), &["Part Number", "Description"]);
        assert_eq!(sheet.body().len(), 3);
        assert_eq!(sheet.body()[1], vec!["A-2"]);
        assert_eq!(sheet.body()[2][1], "Quoted, with comma");
    }

    #[test]
    fn test_write_round_trip() {
        let mut sheet = Sheet::new("out", vec!["a".into(), "b".into()]);
        sheet.push_row(vec!["1".into(), "x, y".into()]);
        let text = sheet.to_csv_string().unwrap();
        assert_eq!(text, "a,b\n1,\"x, y\"\n");
        assert_eq!(Sheet::from_csv_str("out", &text).unwrap(), sheet);
    }

    #[test]
    fn test_empty_input() {
        let sheet = Sheet::from_csv_str("empty", "").unwrap();
        assert!(sheet.header().is_none());
        assert!(sheet.body().is_empty());
    }
}
