//! Cell grids: the raw string cells of one sheet
//!
//! Reading the spreadsheet container is delegated to a [`GridSource`]. The
//! bundled [`CsvGridSource`] reads sheets exported as CSV.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A 2-D grid of string cells, rows may be ragged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Create a grid from rows of cells
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Number of rows, including the two header rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get a row by index
    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Get a cell; cells past the end of a row read as empty
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Something that can turn a spreadsheet file into a [`Grid`]
pub trait GridSource {
    /// Read the first sheet of `path`
    fn read_grid(&self, path: &Path) -> Result<Grid>;
}

/// Reads sheets exported as CSV files
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvGridSource;

impl GridSource for CsvGridSource {
    fn read_grid(&self, path: &Path) -> Result<Grid> {
        let file = File::open(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        read_csv(BufReader::new(file), path)
    }
}

/// Parse a grid from CSV text (useful for testing)
pub fn parse_grid_str(content: &str, source_name: &str) -> Result<Grid> {
    read_csv(content.as_bytes(), Path::new(source_name))
}

fn read_csv<R: std::io::Read>(reader: R, path: &Path) -> Result<Grid> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // Header and data rows may differ in width
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(|e| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Grid::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_grid() {
        let grid = parse_grid_str("ID,Name\nstring,string\n001,Sword\n", "Item.csv").unwrap();

        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.cell(0, 0), "ID");
        assert_eq!(grid.cell(1, 1), "string");
        assert_eq!(grid.cell(2, 1), "Sword");
    }

    #[test]
    fn test_ragged_rows_read_as_empty() {
        let grid = parse_grid_str("ID,Name,Value\nstring,string,int\n001\n", "t.csv").unwrap();

        assert_eq!(grid.row(2).map(<[String]>::len), Some(1));
        assert_eq!(grid.cell(2, 2), "");
        assert_eq!(grid.cell(10, 0), "");
    }

    #[test]
    fn test_quoted_multiline_cell() {
        let csv = "ID,Tags\nstring,string[]\n001,\"Sharp\nHeavy\"\n";
        let grid = parse_grid_str(csv, "t.csv").unwrap();

        assert_eq!(grid.cell(2, 1), "Sharp\nHeavy");
    }

    #[test]
    fn test_csv_source_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Item.csv");
        std::fs::write(&path, "ID,Name\nstring,string\n").unwrap();

        let grid = CsvGridSource.read_grid(&path).unwrap();
        assert_eq!(grid.cell(0, 1), "Name");
    }

    #[test]
    fn test_csv_source_missing_file() {
        let err = CsvGridSource
            .read_grid(Path::new("/definitely/not/here.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
