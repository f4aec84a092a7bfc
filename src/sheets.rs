//! Spreadsheet backends.
//!
//! The dashboard only ever needs to read a whole worksheet and to overwrite
//! a whole worksheet, creating it first when it is missing. [`SheetClient`]
//! captures exactly that; credentials are handled by each backend's
//! constructor.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::SheetError;
use crate::table::RawGrid;

pub trait SheetClient: Send + Sync {
    /// Read every cell of the named worksheet.
    fn read_tab(&self, tab: &str) -> Result<RawGrid, SheetError>;

    fn tab_exists(&self, tab: &str) -> Result<bool, SheetError>;

    /// Create an empty worksheet sized `rows` x `cols`.
    fn add_tab(&self, tab: &str, rows: usize, cols: usize) -> Result<(), SheetError>;

    /// Replace the full contents of an existing worksheet with `grid`.
    fn update_tab(&self, tab: &str, grid: &RawGrid) -> Result<(), SheetError>;

    /// Write `grid` to the named worksheet, creating it if absent.
    ///
    /// Returns `true` when the worksheet had to be created.
    fn write_tab(&self, tab: &str, grid: &RawGrid) -> Result<bool, SheetError> {
        let created = if self.tab_exists(tab)? {
            false
        } else {
            self.add_tab(tab, grid.height().max(1), grid.width().max(1))?;
            true
        };
        self.update_tab(tab, grid)?;
        Ok(created)
    }
}

/// In-process workbook. Useful for tests and for running the site without
/// any remote spreadsheet.
#[derive(Debug, Default)]
pub struct MemorySheets {
    tabs: Mutex<BTreeMap<String, RawGrid>>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tab(self, tab: &str, rows: Vec<Vec<&str>>) -> Self {
        let grid = RawGrid::from_rows(
            rows.into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
        );
        self.insert(tab, grid);
        self
    }

    pub fn insert(&self, tab: &str, grid: RawGrid) {
        self.lock().insert(tab.to_string(), grid);
    }

    pub fn tab_names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, RawGrid>> {
        // A poisoned map still holds consistent grids; every write is a full replace.
        self.tabs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SheetClient for MemorySheets {
    fn read_tab(&self, tab: &str) -> Result<RawGrid, SheetError> {
        self.lock()
            .get(tab)
            .cloned()
            .ok_or_else(|| SheetError::TabNotFound(tab.to_string()))
    }

    fn tab_exists(&self, tab: &str) -> Result<bool, SheetError> {
        Ok(self.lock().contains_key(tab))
    }

    fn add_tab(&self, tab: &str, rows: usize, cols: usize) -> Result<(), SheetError> {
        let grid = RawGrid::from_rows(vec![vec![String::new(); cols]; rows]);
        self.lock().insert(tab.to_string(), grid);
        Ok(())
    }

    fn update_tab(&self, tab: &str, grid: &RawGrid) -> Result<(), SheetError> {
        let mut tabs = self.lock();
        match tabs.get_mut(tab) {
            Some(existing) => {
                *existing = grid.clone();
                Ok(())
            }
            None => Err(SheetError::TabNotFound(tab.to_string())),
        }
    }
}

/// Directory of CSV files, one per worksheet (`<dir>/<tab>.csv`).
#[derive(Debug, Clone)]
pub struct CsvDirSheets {
    root: PathBuf,
}

impl CsvDirSheets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CsvDirSheets { root: root.into() }
    }

    fn tab_path(&self, tab: &str) -> PathBuf {
        self.root.join(format!("{}.csv", tab))
    }
}

impl SheetClient for CsvDirSheets {
    fn read_tab(&self, tab: &str) -> Result<RawGrid, SheetError> {
        let path = self.tab_path(tab);
        if !path.exists() {
            return Err(SheetError::TabNotFound(tab.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(RawGrid::from_rows(parse_csv(&content)))
    }

    fn tab_exists(&self, tab: &str) -> Result<bool, SheetError> {
        Ok(self.tab_path(tab).is_file())
    }

    fn add_tab(&self, tab: &str, rows: usize, cols: usize) -> Result<(), SheetError> {
        fs::create_dir_all(&self.root)?;
        let blank = RawGrid::from_rows(vec![vec![String::new(); cols]; rows]);
        write_csv(&self.tab_path(tab), &blank)
    }

    fn update_tab(&self, tab: &str, grid: &RawGrid) -> Result<(), SheetError> {
        let path = self.tab_path(tab);
        if !path.exists() {
            return Err(SheetError::TabNotFound(tab.to_string()));
        }
        write_csv(&path, grid)
    }
}

fn write_csv(path: &Path, grid: &RawGrid) -> Result<(), SheetError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(to_csv(grid).as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Parse CSV text into rows of fields.
///
/// Quoted fields may contain commas, doubled quotes and line breaks.
pub fn parse_csv(content: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut row_started = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        row_started = true;
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => row.push(std::mem::take(&mut field)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
                row_started = false;
            }
            _ => field.push(c),
        }
    }

    if row_started {
        row.push(field);
        rows.push(row);
    }

    rows
}

/// Render rows as CSV, quoting fields that need it.
pub fn to_csv(grid: &RawGrid) -> String {
    let mut out = String::new();
    for row in &grid.rows {
        let line: Vec<String> = row.iter().map(|v| escape_csv_field(v)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn escape_csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
