use serde::{Deserialize, Serialize};

/// Cell grid exactly as fetched from a worksheet.
///
/// The first row is a prospective header. Rows and columns may be entirely
/// blank. [`RawGrid::from_rows`] pads ragged input so every row has the same
/// width, because spreadsheet services drop trailing empty cells.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGrid {
    pub rows: Vec<Vec<String>>,
}

impl RawGrid {
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in rows.iter_mut() {
            row.resize(width, String::new());
        }
        RawGrid { rows }
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Text table with named columns.
///
/// Column names are unique and every row holds exactly one cell per column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn empty() -> Self {
        Table::default()
    }

    /// Build a table from a header and data rows.
    ///
    /// Rows are padded or truncated to the header width and repeated header
    /// names get a ` (n)` suffix.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns = dedupe_names(columns);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Table { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    pub fn column_values(&self, column: &str) -> Option<Vec<&str>> {
        let col = self.column_index(column)?;
        Some(self.rows.iter().map(|r| r[col].as_str()).collect())
    }

    /// Append a column filled with `fill`. Existing columns are left alone.
    pub fn push_column(&mut self, name: &str, fill: &str) {
        if self.has_column(name) {
            return;
        }
        self.columns.push(name.to_string());
        for row in self.rows.iter_mut() {
            row.push(fill.to_string());
        }
    }

    /// Sub-table of the rows accepted by `keep`, in their original order.
    pub fn select_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[String]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Keep only the named columns that exist, in the given order.
    pub fn project(&self, names: &[&str]) -> Table {
        let picked: Vec<usize> = names
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        Table {
            columns: picked.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| picked.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        }
    }

    /// Header row followed by every data row.
    pub fn to_grid(&self) -> RawGrid {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(self.columns.clone());
        rows.extend(self.rows.iter().cloned());
        RawGrid { rows }
    }
}

fn dedupe_names(columns: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(columns.len());
    for name in columns {
        if !seen.contains(&name) {
            seen.push(name);
            continue;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{} ({})", name, n);
            if !seen.contains(&candidate) {
                seen.push(candidate);
                break;
            }
            n += 1;
        }
    }
    seen
}
