//! Core side of the table renderer: row classification, the serializable
//! view model handed to templates, and folding edits back into a table.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::access::to_number;
use crate::error::EditError;
use crate::schema::{CLEARANCE_DATE, EDITABLE_COLUMNS, View};
use crate::table::Table;

/// Highlight applied to a whole row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStyle {
    Fresh,
    Stale,
    Plain,
}

impl RowStyle {
    pub fn css_class(self) -> &'static str {
        match self {
            RowStyle::Fresh => "fresh",
            RowStyle::Stale => "stale",
            RowStyle::Plain => "",
        }
    }
}

/// Classify a row by its age against the view's threshold.
///
/// Views without a threshold, and rows whose age is not a number, stay plain.
pub fn classify(view: View, table: &Table, row: usize) -> RowStyle {
    let (Some(column), Some(threshold)) = (view.ageing_column(), view.ageing_threshold()) else {
        return RowStyle::Plain;
    };
    match table.cell(row, column).and_then(to_number) {
        Some(age) if age < threshold => RowStyle::Fresh,
        Some(_) => RowStyle::Stale,
        None => RowStyle::Plain,
    }
}

pub fn is_editable(column: &str) -> bool {
    EDITABLE_COLUMNS.contains(&column)
}

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y", "%d %b %Y"];

/// Parse the date forms that show up in the sheets. A trailing time is ignored.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let date_part = value.split_whitespace().next().unwrap_or("");
    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(value, fmt)
            .or_else(|_| NaiveDate::parse_from_str(date_part, fmt))
            .ok()
    })
}

/// `YYYY-MM-DD` for anything that parses as a date, `None` otherwise.
pub fn canonical_date(value: &str) -> Option<String> {
    parse_date(value).map(|d| d.format("%Y-%m-%d").to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct PresentedCell {
    pub value: String,
    pub editable: bool,
    /// `"text"` or `"date"`.
    pub input: &'static str,
    /// Form field name carrying this cell's edit.
    pub field: String,
    /// Read-only cells carry the row tint; editable ones never do.
    pub class: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresentedRow {
    pub index: usize,
    /// Fingerprint of the read-only cells, echoed back on save.
    pub key: String,
    pub key_field: String,
    pub style: RowStyle,
    pub cells: Vec<PresentedCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresentedHeader {
    pub name: String,
    pub editable: bool,
}

/// Everything a template needs to draw an editable table.
#[derive(Debug, Clone, Serialize)]
pub struct Presentation {
    pub title: String,
    pub headers: Vec<PresentedHeader>,
    pub rows: Vec<PresentedRow>,
    /// Earliest selectable clearance date.
    pub min_date: String,
    pub row_count: usize,
}

pub fn edit_field(row: usize, col: usize) -> String {
    format!("cell-{}-{}", row, col)
}

pub fn row_key_field(row: usize) -> String {
    format!("key-{}", row)
}

/// SHA-256 over the read-only cells of `row`.
///
/// Editable cells are left out so the key survives a save. Two rows that
/// differ in any other cell get different keys.
pub fn row_key(table: &Table, row: usize) -> String {
    let mut hasher = Sha256::new();
    if let Some(values) = table.rows.get(row) {
        for (name, value) in table.columns.iter().zip(values) {
            if is_editable(name) {
                continue;
            }
            hasher.update(name.as_bytes());
            hasher.update([0x1f]);
            hasher.update(value.as_bytes());
            hasher.update([0x1e]);
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Inverse of [`edit_field`].
pub fn parse_edit_field(name: &str) -> Option<(usize, usize)> {
    let rest = name.strip_prefix("cell-")?;
    let (row, col) = rest.split_once('-')?;
    Some((row.parse().ok()?, col.parse().ok()?))
}

pub fn present(view: View, table: &Table, today: NaiveDate) -> Presentation {
    let headers = table
        .columns
        .iter()
        .map(|name| PresentedHeader {
            name: name.clone(),
            editable: is_editable(name),
        })
        .collect();

    let rows = table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let style = classify(view, table, index);
            let cells = table
                .columns
                .iter()
                .zip(row.iter())
                .enumerate()
                .map(|(col, (name, value))| {
                    let editable = is_editable(name);
                    let is_date = name == CLEARANCE_DATE;
                    PresentedCell {
                        value: if is_date {
                            canonical_date(value).unwrap_or_default()
                        } else {
                            value.clone()
                        },
                        editable,
                        input: if is_date { "date" } else { "text" },
                        field: edit_field(index, col),
                        class: if editable { "" } else { style.css_class() },
                    }
                })
                .collect();
            PresentedRow {
                index,
                key: row_key(table, index),
                key_field: row_key_field(index),
                style,
                cells,
            }
        })
        .collect();

    Presentation {
        title: view.label().to_string(),
        headers,
        rows,
        min_date: today.format("%Y-%m-%d").to_string(),
        row_count: table.len(),
    }
}

/// One submitted cell value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEdit {
    pub row: usize,
    pub column: String,
    pub value: String,
}

/// Turn submitted `cell-<row>-<col>` fields into edits against `table`.
///
/// Each edited row must come back with the key it was displayed with, so an
/// edit never lands on a different record after the rows were reloaded.
pub fn collect_edits(
    table: &Table,
    form: &HashMap<String, String>,
) -> Result<Vec<CellEdit>, EditError> {
    let mut edits: Vec<CellEdit> = form
        .iter()
        .filter_map(|(name, value)| {
            let (row, col) = parse_edit_field(name)?;
            let column = table.columns.get(col)?;
            Some(CellEdit {
                row,
                column: column.clone(),
                value: value.clone(),
            })
        })
        .collect();
    edits.sort_by(|a, b| (a.row, &a.column).cmp(&(b.row, &b.column)));

    for edit in &edits {
        if edit.row >= table.len() {
            return Err(EditError::RowOutOfRange(edit.row));
        }
        if form.get(&row_key_field(edit.row)) != Some(&row_key(table, edit.row)) {
            return Err(EditError::StaleRow(edit.row));
        }
    }
    Ok(edits)
}

/// Fold `edits` into a copy of `table`.
///
/// Only the editable columns may change. A clearance date that differs from
/// the stored one must parse and must not be earlier than `today`; an
/// unchanged date is accepted as-is so old rows can still be resubmitted.
/// A blank date clears the cell unless the stored text was never a date,
/// in which case it is kept.
pub fn apply_edits(
    table: &Table,
    edits: &[CellEdit],
    today: NaiveDate,
) -> Result<Table, EditError> {
    let mut edited = table.clone();

    for edit in edits {
        if !is_editable(&edit.column) {
            return Err(EditError::ReadOnlyColumn(edit.column.clone()));
        }
        let Some(col) = edited.column_index(&edit.column) else {
            return Err(EditError::ReadOnlyColumn(edit.column.clone()));
        };
        if edit.row >= edited.len() {
            return Err(EditError::RowOutOfRange(edit.row));
        }

        let value = if edit.column == CLEARANCE_DATE {
            checked_clearance_date(&edited.rows[edit.row][col], &edit.value, today)?
        } else {
            edit.value.clone()
        };
        edited.rows[edit.row][col] = value;
    }

    Ok(edited)
}

fn checked_clearance_date(
    current: &str,
    submitted: &str,
    today: NaiveDate,
) -> Result<String, EditError> {
    let submitted = submitted.trim();
    if submitted.is_empty() {
        // Unparseable dates render blank; leaving the field alone keeps them.
        if parse_date(current).is_none() {
            return Ok(current.to_string());
        }
        return Ok(String::new());
    }
    let date =
        parse_date(submitted).ok_or_else(|| EditError::InvalidDate(submitted.to_string()))?;
    if parse_date(current) == Some(date) {
        return Ok(date.format("%Y-%m-%d").to_string());
    }
    if date < today {
        return Err(EditError::DateBeforeToday(date.format("%Y-%m-%d").to_string()));
    }
    Ok(date.format("%Y-%m-%d").to_string())
}
