use std::collections::HashMap;

use lazy_static::lazy_static;
use log::{error, info};

use crate::error::DashboardError;
use crate::presenter::canonical_date;
use crate::schema::CLEARANCE_DATE;
use crate::sheets::SheetClient;
use crate::table::{RawGrid, Table};

lazy_static! {
    /// Source worksheets whose clear sheet does not follow the `"<tab> Clear"` rule.
    static ref CLEAR_SHEETS: HashMap<&'static str, &'static str> = HashMap::from([
        ("Complaint File", "Complaint Clear"),
        ("Open Sites Final", "Open SitesClear"),
        ("Project Stock at Site-Final", "Project Stock at Site-Clear"),
        ("WCS-Final", "WCS Clear"),
        ("FG-Final", "FG Clear"),
        ("Reorder", "Reorder Clear"),
    ]);
}

/// Name of the worksheet edits of `source_tab` are written to.
pub fn destination_tab(source_tab: &str) -> String {
    CLEAR_SHEETS
        .get(source_tab)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("{} Clear", source_tab))
}

/// Grid to upload: header first, every cell as text, clearance dates canonical.
pub fn to_storage(table: &Table) -> RawGrid {
    let mut grid = table.to_grid();
    if let Some(col) = table.column_index(CLEARANCE_DATE) {
        for row in grid.rows.iter_mut().skip(1) {
            if let Some(date) = canonical_date(&row[col]) {
                row[col] = date;
            }
        }
    }
    grid
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub destination: String,
    pub created: bool,
    pub rows: usize,
}

impl SaveReport {
    pub fn message(&self) -> String {
        format!("Data successfully saved to '{}' sheet.", self.destination)
    }
}

/// Overwrite the clear sheet of `source_tab` with `table`.
///
/// The source worksheet is never touched. Failures are reported once, with
/// the backend's message, and not retried.
pub fn save(
    client: &dyn SheetClient,
    table: &Table,
    source_tab: &str,
) -> Result<SaveReport, DashboardError> {
    let destination = destination_tab(source_tab);
    let grid = to_storage(table);

    match client.write_tab(&destination, &grid) {
        Ok(created) => {
            info!(
                "saved {} rows of {} to {}{}",
                table.len(),
                source_tab,
                destination,
                if created { " (created)" } else { "" }
            );
            Ok(SaveReport {
                destination,
                created,
                rows: table.len(),
            })
        }
        Err(e) => {
            error!("saving {} to {} failed: {}", source_tab, destination, e);
            Err(DashboardError::PersistFailure(e.to_string()))
        }
    }
}
