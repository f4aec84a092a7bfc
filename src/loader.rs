use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use log::{info, warn};

use crate::error::DashboardError;
use crate::schema::{EDITABLE_COLUMNS, Role, View};
use crate::sheets::SheetClient;
use crate::table::{RawGrid, Table};

/// Turn a fetched cell grid into a [`Table`].
///
/// Blank rows are dropped, the first remaining row becomes the (trimmed)
/// header, entirely blank columns are dropped, the optional `projection` is
/// applied in its own order (role columns are always kept so rows stay
/// attributable to their owners), and the editable columns are backfilled with
/// blanks when the sheet does not carry them.
///
/// # Examples
/// ```
/// use csm_dashboard::loader::normalize;
/// use csm_dashboard::table::RawGrid;
///
/// let grid = RawGrid::from_rows(vec![
///     vec![" Id ".into(), "Nation".into()],
///     vec!["".into(), "".into()],
///     vec!["1".into(), "north".into()],
/// ]);
/// let table = normalize(&grid, None);
/// assert_eq!(table.cell(0, "Id"), Some("1"));
/// assert!(table.has_column("Remarks"));
/// ```
pub fn normalize(grid: &RawGrid, projection: Option<&[&str]>) -> Table {
    let mut rows = grid
        .rows
        .iter()
        .filter(|row| !row.iter().all(|cell| cell.is_empty()));

    let Some(header) = rows.next() else {
        return Table::empty();
    };
    let data: Vec<&Vec<String>> = rows.collect();

    let kept: Vec<usize> = (0..header.len())
        .filter(|&col| data.iter().any(|row| !row[col].is_empty()))
        .collect();

    let columns = kept.iter().map(|&c| header[c].trim().to_string()).collect();
    let body = data
        .iter()
        .map(|row| kept.iter().map(|&c| row[c].clone()).collect())
        .collect();
    let mut table = Table::new(columns, body);

    if let Some(names) = projection {
        let mut keep = names.to_vec();
        for role in Role::ALL {
            if !keep.contains(&role.column()) {
                keep.push(role.column());
            }
        }
        table = table.project(&keep);
    }

    for column in EDITABLE_COLUMNS {
        table.push_column(column, "");
    }

    table
}

/// Read and normalize one worksheet.
///
/// Never fails: an unreadable tab yields an empty table together with the
/// warning to show the user.
pub fn load_tab(
    client: &dyn SheetClient,
    tab: &str,
    projection: Option<&[&str]>,
) -> (Table, Option<DashboardError>) {
    match client.read_tab(tab) {
        Ok(grid) => (normalize(&grid, projection), None),
        Err(source) => {
            warn!("unable to load sheet {}: {}", tab, source);
            (
                Table::empty(),
                Some(DashboardError::SourceUnavailable {
                    tab: tab.to_string(),
                    source,
                }),
            )
        }
    }
}

/// Every view loaded in one pass, plus the roster.
#[derive(Debug, Clone)]
pub struct Workbook {
    /// Views that came back with data. Missing entries mean "no data found".
    pub views: BTreeMap<View, Table>,
    pub roster: Table,
    /// Human-readable load warnings, one per unreadable tab.
    pub warnings: Vec<String>,
    pub refreshed_at: DateTime<Local>,
}

impl Workbook {
    pub fn load(client: &dyn SheetClient) -> Self {
        let mut views = BTreeMap::new();
        let mut warnings = Vec::new();

        for view in View::ALL {
            let (table, warning) = load_tab(client, view.source_tab(), view.projection());
            if let Some(w) = warning {
                warnings.push(w.to_string());
            }
            if !table.is_empty() {
                views.insert(view, table);
            }
        }

        let roster = views.get(&View::ROSTER).cloned().unwrap_or_default();
        info!(
            "loaded {} of {} views, {} warnings",
            views.len(),
            View::ALL.len(),
            warnings.len()
        );

        Workbook {
            views,
            roster,
            warnings,
            refreshed_at: Local::now(),
        }
    }

    pub fn view(&self, view: View) -> Option<&Table> {
        self.views.get(&view)
    }
}
