//! Row ownership and the narrowing applied on top of it.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::loader::Workbook;
use crate::schema::{CSM_COLUMN, NATION_COLUMN, View, ZONE_COLUMN};
use crate::session::SessionContext;
use crate::table::Table;

/// Non-blank, trimmed values of `role_column` across the roster.
pub fn roster_identities(roster: &Table, role_column: &str) -> BTreeSet<String> {
    let Some(values) = roster.column_values(role_column) else {
        return BTreeSet::new();
    };
    values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Rows whose `role_column` cell equals `identity` exactly.
///
/// The comparison is case-sensitive and untrimmed; normalize the identity
/// beforehand. A missing column is reported as
/// [`DashboardError::SchemaMismatch`] and the caller shows no rows.
pub fn rows_for(
    table: &Table,
    table_name: &str,
    role_column: &str,
    identity: &str,
) -> Result<Table, DashboardError> {
    let Some(col) = table.column_index(role_column) else {
        return Err(DashboardError::SchemaMismatch {
            table: table_name.to_string(),
            column: role_column.to_string(),
        });
    };
    Ok(table.select_rows(|row| row[col] == identity))
}

/// Parse a cell the way a lenient numeric coercion would: surrounding
/// whitespace is ignored, anything unparseable (or NaN) is `None`.
pub fn to_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Stable descending sort on the numeric value of `column`.
///
/// Non-numeric cells sort after every numeric one, keeping their load order.
pub fn sort_by_ageing(
    table: &Table,
    table_name: &str,
    column: &str,
) -> Result<Table, DashboardError> {
    let Some(col) = table.column_index(column) else {
        return Err(DashboardError::SchemaMismatch {
            table: table_name.to_string(),
            column: column.to_string(),
        });
    };

    let mut rows = table.rows.clone();
    rows.sort_by(|a, b| match (to_number(&a[col]), to_number(&b[col])) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    Ok(Table {
        columns: table.columns.clone(),
        rows,
    })
}

/// Result of running the access pipeline for the current session.
#[derive(Debug, Clone, Default)]
pub struct ViewRows {
    pub table: Table,
    /// Set when nothing may be rendered for this view.
    pub blocking: Option<String>,
    /// Non-blocking notices (e.g. the ageing column is missing).
    pub notices: Vec<String>,
}

/// Rows of the session's current view that belong to its identity, sorted by age.
pub fn view_rows(workbook: &Workbook, session: &SessionContext) -> ViewRows {
    let view = session.view;
    let Some(source) = workbook.view(view) else {
        return ViewRows {
            blocking: Some(format!("No data found for {}.", view.label())),
            ..ViewRows::default()
        };
    };
    let Some((role, identity)) = session.principal() else {
        return ViewRows {
            blocking: Some("Please log in.".to_string()),
            ..ViewRows::default()
        };
    };

    let owned = match rows_for(source, view.label(), role.column(), identity) {
        Ok(t) => t,
        Err(e) => {
            warn!("{}", e);
            return ViewRows {
                blocking: Some(e.to_string()),
                ..ViewRows::default()
            };
        }
    };

    if owned.is_empty() {
        return ViewRows {
            table: owned,
            blocking: Some("No records assigned to you.".to_string()),
            notices: Vec::new(),
        };
    }

    let mut notices = Vec::new();
    let table = match view.ageing_column() {
        Some(column) => match sort_by_ageing(&owned, view.label(), column) {
            Ok(sorted) => sorted,
            Err(e) => {
                debug!("{}", e);
                notices.push(e.to_string());
                owned
            }
        },
        None => owned,
    };

    ViewRows {
        table,
        blocking: None,
        notices,
    }
}

/// Display-only narrowing: nation, then zone, then CSM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub nation: Option<String>,
    pub zone: Option<String>,
    pub csm: Option<String>,
}

impl FilterSelection {
    /// Treat blank and "All" selections as no selection.
    pub fn normalized(self) -> Self {
        fn pick(v: Option<String>) -> Option<String> {
            v.filter(|s| !s.is_empty() && s != "All")
        }
        FilterSelection {
            nation: pick(self.nation),
            zone: pick(self.zone),
            csm: pick(self.csm),
        }
    }
}

fn cell_matches(table: &Table, row: &[String], column: &str, wanted: &Option<String>) -> bool {
    match (wanted, table.column_index(column)) {
        (Some(value), Some(col)) => row[col] == *value,
        _ => true,
    }
}

/// Narrow the displayed rows. Filters on columns the table lacks are ignored.
pub fn narrow(table: &Table, selection: &FilterSelection) -> Table {
    table.select_rows(|row| {
        cell_matches(table, row, NATION_COLUMN, &selection.nation)
            && cell_matches(table, row, ZONE_COLUMN, &selection.zone)
            && cell_matches(table, row, CSM_COLUMN, &selection.csm)
    })
}

/// Options for each filter dropdown, each list depending on the one above it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub nations: Vec<String>,
    pub zones: Vec<String>,
    pub csms: Vec<String>,
}

fn distinct(table: &Table, column: &str) -> Vec<String> {
    let values: BTreeSet<String> = table
        .column_values(column)
        .unwrap_or_default()
        .into_iter()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    values.into_iter().collect()
}

pub fn filter_options(table: &Table, selection: &FilterSelection) -> FilterOptions {
    let nations = distinct(table, NATION_COLUMN);

    let by_nation = narrow(
        table,
        &FilterSelection {
            nation: selection.nation.clone(),
            ..FilterSelection::default()
        },
    );
    let zones = distinct(&by_nation, ZONE_COLUMN);

    let by_zone = narrow(
        table,
        &FilterSelection {
            zone: selection.zone.clone(),
            ..FilterSelection::default()
        },
    );
    let csms = distinct(&by_zone, CSM_COLUMN);

    FilterOptions {
        nations,
        zones,
        csms,
    }
}

/// Number of rows per view assigned to `csm`, in view order.
pub fn summary_counts(workbook: &Workbook, csm: &str) -> BTreeMap<View, usize> {
    View::ALL
        .into_iter()
        .map(|view| {
            let count = workbook
                .view(view)
                .and_then(|t| rows_for(t, view.label(), CSM_COLUMN, csm).ok())
                .map(|t| t.len())
                .unwrap_or(0);
            (view, count)
        })
        .collect()
}
