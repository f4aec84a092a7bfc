use csm_dashboard::loader::normalize;
use csm_dashboard::persister::{destination_tab, save, to_storage};
use csm_dashboard::sheets::{CsvDirSheets, MemorySheets, SheetClient};
use csm_dashboard::{DashboardError, RawGrid, SheetError, Table};

fn edited_rows() -> Table {
    Table::new(
        vec![
            "Id".into(),
            "CSM Updated".into(),
            "Clearance Date".into(),
            "Remarks".into(),
            "Support Required".into(),
        ],
        vec![
            vec!["1".into(), "alice".into(), "2025-04-01".into(), "done, closed".into(), "".into()],
            vec!["2".into(), "alice".into(), "".into(), "needs \"parts\"".into(), "yes".into()],
        ],
    )
}

/// Backend whose writes always fail.
struct BrokenSheets;

impl SheetClient for BrokenSheets {
    fn read_tab(&self, tab: &str) -> Result<RawGrid, SheetError> {
        Err(SheetError::TabNotFound(tab.to_string()))
    }

    fn tab_exists(&self, _tab: &str) -> Result<bool, SheetError> {
        Ok(true)
    }

    fn add_tab(&self, _tab: &str, _rows: usize, _cols: usize) -> Result<(), SheetError> {
        Ok(())
    }

    fn update_tab(&self, _tab: &str, _grid: &RawGrid) -> Result<(), SheetError> {
        Err(SheetError::Http {
            status: 403,
            message: "The caller does not have permission".to_string(),
        })
    }
}

#[test]
fn test_destination_tab_mapping() {
    assert_eq!(destination_tab("WCS-Final"), "WCS Clear");
    assert_eq!(destination_tab("FG-Final"), "FG Clear");
    assert_eq!(destination_tab("Reorder"), "Reorder Clear");
    assert_eq!(
        destination_tab("Project Stock at Site-Final"),
        "Project Stock at Site-Clear"
    );
    assert_eq!(destination_tab("Complaint-Final"), "Complaint-Final Clear");
    assert_eq!(destination_tab("Testimonial"), "Testimonial Clear");
    println!("✓ Clear sheet names resolved");
}

#[test]
fn test_save_creates_destination_and_round_trips() {
    let client = MemorySheets::new().with_tab("WCS-Final", vec![vec!["Id"], vec!["source"]]);
    let table = edited_rows();

    let report = save(&client, &table, "WCS-Final").unwrap();
    assert_eq!(report.destination, "WCS Clear");
    assert!(report.created);
    assert_eq!(report.rows, 2);
    assert_eq!(report.message(), "Data successfully saved to 'WCS Clear' sheet.");

    let written = client.read_tab("WCS Clear").unwrap();
    assert_eq!(written.rows[0], table.columns);
    assert_eq!(written, table.to_grid());
    assert_eq!(normalize(&written, None), table);

    // the source tab is never written
    let source = client.read_tab("WCS-Final").unwrap();
    assert_eq!(source.rows[1], vec!["source".to_string()]);
}

#[test]
fn test_save_overwrites_existing_destination() {
    let client = MemorySheets::new().with_tab(
        "Reorder Clear",
        vec![vec!["Old"], vec!["1"], vec!["2"], vec!["3"]],
    );
    let table = edited_rows();

    let report = save(&client, &table, "Reorder").unwrap();
    assert!(!report.created);
    assert_eq!(client.read_tab("Reorder Clear").unwrap(), table.to_grid());
}

#[test]
fn test_save_failure_is_reported_verbatim() {
    let result = save(&BrokenSheets, &edited_rows(), "FG-Final");
    match result {
        Err(DashboardError::PersistFailure(message)) => {
            assert!(message.contains("The caller does not have permission"));
        }
        other => panic!("expected PersistFailure, got {:?}", other),
    }
}

#[test]
fn test_storage_canonicalizes_clearance_dates() {
    let table = Table::new(
        vec!["Clearance Date".into(), "Remarks".into()],
        vec![
            vec!["04/05/2025".into(), "a".into()],
            vec!["not a date".into(), "b".into()],
        ],
    );
    let grid = to_storage(&table);
    assert_eq!(grid.rows[0], vec!["Clearance Date", "Remarks"]);
    assert_eq!(grid.rows[1][0], "2025-04-05");
    assert_eq!(grid.rows[2][0], "not a date");
}

#[test]
fn test_csv_backend_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let client = CsvDirSheets::new(dir.path());
    let table = edited_rows();

    assert!(!client.tab_exists("FG Clear").unwrap());
    let report = save(&client, &table, "FG-Final").unwrap();
    assert!(report.created);
    assert!(dir.path().join("FG Clear.csv").is_file());

    let written = client.read_tab("FG Clear").unwrap();
    assert_eq!(written, table.to_grid());
    assert_eq!(written.rows[1][3], "done, closed");
    assert_eq!(written.rows[2][3], "needs \"parts\"");
}
