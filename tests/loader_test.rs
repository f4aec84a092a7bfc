use csm_dashboard::loader::{Workbook, load_tab, normalize};
use csm_dashboard::schema::{APPRECIATION_COLUMNS, EDITABLE_COLUMNS, View};
use csm_dashboard::sheets::MemorySheets;
use csm_dashboard::{DashboardError, RawGrid};

// Helper to build a grid from string literals
fn grid(rows: &[&[&str]]) -> RawGrid {
    RawGrid::from_rows(
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

#[test]
fn test_blank_grid_normalizes_to_empty_table() {
    for rows in [vec![], vec![vec!["", ""]], vec![vec!["", ""], vec!["", ""], vec![""]]] {
        let raw = RawGrid::from_rows(
            rows.into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
        );
        let table = normalize(&raw, None);
        assert!(table.is_empty());
        assert!(table.columns.is_empty());
    }
    println!("✓ Blank grids normalize to an empty table");
}

#[test]
fn test_header_promotion_and_blank_stripping() {
    let raw = grid(&[
        &["", "", ""],
        &[" Id ", "Unused", "CSM Updated "],
        &["1", "", "alice"],
        &["", "", ""],
        &["2", "", "bob"],
    ]);
    let table = normalize(&raw, None);

    assert_eq!(table.len(), 2);
    assert_eq!(
        &table.columns[..2],
        &["Id".to_string(), "CSM Updated".to_string()]
    );
    assert!(!table.has_column("Unused"));
    assert_eq!(table.cell(1, "CSM Updated"), Some("bob"));
    println!("✓ Header trimmed, blank row and blank column dropped");
}

#[test]
fn test_editable_columns_are_backfilled() {
    let raw = grid(&[&["Id", "Remarks"], &["1", "pending"]]);
    let table = normalize(&raw, None);

    for column in EDITABLE_COLUMNS {
        assert!(table.has_column(column), "missing {}", column);
    }
    assert_eq!(table.cell(0, "Remarks"), Some("pending"));
    assert_eq!(table.cell(0, "Clearance Date"), Some(""));
    assert_eq!(table.cell(0, "Support Required"), Some(""));
}

#[test]
fn test_projection_keeps_order_and_skips_missing() {
    let raw = grid(&[
        &["Zone", "Extra", "CSM Names", "Date"],
        &["north", "x", "alice", "2025-01-01"],
    ]);
    let table = normalize(&raw, Some(&APPRECIATION_COLUMNS[..]));

    assert_eq!(
        &table.columns[..3],
        &["CSM Names".to_string(), "Date".to_string(), "Zone".to_string()]
    );
    assert!(!table.has_column("Extra"));
    assert_eq!(table.cell(0, "Zone"), Some("north"));
}

#[test]
fn test_projection_keeps_role_columns() {
    let raw = grid(&[
        &["Id", "Internal Notes", "CSM Updated", "Nation"],
        &["t1", "skip me", "alice", "india"],
    ]);
    let table = normalize(&raw, Some(&APPRECIATION_COLUMNS[..]));

    assert_eq!(&table.columns[..3], &["Id", "CSM Updated", "Nation"]);
    assert!(!table.has_column("Internal Notes"));
    // absent role columns are not invented
    assert!(!table.has_column("All India"));
    assert_eq!(table.cell(0, "CSM Updated"), Some("alice"));
}

#[test]
fn test_duplicate_headers_stay_unique() {
    let raw = grid(&[&["Id", "Id "], &["1", "2"]]);
    let table = normalize(&raw, None);
    assert_eq!(table.columns[0], "Id");
    assert_eq!(table.columns[1], "Id (2)");
    assert_eq!(table.cell(0, "Id (2)"), Some("2"));
}

#[test]
fn test_ragged_rows_are_padded() {
    let raw = RawGrid::from_rows(vec![
        vec!["Id".into(), "Zone".into()],
        vec!["1".into()],
        vec!["2".into(), "south".into()],
    ]);
    assert_eq!(raw.width(), 2);
    let table = normalize(&raw, None);
    assert_eq!(table.cell(0, "Zone"), Some(""));
    assert_eq!(table.cell(1, "Zone"), Some("south"));
}

#[test]
fn test_missing_tab_fails_softly() {
    let client = MemorySheets::new();
    let (table, warning) = load_tab(&client, "Nope", None);

    assert!(table.is_empty());
    match warning {
        Some(DashboardError::SourceUnavailable { tab, .. }) => assert_eq!(tab, "Nope"),
        other => panic!("expected SourceUnavailable, got {:?}", other),
    }
    println!("✓ Missing tab yields an empty table and a warning");
}

#[test]
fn test_workbook_load_tolerates_partial_data() {
    let client = MemorySheets::new()
        .with_tab(
            "Complaint-Final",
            vec![vec!["Id", "CSM Updated"], vec!["1", "alice"]],
        )
        .with_tab("WCS-Final", vec![vec!["CSM Updated", "Nation"], vec!["alice", "india"]])
        .with_tab("Reorder", vec![vec!["", ""]]);

    let workbook = Workbook::load(&client);

    assert!(workbook.view(View::Complaint).is_some());
    assert!(workbook.view(View::DrawingHold).is_some());
    assert!(workbook.view(View::Reorder).is_none());
    assert!(workbook.view(View::OpenSites).is_none());
    assert_eq!(workbook.roster.cell(0, "CSM Updated"), Some("alice"));
    // Reorder exists but is blank, so only the four absent tabs warn.
    assert_eq!(workbook.warnings.len(), 4);
    assert!(workbook.warnings.iter().any(|w| w.contains("Open-Sites-Final")));
}
