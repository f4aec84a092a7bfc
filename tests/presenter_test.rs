use std::collections::HashMap;

use chrono::NaiveDate;
use csm_dashboard::presenter::{
    CellEdit, RowStyle, apply_edits, canonical_date, classify, collect_edits, edit_field,
    parse_edit_field, present, row_key, row_key_field,
};
use csm_dashboard::schema::View;
use csm_dashboard::{EditError, Table};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn tickets() -> Table {
    Table::new(
        vec![
            "Id".into(),
            "Ticket Ageing".into(),
            "Clearance Date".into(),
            "Remarks".into(),
            "Support Required".into(),
        ],
        vec![
            vec!["t1".into(), "5".into(), "".into(), "".into(), "".into()],
            vec!["t2".into(), "20".into(), "2025-01-02".into(), "old".into(), "".into()],
            vec!["t3".into(), "unknown".into(), "".into(), "".into(), "".into()],
        ],
    )
}

fn edit(row: usize, column: &str, value: &str) -> CellEdit {
    CellEdit {
        row,
        column: column.to_string(),
        value: value.to_string(),
    }
}

#[test]
fn test_classify_against_thresholds() {
    let t = tickets();
    assert_eq!(classify(View::Complaint, &t, 0), RowStyle::Fresh);
    assert_eq!(classify(View::Complaint, &t, 1), RowStyle::Stale);
    assert_eq!(classify(View::Complaint, &t, 2), RowStyle::Plain);
    // Reorder has no threshold
    assert_eq!(classify(View::Reorder, &t, 0), RowStyle::Plain);
}

#[test]
fn test_classify_site_threshold_is_25() {
    let t = Table::new(
        vec!["Aging".into()],
        vec![vec!["24".into()], vec!["25".into()]],
    );
    assert_eq!(classify(View::OpenSites, &t, 0), RowStyle::Fresh);
    assert_eq!(classify(View::OpenSites, &t, 1), RowStyle::Stale);
    assert_eq!(classify(View::StockLiquidation, &t, 1), RowStyle::Stale);
    // FG Status sorts by age but is never tinted
    assert_eq!(classify(View::FgStatus, &t, 1), RowStyle::Plain);
}

#[test]
fn test_present_marks_editable_cells() {
    let p = present(View::Complaint, &tickets(), today());

    assert_eq!(p.row_count, 3);
    assert_eq!(p.min_date, "2025-03-10");
    let editable: Vec<&str> = p
        .headers
        .iter()
        .filter(|h| h.editable)
        .map(|h| h.name.as_str())
        .collect();
    assert_eq!(editable, vec!["Clearance Date", "Remarks", "Support Required"]);

    let row = &p.rows[1];
    assert_eq!(row.style, RowStyle::Stale);
    assert_eq!(row.cells[0].class, "stale");
    assert_eq!(row.cells[2].input, "date");
    assert_eq!(row.cells[2].value, "2025-01-02");
    assert_eq!(row.cells[2].class, "");
    assert_eq!(row.cells[3].field, edit_field(1, 3));
}

#[test]
fn test_edit_field_round_trip() {
    assert_eq!(parse_edit_field(&edit_field(12, 3)), Some((12, 3)));
    assert_eq!(parse_edit_field("row_count"), None);
    assert_eq!(parse_edit_field("cell-x-1"), None);
}

#[test]
fn test_canonical_date_forms() {
    assert_eq!(canonical_date("2025-04-01").as_deref(), Some("2025-04-01"));
    assert_eq!(canonical_date("2025-04-01 00:00:00").as_deref(), Some("2025-04-01"));
    assert_eq!(canonical_date("04/01/2025").as_deref(), Some("2025-04-01"));
    assert_eq!(canonical_date("1-Apr-2025").as_deref(), Some("2025-04-01"));
    assert_eq!(canonical_date("soon"), None);
}

#[test]
fn test_apply_edits_overwrites_whitelisted_columns() {
    let t = tickets();
    let edited = apply_edits(
        &t,
        &[
            edit(0, "Remarks", "called customer"),
            edit(0, "Clearance Date", "2025-03-12"),
            edit(2, "Support Required", "yes"),
        ],
        today(),
    )
    .unwrap();

    assert_eq!(edited.cell(0, "Remarks"), Some("called customer"));
    assert_eq!(edited.cell(0, "Clearance Date"), Some("2025-03-12"));
    assert_eq!(edited.cell(2, "Support Required"), Some("yes"));
    assert_eq!(edited.cell(0, "Id"), Some("t1"));
    // the input is untouched
    assert_eq!(t.cell(0, "Remarks"), Some(""));
}

#[test]
fn test_apply_edits_rejects_read_only_columns() {
    let result = apply_edits(&tickets(), &[edit(0, "Ticket Ageing", "1")], today());
    assert_eq!(result, Err(EditError::ReadOnlyColumn("Ticket Ageing".into())));
}

#[test]
fn test_apply_edits_rejects_out_of_range_row() {
    let result = apply_edits(&tickets(), &[edit(9, "Remarks", "x")], today());
    assert_eq!(result, Err(EditError::RowOutOfRange(9)));
}

#[test]
fn test_apply_edits_date_rules() {
    let t = tickets();

    let past = apply_edits(&t, &[edit(0, "Clearance Date", "2025-03-09")], today());
    assert_eq!(past, Err(EditError::DateBeforeToday("2025-03-09".into())));

    let bad = apply_edits(&t, &[edit(0, "Clearance Date", "tomorrow")], today());
    assert_eq!(bad, Err(EditError::InvalidDate("tomorrow".into())));

    // an unchanged past date is resubmitted with the rest of the form
    let kept = apply_edits(&t, &[edit(1, "Clearance Date", "2025-01-02")], today()).unwrap();
    assert_eq!(kept.cell(1, "Clearance Date"), Some("2025-01-02"));

    let cleared = apply_edits(&t, &[edit(1, "Clearance Date", "")], today()).unwrap();
    assert_eq!(cleared.cell(1, "Clearance Date"), Some(""));

    let same_day = apply_edits(&t, &[edit(0, "Clearance Date", "2025-03-10")], today());
    assert!(same_day.is_ok());
}

#[test]
fn test_unparseable_date_survives_untouched_resubmit() {
    let t = Table::new(
        vec!["Id".into(), "Clearance Date".into(), "Remarks".into()],
        vec![vec!["t1".into(), "15.03.2025".into(), "".into()]],
    );
    let p = present(View::Reorder, &t, today());
    let shown = &p.rows[0].cells[1];
    assert_eq!(shown.value, "");

    // the form sends back what was shown
    let saved = apply_edits(&t, &[edit(0, "Clearance Date", &shown.value)], today()).unwrap();
    assert_eq!(saved.cell(0, "Clearance Date"), Some("15.03.2025"));

    let replaced = apply_edits(&t, &[edit(0, "Clearance Date", "2025-03-11")], today()).unwrap();
    assert_eq!(replaced.cell(0, "Clearance Date"), Some("2025-03-11"));
}

/// Form fields as the dashboard page would submit them for `table`.
fn submitted(table: &Table, rows: &[usize]) -> HashMap<String, String> {
    let mut form = HashMap::new();
    form.insert("row_count".to_string(), table.len().to_string());
    for &row in rows {
        form.insert(row_key_field(row), row_key(table, row));
    }
    form
}

#[test]
fn test_collect_edits_maps_fields_to_columns() {
    let t = tickets();
    let mut form = submitted(&t, &[0, 1, 2]);
    form.insert(edit_field(0, 3), "done".to_string());
    form.insert(edit_field(0, 9), "ignored".to_string());

    let edits = collect_edits(&t, &form).unwrap();
    assert_eq!(edits, vec![edit(0, "Remarks", "done")]);
}

#[test]
fn test_collect_edits_rejects_reordered_rows() {
    let shown = tickets();
    let mut form = submitted(&shown, &[0, 1, 2]);
    form.insert(edit_field(0, 3), "called t1".to_string());

    // same row count, t2 now first
    let mut reloaded = shown.clone();
    reloaded.rows.swap(0, 1);

    assert_eq!(collect_edits(&reloaded, &form), Err(EditError::StaleRow(0)));
    assert!(collect_edits(&shown, &form).is_ok());
}

#[test]
fn test_row_key_ignores_editable_cells() {
    let t = tickets();
    let edited = apply_edits(&t, &[edit(1, "Remarks", "new")], today()).unwrap();
    assert_eq!(row_key(&t, 1), row_key(&edited, 1));
    assert_ne!(row_key(&t, 0), row_key(&t, 1));

    let mut form = submitted(&t, &[]);
    form.insert(edit_field(1, 3), "x".to_string());
    assert_eq!(collect_edits(&t, &form), Err(EditError::StaleRow(1)));
}
