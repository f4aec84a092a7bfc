use crate::sheets;
use crate::table::Table;

/// Convert a table to CSV, header row first.
///
/// # Examples
/// ```
/// use csm_dashboard::downloader::to_csv;
/// use csm_dashboard::table::Table;
///
/// let table = Table::new(
///     vec!["Id".into(), "Remarks".into()],
///     vec![vec!["7".into(), "call back, urgent".into()]],
/// );
/// assert_eq!(to_csv(&table), "Id,Remarks\n7,\"call back, urgent\"\n");
/// ```
pub fn to_csv(table: &Table) -> String {
    sheets::to_csv(&table.to_grid())
}

/// Convert a table to an XLSX workbook with a single worksheet.
///
/// Every cell is written as a string; the header row is bold.
#[cfg(feature = "web")]
pub fn to_xlsx(table: &Table, sheet_name: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    use rust_xlsxwriter::{Format, Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(xlsx_sheet_name(sheet_name))?;

    let bold = Format::new().set_bold();
    for (c, name) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, name, &bold)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string((r + 1) as u32, c as u16, value)?;
            }
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

/// Worksheet names are limited to 31 characters and may not contain `[]:*?/\`.
pub fn xlsx_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .take(31)
        .collect();
    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}
