use thiserror::Error;

/// Failures raised by a [`SheetClient`](crate::sheets::SheetClient) backend.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("worksheet not found: {0}")]
    TabNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("spreadsheet service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Error taxonomy of the dashboard pipeline.
///
/// None of these are fatal to the process: callers turn them into visible
/// warnings and degrade the affected view to an empty or static table.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// A named tab could not be read.
    #[error("Unable to load sheet: {tab}. ({source})")]
    SourceUnavailable {
        tab: String,
        #[source]
        source: SheetError,
    },

    /// An expected column is absent from a table.
    #[error("Column '{column}' not found in data for {table}.")]
    SchemaMismatch { table: String, column: String },

    #[error("Please enter a valid Logic ID.")]
    MissingIdentity,

    /// The entered identity is not in the roster for the selected role.
    #[error("Invalid Logic ID. Try again.")]
    AuthFailure,

    /// The write-back call failed; carries the underlying message verbatim.
    #[error("Error saving data: {0}")]
    PersistFailure(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Rejections of user edits before they reach the persister.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("column '{0}' is read-only")]
    ReadOnlyColumn(String),

    #[error("row {0} is out of range")]
    RowOutOfRange(usize),

    #[error("'{0}' is not a valid date")]
    InvalidDate(String),

    #[error("clearance date {0} is before today")]
    DateBeforeToday(String),

    #[error("row {0} changed since it was displayed, refresh and try again")]
    StaleRow(usize),
}
