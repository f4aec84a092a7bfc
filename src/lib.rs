/*!
# CSM Daily Action

A role-gated dashboard over a shared spreadsheet, built in Rust.

## Overview

Customer service managers log in with the identity ("Logic ID") listed for
them in the roster, pick one of seven views, and see only the rows assigned
to them. Rows are sorted by age and tinted fresh or stale. Three columns
(clearance date, remarks, support required) can be edited inline; saving
writes the edited rows to a companion "Clear" worksheet and never to the
worksheet that was read.

## Pipeline

```text
SheetClient -> loader -> access -> presenter (human edits) -> persister -> SheetClient
```

- **sheets**: backend boundary (`SheetClient`) with in-memory and CSV directory
  backends; **google** adds Google Sheets behind the `web` feature
- **loader**: header promotion, blank row/column stripping, column backfill,
  soft failure per worksheet, the loaded `Workbook`
- **access**: roster identities, ownership filter, age sort, display filters,
  summary counts
- **presenter**: row classification, template view model, edit validation
- **persister**: clear-sheet naming and full overwrite
- **session**: explicit session context and the cookie-keyed store
- **downloader**: CSV/XLSX export of the displayed table
- **app**: routing and middleware (`web` feature)

## Design Highlights

- No ambient globals: the session context is a value passed to each step
- Every failure is non-fatal; an unreadable worksheet becomes an empty view
- Edits are limited to a whitelist enforced server-side
*/

pub mod access;
pub mod config;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod persister;
pub mod presenter;
pub mod schema;
pub mod session;
pub mod sheets;
pub mod table;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod google;

pub use error::{DashboardError, EditError, SheetError};
pub use schema::{Role, View};
pub use table::{RawGrid, Table};
