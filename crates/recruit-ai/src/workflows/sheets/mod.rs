//! Spreadsheet-backed candidate store: CSV table handling plus local-file and Google
//! Drive backends.

pub mod drive;
pub mod store;
pub mod table;

pub use drive::{status_error, DriveConnector, DriveSheetBackend};
pub use store::{FileSheetBackend, SheetBackend, SheetCandidateStore};
pub use table::{SheetTable, STANDARD_COLUMNS};
