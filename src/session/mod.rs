pub mod grading;
pub mod storage;
pub mod types;

pub use grading::{GradingSession, SessionError};
pub use storage::{sheet_file_stem, GradeStore};
pub use types::{GradeRecord, GradeSheet, SHEET_VERSION};
