//! Parser Module
//!
//! calamineを使用したワークブック読み込みの実装。

mod workbook;

pub use workbook::{WorkbookReader, DEFAULT_MISSING_MARKERS};
