//! sheet2docx - Fill Word (.docx) report templates from spreadsheet data
//!
//! This crate reads a workbook (XLSX/XLS/ODS), turns its sheets into a
//! template context, and renders a `.docx` template with docxtpl-style tags.
//!
//! - The **variable sheet** holds one `name | value` pair per row. Each value is
//!   classified (empty, range text, number, text), numbers are formatted by
//!   the naming convention of their variable name, and numbers are styled
//!   (red by default) so they stand out in the generated document.
//! - Every other sheet is a **table sheet**: its first row names the columns and
//!   the remaining rows become a list that templates iterate with
//!   `{%tr for row in SheetName %}`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sheet2docx::ReportGeneratorBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a generator with the default (field-name-aware) policy
//!     let generator = ReportGeneratorBuilder::new().build()?;
//!
//!     let template = std::fs::read("template.docx")?;
//!     let workbook = std::fs::read("data.xlsx")?;
//!
//!     // The output file name comes from the `檔名` variable when present
//!     let report = generator.generate(&template, &workbook)?;
//!     report.save_in(".")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Custom Policy
//!
//! ```rust,no_run
//! use sheet2docx::{FormattingPolicy, ReportGeneratorBuilder, Rounding, VariableSheetRule};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Uniform styling: variable sheets are named `變數` or `Variables`,
//!     // numbers keep their original notation and are shown in bold red
//!     let generator = ReportGeneratorBuilder::new()
//!         .with_policy(FormattingPolicy::uniform())
//!         .with_variable_sheet(VariableSheetRule::Named(vec!["變數".to_string()]))
//!         .with_rounding(Rounding::HalfUp)
//!         .build()?;
//!
//!     let workbook = std::fs::read("data.xlsx")?;
//!     let context = generator.build_context(&workbook)?;
//!     println!("{}", serde_json::to_string_pretty(&context)?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Formatting Pipeline
//!
//! The pipeline pieces are public and pure, so they can be used on their own:
//!
//! ```rust
//! use sheet2docx::{classify_str, format_number, NumberRules, Rounding, ValueKind};
//!
//! let classified = classify_str("1234.5");
//! assert_eq!(classified.kind, ValueKind::Number);
//!
//! let text = format_number(1234.5, "1234.5", "cop_rate", NumberRules::FieldNameAware, Rounding::HalfEven);
//! assert_eq!(text, "1,234.50");
//!
//! // Date-like strings are never numbers
//! assert_eq!(classify_str("2023-01-01").kind, ValueKind::Text);
//! ```

mod api;
mod builder;
mod classify;
mod context;
mod display;
mod error;
mod formatter;
mod parser;
mod policy;
mod report;
mod security;
mod template;
mod types;

// 公開API
pub use api::{NumberRules, Rounding, TableCells, VariableSheetRule};
pub use builder::{ReportGenerator, ReportGeneratorBuilder};
pub use classify::{classify, classify_str};
pub use context::{assemble, Context};
pub use display::{build_display, render_value};
pub use error::ReportError;
pub use formatter::{format_number, select_rule, FormatRule};
pub use parser::{WorkbookReader, DEFAULT_MISSING_MARKERS};
pub use policy::{FormattingPolicy, PolicyConfig, Preset};
pub use report::{
    derive_file_name, GeneratedReport, DEFAULT_FILE_NAME, FILE_NAME_KEY, STYLED_FALLBACK_FILE_NAME,
};
pub use security::SecurityConfig;
pub use template::DocxTemplate;
pub use types::{
    CellValue, ClassifiedValue, ContextValue, FormattedValue, SheetData, TableRow, TextStyle,
    ValueKind,
};
