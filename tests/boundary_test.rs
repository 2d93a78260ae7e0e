//! Boundary Tests for sheet2docx
//!
//! 空のシート、欠損値、列見出しの正規化など境界条件を検証する。

use rust_xlsxwriter::*;
use sheet2docx::{
    ContextValue, FormattedValue, ReportError, ReportGeneratorBuilder, TextStyle,
    VariableSheetRule, WorkbookReader, DEFAULT_FILE_NAME,
};

// Helper module for generating boundary test fixtures
mod fixtures {
    use super::*;

    /// 空のシートが1枚だけのワークブック
    pub fn generate_empty_workbook() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        workbook.add_worksheet();
        workbook.save_to_buffer()
    }

    /// 欠損値表記を含むワークブック
    pub fn generate_missing_markers() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();

        let variables = workbook.add_worksheet();
        variables.write_string(0, 0, "備註")?;
        variables.write_string(0, 1, "N/A")?;
        variables.write_string(1, 0, "狀態")?;
        variables.write_string(1, 1, "NA")?;
        variables.write_string(2, 0, "說明")?;
        variables.write_string(2, 1, " NA ")?;

        let table = workbook.add_worksheet();
        table.set_name("清單")?;
        table.write_string(0, 0, "名稱")?;
        table.write_string(0, 1, "數值")?;
        table.write_string(1, 0, "甲")?;
        table.write_string(1, 1, "NULL")?;

        workbook.save_to_buffer()
    }

    /// 空の見出し・重複する見出し・空行を含む表シート
    pub fn generate_irregular_table() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        workbook.add_worksheet();

        let table = workbook.add_worksheet();
        table.set_name("表")?;
        table.write_string(0, 0, "值")?;
        table.write_string(0, 2, "值")?;
        table.write_string(1, 0, "a")?;
        table.write_string(1, 1, "b")?;
        table.write_string(1, 2, "c")?;
        // 3行目は空行
        table.write_string(3, 0, "d")?;

        workbook.save_to_buffer()
    }

    /// A1から始まらない変数シート
    pub fn generate_offset_variables() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let variables = workbook.add_worksheet();
        variables.write_string(2, 0, "效率")?;
        variables.write_number(2, 1, 3.0)?;
        // 名前のない値は無視される
        variables.write_number(3, 1, 9.0)?;
        variables.write_string(4, 0, "效率")?;
        variables.write_number(4, 1, 5.0)?;
        workbook.save_to_buffer()
    }
}

#[test]
fn test_empty_workbook() {
    let workbook = fixtures::generate_empty_workbook().unwrap();
    let generator = ReportGeneratorBuilder::new().build().unwrap();

    let context = generator.build_context(&workbook).unwrap();
    assert!(context.is_empty());
}

#[test]
fn test_empty_table_sheet() {
    let workbook = fixtures::generate_empty_workbook().unwrap();
    let generator = ReportGeneratorBuilder::new()
        .with_variable_sheet(VariableSheetRule::default_names())
        .build()
        .unwrap();

    // 変数シートがなければ、空のシートも空の表になる
    let context = generator.build_context(&workbook).unwrap();
    assert_eq!(context.len(), 1);
    assert_eq!(context.table("Sheet1").map(|rows| rows.len()), Some(0));
}

#[test]
fn test_missing_markers_become_empty() {
    let workbook = fixtures::generate_missing_markers().unwrap();
    let generator = ReportGeneratorBuilder::new().build().unwrap();

    let context = generator.build_context(&workbook).unwrap();
    assert_eq!(context.scalar("備註"), Some(&FormattedValue::plain("")));
    assert_eq!(context.scalar("狀態"), Some(&FormattedValue::plain("")));
    assert_eq!(context.scalar("說明"), Some(&FormattedValue::plain("NA")));

    let rows = context.table("清單").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("數值"), Some(&FormattedValue::plain("")));
}

#[test]
fn test_custom_missing_markers() {
    let workbook = fixtures::generate_missing_markers().unwrap();
    let generator = ReportGeneratorBuilder::new()
        .with_missing_markers(vec!["N/A".to_string()])
        .build()
        .unwrap();

    let context = generator.build_context(&workbook).unwrap();
    assert_eq!(context.scalar("備註"), Some(&FormattedValue::plain("")));
    assert_eq!(context.scalar("狀態"), Some(&FormattedValue::plain("NA")));
}

#[test]
fn test_irregular_table_headers() {
    let workbook = fixtures::generate_irregular_table().unwrap();
    let generator = ReportGeneratorBuilder::new().build().unwrap();

    let context = generator.build_context(&workbook).unwrap();
    let rows = context.table("表").unwrap();
    assert_eq!(rows.len(), 2);

    let headers: Vec<&str> = rows[0].iter().map(|(header, _)| header).collect();
    assert_eq!(headers, vec!["值", "Unnamed: 1", "值.1"]);
    assert_eq!(rows[0].get("Unnamed: 1").map(|v| v.text()), Some("b"));
    assert_eq!(rows[0].get("值.1").map(|v| v.text()), Some("c"));
    assert_eq!(rows[1].get("值").map(|v| v.text()), Some("d"));
    assert_eq!(rows[1].get("值.1").map(|v| v.text()), Some(""));
}

#[test]
fn test_variables_read_from_first_cell() {
    let workbook = fixtures::generate_offset_variables().unwrap();
    let generator = ReportGeneratorBuilder::new().build().unwrap();

    let context = generator.build_context(&workbook).unwrap();
    // 同じ変数名は後の行が優先される
    assert_eq!(context.len(), 1);
    assert_eq!(
        context.get("效率"),
        Some(&ContextValue::Scalar(FormattedValue::styled(
            "5",
            TextStyle::red(false)
        )))
    );
}

#[test]
fn test_sheets_keep_workbook_order() {
    let workbook = fixtures::generate_irregular_table().unwrap();
    let sheets = WorkbookReader::new().read_all(&workbook).unwrap();

    let names: Vec<&str> = sheets.iter().map(|sheet| sheet.name.as_str()).collect();
    assert_eq!(names, vec!["Sheet1", "表"]);
    assert!(sheets[0].rows.is_empty());
    assert_eq!(sheets[1].rows.len(), 4);
}

#[test]
fn test_default_file_name_override() {
    let workbook = fixtures::generate_empty_workbook().unwrap();
    let generator = ReportGeneratorBuilder::new()
        .with_default_file_name("output.docx")
        .build()
        .unwrap();
    assert_eq!(generator.default_file_name(), "output.docx");

    let context = generator.build_context(&workbook).unwrap();
    assert_eq!(
        sheet2docx::derive_file_name(&context, generator.default_file_name()),
        "output.docx"
    );
    assert_eq!(
        sheet2docx::derive_file_name(&context, DEFAULT_FILE_NAME),
        DEFAULT_FILE_NAME
    );
}

#[test]
fn test_blank_default_file_name_is_rejected() {
    let result = ReportGeneratorBuilder::new()
        .with_default_file_name("  ")
        .build();
    assert!(matches!(result, Err(ReportError::Config(_))));
}

#[test]
fn test_corrupted_workbook() {
    let generator = ReportGeneratorBuilder::new().build().unwrap();
    let result = generator.build_context(b"PK\x03\x04 corrupted");
    assert!(result.is_err());
}
