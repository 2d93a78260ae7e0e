//! Context Assembler Module
//!
//! 読み込んだ全シートから、テンプレートに渡す変数マップ（コンテキスト）を組み立てる。
//!
//! - 変数シート: 1列目を変数名、2列目を値として1行1エントリ
//! - 表シート: 1行目を列見出しとし、残りの行をシート名のエントリに行リストとして格納

use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use log::{debug, info, warn};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::api::TableCells;
use crate::display::render_value;
use crate::error::ReportError;
use crate::policy::FormattingPolicy;
use crate::types::{CellValue, ContextValue, FormattedValue, SheetData, TableRow};

/// テンプレートに渡す変数マップ
///
/// キーは一意で、同じキーへの書き込みは後勝ち。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Context {
    entries: BTreeMap<String, ContextValue>,
}

impl Context {
    /// 空のコンテキストを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// エントリを追加
    ///
    /// # 戻り値
    ///
    /// 同じキーのエントリが既に存在した場合は、置き換えられた値
    pub fn insert(&mut self, key: impl Into<String>, value: ContextValue) -> Option<ContextValue> {
        self.entries.insert(key.into(), value)
    }

    /// エントリを取得
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    /// 単一値のエントリを取得
    pub fn scalar(&self, key: &str) -> Option<&FormattedValue> {
        match self.entries.get(key) {
            Some(ContextValue::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    /// 行リストのエントリを取得
    pub fn table(&self, key: &str) -> Option<&[TableRow]> {
        match self.entries.get(key) {
            Some(ContextValue::Table(rows)) => Some(rows),
            _ => None,
        }
    }

    /// エントリ数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// エントリが存在しないかどうか
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// キー順にエントリを走査
    pub fn iter(&self) -> btree_map::Iter<'_, String, ContextValue> {
        self.entries.iter()
    }

    /// エントリの一覧を Markdown 形式の表として出力
    ///
    /// 列幅は表示幅（全角文字は2）で揃える。
    ///
    /// # 引数
    ///
    /// * `writer` - 出力先のライター
    pub fn write_summary<W: Write>(&self, writer: &mut W) -> Result<(), ReportError> {
        let mut lines = vec![[
            "Key".to_string(),
            "Kind".to_string(),
            "Value".to_string(),
        ]];
        for (key, value) in &self.entries {
            let (kind, preview) = match value {
                ContextValue::Scalar(FormattedValue::Plain(text)) => ("plain", text.clone()),
                ContextValue::Scalar(FormattedValue::Styled { text, style }) => {
                    let kind = if style.bold { "styled (bold)" } else { "styled" };
                    (kind, format!("{} #{}", text, style.color))
                }
                ContextValue::Table(rows) => ("table", format!("{} rows", rows.len())),
            };
            lines.push([key.clone(), kind.to_string(), single_line(&preview)]);
        }

        // 最小幅は3文字（区切り行の最小幅）
        let mut widths = [3usize; 3];
        for line in &lines {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.width());
            }
        }

        for (index, line) in lines.iter().enumerate() {
            write!(writer, "|")?;
            for (cell, &width) in line.iter().zip(&widths) {
                let padding = width.saturating_sub(cell.width());
                write!(writer, " {}{} |", cell, " ".repeat(padding))?;
            }
            writeln!(writer)?;

            if index == 0 {
                write!(writer, "|")?;
                for &width in &widths {
                    write!(writer, "{}|", "-".repeat(width + 2))?;
                }
                writeln!(writer)?;
            }
        }

        writer.flush()?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Context {
    type Item = (&'a String, &'a ContextValue);
    type IntoIter = btree_map::Iter<'a, String, ContextValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// 改行を空白に置き換える（一覧表示用）
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// 全シートからコンテキストを組み立てる
///
/// # 引数
///
/// * `sheets` - ブック内の順序どおりのシート一覧
/// * `policy` - 整形ポリシー
///
/// # 戻り値
///
/// 組み立てたコンテキスト。この処理は失敗しない（解釈できない値は文字列として扱う）。
pub fn assemble(sheets: &[SheetData], policy: &FormattingPolicy) -> Context {
    let mut context = Context::new();

    for (index, sheet) in sheets.iter().enumerate() {
        if policy.variable_sheet.is_variable_sheet(index, &sheet.name) {
            let count = assemble_variables(sheet, policy, &mut context);
            debug!(
                "Sheet '{}' (index {}) read as variable sheet: {} entries",
                sheet.name, index, count
            );
        } else {
            let rows = assemble_table(sheet, policy);
            debug!(
                "Sheet '{}' (index {}) read as table sheet: {} rows",
                sheet.name,
                index,
                rows.len()
            );
            insert_entry(&mut context, sheet.name.clone(), ContextValue::Table(rows));
        }
    }

    info!(
        "Assembled context with {} entries from {} sheets",
        context.len(),
        sheets.len()
    );
    context
}

/// 変数シートの各行をエントリとして追加
///
/// # 戻り値
///
/// 追加したエントリ数
fn assemble_variables(sheet: &SheetData, policy: &FormattingPolicy, context: &mut Context) -> usize {
    let mut count = 0;

    for (row_index, row) in sheet.rows.iter().enumerate() {
        let name = row
            .first()
            .map(|cell| cell.to_raw_string().trim().to_string())
            .unwrap_or_default();
        let raw = row.get(1).unwrap_or(&CellValue::Empty);

        if name.is_empty() {
            if !raw.is_empty() {
                warn!(
                    "Sheet '{}' row {}: value without a variable name was skipped",
                    sheet.name,
                    row_index + 1
                );
            }
            continue;
        }

        let value = render_value(raw, &name, policy);
        insert_entry(context, name, ContextValue::Scalar(value));
        count += 1;
    }

    count
}

/// 表シートを行リストに変換
///
/// 1行目を列見出しとし、全列が空の行は除外する。
fn assemble_table(sheet: &SheetData, policy: &FormattingPolicy) -> Vec<TableRow> {
    let Some((header_row, data_rows)) = sheet.rows.split_first() else {
        return Vec::new();
    };

    let width = sheet.rows.iter().map(Vec::len).max().unwrap_or(0);
    let headers = normalize_headers(header_row, width);

    data_rows
        .iter()
        .filter(|row| !row.iter().all(CellValue::is_empty))
        .map(|row| {
            let mut table_row = TableRow::new();
            for (col, header) in headers.iter().enumerate() {
                let raw = row.get(col).unwrap_or(&CellValue::Empty);
                let value = match policy.table_cells {
                    TableCells::Raw => FormattedValue::plain(raw.to_raw_string()),
                    TableCells::Formatted => render_value(raw, header, policy),
                };
                table_row.push(header.clone(), value);
            }
            table_row
        })
        .collect()
}

/// 列見出しを正規化する
///
/// - 前後の空白を除去
/// - 空の見出しは `Unnamed: <列番号>`（0始まり）
/// - 重複する見出しは2つ目以降に `.1`, `.2`, … を付加
fn normalize_headers(header_row: &[CellValue], width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::with_capacity(width);

    for col in 0..width {
        let raw = header_row
            .get(col)
            .map(|cell| cell.to_raw_string().trim().to_string())
            .unwrap_or_default();
        let base = if raw.is_empty() {
            format!("Unnamed: {}", col)
        } else {
            raw
        };

        let mut header = base.clone();
        while let Some(count) = seen.get_mut(&header) {
            *count += 1;
            header = format!("{}.{}", base, count);
        }
        seen.insert(header.clone(), 0);
        headers.push(header);
    }

    headers
}

/// エントリを追加し、上書きが発生した場合は警告を出す
fn insert_entry(context: &mut Context, key: String, value: ContextValue) {
    if context.insert(key.clone(), value).is_some() {
        warn!("Duplicate context key '{}': the later value wins", key);
    }
}
