//! Workbook Reader
//!
//! calamineを使用してワークブックの全シートを読み込み、
//! A1起点の矩形データ（[`SheetData`]）に変換します。

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use log::debug;
use std::io::{Cursor, Read};

use crate::error::ReportError;
use crate::security::SecurityConfig;
use crate::types::{CellValue, SheetData};

/// 欠損値として扱う文字列の既定値
///
/// 一般的な表計算データ処理で欠損とみなされる表記をそのまま採用している。
pub const DEFAULT_MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// ワークブックリーダー
///
/// XLSX / XLS / ODS をcalamineの自動判別で読み込みます。
#[derive(Debug, Clone)]
pub struct WorkbookReader {
    /// 欠損値として扱う文字列（完全一致）
    missing_markers: Vec<String>,
    /// 入力サイズの上限
    security: SecurityConfig,
}

impl Default for WorkbookReader {
    fn default() -> Self {
        Self {
            missing_markers: DEFAULT_MISSING_MARKERS.iter().map(|s| s.to_string()).collect(),
            security: SecurityConfig::default(),
        }
    }
}

impl WorkbookReader {
    /// 既定の欠損値表記でリーダーを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 欠損値として扱う文字列を設定
    pub fn with_missing_markers(mut self, markers: Vec<String>) -> Self {
        self.missing_markers = markers;
        self
    }

    /// セキュリティ設定を指定
    pub fn with_security_config(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// リーダーから全シートを読み込む
    ///
    /// # 引数
    ///
    /// * `reader` - ワークブックのバイト列を読み込むためのリーダー
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<SheetData>)` - ブック内の順序どおりのシート一覧
    /// * `Err(ReportError)` - 読み込みまたは解析に失敗した場合
    pub fn read_from<R: Read>(&self, mut reader: R) -> Result<Vec<SheetData>, ReportError> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        self.read_all(&buffer)
    }

    /// バイト列から全シートを読み込む
    ///
    /// # 引数
    ///
    /// * `bytes` - ワークブックのバイト列
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<SheetData>)` - ブック内の順序どおりのシート一覧
    /// * `Err(ReportError::Parse)` - ワークブックとして解析できない場合
    /// * `Err(ReportError::SecurityViolation)` - 入力サイズが上限を超える場合
    pub fn read_all(&self, bytes: &[u8]) -> Result<Vec<SheetData>, ReportError> {
        self.security.check_input_size("Workbook", bytes.len())?;

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let sheet_names = workbook.sheet_names().to_vec();

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in sheet_names {
            let range = workbook.worksheet_range(&name)?;
            let rows = self.range_to_rows(&range);
            debug!(
                "Read sheet '{}': {} rows x {} columns",
                name,
                rows.len(),
                rows.first().map(Vec::len).unwrap_or(0)
            );
            sheets.push(SheetData::new(name, rows));
        }

        Ok(sheets)
    }

    /// セル範囲をA1起点の行データに変換
    ///
    /// calamineの範囲は最初に値があるセルから始まるため、
    /// 絶対座標 (0, 0) から範囲の終端までを読み直す。
    fn range_to_rows(&self, range: &Range<Data>) -> Vec<Vec<CellValue>> {
        let Some((end_row, end_col)) = range.end() else {
            return Vec::new();
        };

        (0..=end_row)
            .map(|row| {
                (0..=end_col)
                    .map(|col| match range.get_value((row, col)) {
                        Some(cell) => self.convert_cell(cell),
                        None => CellValue::Empty,
                    })
                    .collect()
            })
            .collect()
    }

    /// calamineのセル値を変換
    fn convert_cell(&self, cell: &Data) -> CellValue {
        let value = match cell {
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) => CellValue::String(s.clone()),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(datetime) if !dt.is_duration() => CellValue::DateTime(datetime),
                _ => CellValue::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
            Data::Error(e) => CellValue::Error(e.to_string()),
            Data::Empty => CellValue::Empty,
        };

        match &value {
            CellValue::String(s) | CellValue::Error(s) if self.is_missing(s) => CellValue::Empty,
            _ => value,
        }
    }

    /// 欠損値表記かどうか
    fn is_missing(&self, text: &str) -> bool {
        self.missing_markers.iter().any(|marker| marker == text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;

    #[test]
    fn test_convert_cell_values() {
        let reader = WorkbookReader::new();
        assert_eq!(reader.convert_cell(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(reader.convert_cell(&Data::Float(3.5)), CellValue::Number(3.5));
        assert_eq!(reader.convert_cell(&Data::Bool(true)), CellValue::Bool(true));
        assert_eq!(
            reader.convert_cell(&Data::String("正常".to_string())),
            CellValue::from("正常")
        );
        assert_eq!(
            reader.convert_cell(&Data::Error(CellErrorType::Div0)),
            CellValue::Error("#DIV/0!".to_string())
        );
        assert_eq!(reader.convert_cell(&Data::Empty), CellValue::Empty);
    }

    #[test]
    fn test_missing_markers() {
        let reader = WorkbookReader::new();
        for marker in ["N/A", "NULL", "nan", "<NA>", ""] {
            assert_eq!(
                reader.convert_cell(&Data::String(marker.to_string())),
                CellValue::Empty,
                "{} should be missing",
                marker
            );
        }
        assert_eq!(
            reader.convert_cell(&Data::Error(CellErrorType::NA)),
            CellValue::Empty
        );
        // 前後に空白がある場合は欠損値としない
        assert_eq!(
            reader.convert_cell(&Data::String(" NA ".to_string())),
            CellValue::from(" NA ")
        );
    }

    #[test]
    fn test_custom_missing_markers() {
        let reader = WorkbookReader::new().with_missing_markers(vec!["-".to_string()]);
        assert_eq!(reader.convert_cell(&Data::String("-".to_string())), CellValue::Empty);
        assert_eq!(
            reader.convert_cell(&Data::String("NA".to_string())),
            CellValue::from("NA")
        );
    }

    #[test]
    fn test_range_is_anchored_at_a1() {
        let mut range: Range<Data> = Range::new((1, 1), (2, 2));
        range.set_value((1, 1), Data::String("名稱".to_string()));
        range.set_value((2, 2), Data::Float(1.5));

        let rows = WorkbookReader::new().range_to_rows(&range);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.len() == 3));
        assert_eq!(rows[0], vec![CellValue::Empty; 3]);
        assert_eq!(rows[1][1], CellValue::from("名稱"));
        assert_eq!(rows[2][2], CellValue::Number(1.5));
        assert_eq!(rows[2][0], CellValue::Empty);
    }

    #[test]
    fn test_empty_range() {
        let range: Range<Data> = Range::empty();
        assert!(WorkbookReader::new().range_to_rows(&range).is_empty());
    }

    #[test]
    fn test_invalid_bytes() {
        let result = WorkbookReader::new().read_all(b"not a workbook");
        assert!(result.is_err());
    }

    #[test]
    fn test_input_size_limit() {
        let reader = WorkbookReader::new().with_security_config(SecurityConfig {
            max_input_file_size: 4,
            ..SecurityConfig::default()
        });
        assert!(matches!(
            reader.read_all(b"12345"),
            Err(ReportError::SecurityViolation(_))
        ));
    }
}
