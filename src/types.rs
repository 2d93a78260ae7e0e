//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。
//!
//! - 入力側: [`CellValue`], [`SheetData`]（ワークブックリーダーが生成）
//! - 分類結果: [`ValueKind`], [`ClassifiedValue`]
//! - 出力側: [`TextStyle`], [`FormattedValue`], [`TableRow`], [`ContextValue`]

use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// 日時セルを文字列化する際の書式
pub(crate) const DATETIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// セルの値を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 数値（f64）
    Number(f64),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// 日時（日付書式のセル）
    DateTime(NaiveDateTime),

    /// エラー値（例: #DIV/0!）
    Error(String),

    /// 空セル
    Empty,
}

impl CellValue {
    /// 値が空かどうかを判定
    ///
    /// 空文字列のセルも空として扱う。空白のみの文字列は空ではない
    /// （行の削除判定では値として残り、分類時に `Empty` となる）。
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// 値を文字列として取得（書式適用前）
    ///
    /// 整数値の数値は小数点なしで出力される（`3.0` → `"3"`）。
    /// 真偽値は `True` / `False`。
    pub fn to_raw_string(&self) -> String {
        match self {
            CellValue::Number(n) => n.to_string(),
            CellValue::String(s) => s.clone(),
            CellValue::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            CellValue::DateTime(dt) => dt.format(DATETIME_DISPLAY_FORMAT).to_string(),
            CellValue::Error(e) => e.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// ワークブックから読み込まれた1シート分のデータ
///
/// `rows` は A1 起点の矩形データで、存在しないセルは [`CellValue::Empty`]。
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    /// シート名
    pub name: String,

    /// 行データ（行 × 列）
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetData {
    /// 新しいシートデータを生成
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// 値の分類タグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueKind {
    /// 値なし、または空白のみ
    Empty,

    /// `~` / `～` を含む範囲表記（整形済みテキストとして扱う）
    RangeText,

    /// 数値（符号は `ClassifiedValue::number` が保持する）
    Number,

    /// 上記以外（日付らしき文字列を含む）
    Text,
}

/// 分類結果
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedValue {
    /// 分類タグ
    pub kind: ValueKind,

    /// 前後の空白を除いた元の文字列
    pub original: String,

    /// 数値として解釈できた場合の値
    pub number: Option<f64>,
}

impl ClassifiedValue {
    /// 空の分類結果
    pub fn empty() -> Self {
        Self {
            kind: ValueKind::Empty,
            original: String::new(),
            number: None,
        }
    }

    /// 負の数値かどうか
    pub fn is_negative(&self) -> bool {
        matches!(self.number, Some(n) if n.is_sign_negative())
    }
}

/// 文字の装飾（色・太字）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyle {
    /// 16進6桁のRGBカラー（例: `FF0000`）
    pub color: String,

    /// 太字かどうか
    #[serde(default)]
    pub bold: bool,
}

impl TextStyle {
    /// 新しい装飾を生成
    pub fn new(color: impl Into<String>, bold: bool) -> Self {
        Self {
            color: color.into(),
            bold,
        }
    }

    /// 赤字
    pub fn red(bold: bool) -> Self {
        Self::new("FF0000", bold)
    }

    /// 黒字・太字なし
    pub fn black() -> Self {
        Self::new("000000", false)
    }

    /// 色が16進6桁として妥当かを判定
    pub(crate) fn has_valid_color(&self) -> bool {
        self.color.len() == 6 && self.color.chars().all(|c| c.is_ascii_hexdigit())
    }
}

/// 表示用に整形された値
///
/// テンプレート側では `{{r name}}` で装飾付きのランとして展開される。
/// 装飾付きの値からプレーンテキストを取り出す処理（ファイル名の決定など）は、
/// このタグでパターンマッチして分岐する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FormattedValue {
    /// 装飾なしの文字列
    Plain(String),

    /// 装飾付きの文字列
    Styled {
        /// 表示文字列
        text: String,
        /// 装飾
        #[serde(flatten)]
        style: TextStyle,
    },
}

impl FormattedValue {
    /// 装飾なしの値を生成
    pub fn plain(text: impl Into<String>) -> Self {
        FormattedValue::Plain(text.into())
    }

    /// 装飾付きの値を生成
    pub fn styled(text: impl Into<String>, style: TextStyle) -> Self {
        FormattedValue::Styled {
            text: text.into(),
            style,
        }
    }

    /// 表示文字列を取得
    pub fn text(&self) -> &str {
        match self {
            FormattedValue::Plain(text) => text,
            FormattedValue::Styled { text, .. } => text,
        }
    }

    /// 装飾を取得
    pub fn style(&self) -> Option<&TextStyle> {
        match self {
            FormattedValue::Plain(_) => None,
            FormattedValue::Styled { style, .. } => Some(style),
        }
    }
}

/// 表シートの1行（列見出し → 値、列順を保持）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    fields: Vec<(String, FormattedValue)>,
}

impl TableRow {
    /// 空の行を生成
    pub fn new() -> Self {
        Self::default()
    }

    /// 列を追加
    pub fn push(&mut self, header: impl Into<String>, value: FormattedValue) {
        self.fields.push((header.into(), value));
    }

    /// 列見出しで値を取得
    pub fn get(&self, header: &str) -> Option<&FormattedValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == header)
            .map(|(_, value)| value)
    }

    /// 列数
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 列が存在しないかどうか
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 列を順に走査
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormattedValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for TableRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// コンテキストの値
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// 変数シートの単一値
    Scalar(FormattedValue),

    /// 表シートの行リスト
    Table(Vec<TableRow>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_cell_value_is_empty() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::String(String::new()).is_empty());
        assert!(!CellValue::String(" ".to_string()).is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
        assert!(!CellValue::Bool(false).is_empty());
    }

    #[test]
    fn test_cell_value_to_raw_string() {
        assert_eq!(CellValue::Empty.to_raw_string(), "");
        assert_eq!(CellValue::Number(42.5).to_raw_string(), "42.5");
        assert_eq!(CellValue::Number(3.0).to_raw_string(), "3");
        assert_eq!(CellValue::Number(-12.0).to_raw_string(), "-12");
        assert_eq!(CellValue::from("正常").to_raw_string(), "正常");
        assert_eq!(CellValue::Bool(true).to_raw_string(), "True");
        assert_eq!(CellValue::Bool(false).to_raw_string(), "False");
        assert_eq!(
            CellValue::Error("#DIV/0!".to_string()).to_raw_string(),
            "#DIV/0!"
        );
    }

    #[test]
    fn test_datetime_raw_string_is_dash_separated() {
        let dt = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            CellValue::DateTime(dt).to_raw_string(),
            "2023-01-01 00:00:00"
        );
    }

    #[test]
    fn test_text_style_color_validation() {
        assert!(TextStyle::red(true).has_valid_color());
        assert!(TextStyle::new("00ff7A", false).has_valid_color());
        assert!(!TextStyle::new("red", false).has_valid_color());
        assert!(!TextStyle::new("#FF0000", false).has_valid_color());
    }

    #[test]
    fn test_formatted_value_accessors() {
        let plain = FormattedValue::plain("正常");
        assert_eq!(plain.text(), "正常");
        assert!(plain.style().is_none());

        let styled = FormattedValue::styled("1,234", TextStyle::red(false));
        assert_eq!(styled.text(), "1,234");
        assert_eq!(styled.style(), Some(&TextStyle::red(false)));
    }

    #[test]
    fn test_table_row_keeps_column_order() {
        let mut row = TableRow::new();
        row.push("型號", FormattedValue::plain("A-1"));
        row.push("台數", FormattedValue::plain("2"));

        let headers: Vec<&str> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(headers, vec!["型號", "台數"]);
        assert_eq!(row.get("台數"), Some(&FormattedValue::plain("2")));
        assert_eq!(row.get("不存在"), None);
    }

    #[test]
    fn test_context_value_serialization() {
        let mut row = TableRow::new();
        row.push("b", FormattedValue::plain("2"));
        row.push("a", FormattedValue::styled("1", TextStyle::red(true)));

        let json = serde_json::to_string(&ContextValue::Table(vec![row])).unwrap();
        assert_eq!(
            json,
            r#"[{"b":"2","a":{"text":"1","color":"FF0000","bold":true}}]"#
        );
    }
}
