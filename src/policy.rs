//! Formatting Policy Module
//!
//! 変数シートの選び方、数値の整形ルール、装飾、表セルの扱いをひとまとめにした
//! 整形ポリシーを定義するモジュール。ポリシーは起動時に一度だけ選択され、
//! 分類・整形・装飾・コンテキスト組み立ての各段階に参照で渡される。

use serde::Deserialize;

use crate::api::{NumberRules, Rounding, TableCells, VariableSheetRule};
use crate::error::ReportError;
use crate::types::TextStyle;

/// 整形ポリシー
///
/// 2つのプリセットを提供する。
///
/// | 項目 | [`field_name_aware`](Self::field_name_aware) | [`uniform`](Self::uniform) |
/// | --- | --- | --- |
/// | 変数シート | 先頭のシート | `變數` / `Variables` |
/// | 数値書式 | 変数名の命名規則 | 元の表記のまま |
/// | 数値の装飾 | 赤・太字なし | 赤・太字 |
/// | 範囲表記 | 黒・太字なし | 装飾なし |
/// | 表セル | 整形あり | そのまま |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattingPolicy {
    /// 変数シートの選択方式
    pub variable_sheet: VariableSheetRule,

    /// 数値の整形ルール表
    pub number_rules: NumberRules,

    /// 丸め方式
    pub rounding: Rounding,

    /// 数値に適用する装飾
    pub number_style: TextStyle,

    /// 範囲表記に適用する装飾（`None` の場合は装飾なし）
    pub range_text_style: Option<TextStyle>,

    /// 表シートのセルの扱い
    pub table_cells: TableCells,
}

impl FormattingPolicy {
    /// 変数名の命名規則で数値書式を選ぶポリシー
    pub fn field_name_aware() -> Self {
        Self {
            variable_sheet: VariableSheetRule::First,
            number_rules: NumberRules::FieldNameAware,
            rounding: Rounding::HalfEven,
            number_style: TextStyle::red(false),
            range_text_style: Some(TextStyle::black()),
            table_cells: TableCells::Raw,
        }
    }

    /// すべての数値を赤・太字で表示するポリシー
    pub fn uniform() -> Self {
        Self {
            variable_sheet: VariableSheetRule::default_names(),
            number_rules: NumberRules::Uniform,
            rounding: Rounding::HalfEven,
            number_style: TextStyle::red(true),
            range_text_style: None,
            table_cells: TableCells::Raw,
        }
    }

    /// プリセットからポリシーを生成
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::FieldNameAware => Self::field_name_aware(),
            Preset::Uniform => Self::uniform(),
        }
    }

    /// ポリシーを検証する
    ///
    /// # 発生し得るエラー
    ///
    /// * `ReportError::Config` - 変数シート名が空、または装飾の色が16進6桁でない場合
    pub(crate) fn validate(&self) -> Result<(), ReportError> {
        if let VariableSheetRule::Named(names) = &self.variable_sheet {
            if names.is_empty() || names.iter().any(|n| n.trim().is_empty()) {
                return Err(ReportError::Config(
                    "Variable sheet names must not be empty".to_string(),
                ));
            }
        }

        let styles = std::iter::once(&self.number_style).chain(self.range_text_style.as_ref());
        for style in styles {
            if !style.has_valid_color() {
                return Err(ReportError::Config(format!(
                    "Invalid color '{}': expected six hex digits such as 'FF0000'",
                    style.color
                )));
            }
        }

        Ok(())
    }
}

impl Default for FormattingPolicy {
    fn default() -> Self {
        Self::field_name_aware()
    }
}

/// ポリシーのプリセット
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// [`FormattingPolicy::field_name_aware`]
    #[default]
    FieldNameAware,

    /// [`FormattingPolicy::uniform`]
    Uniform,
}

/// 設定ファイル（JSON）の内容
///
/// プリセットを起点に、指定された項目だけを上書きする。
///
/// ```json
/// {
///   "preset": "uniform",
///   "variable_sheet": { "named": ["變數"] },
///   "rounding": "half-up",
///   "number_style": { "color": "C00000", "bold": true },
///   "missing_markers": ["", "N/A"],
///   "default_file_name": "report.docx"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// 起点とするプリセット
    pub preset: Preset,

    /// 変数シートの選択方式
    pub variable_sheet: Option<VariableSheetRule>,

    /// 数値の整形ルール表
    pub number_rules: Option<NumberRules>,

    /// 丸め方式
    pub rounding: Option<Rounding>,

    /// 数値の装飾
    pub number_style: Option<TextStyle>,

    /// 範囲表記の装飾
    pub range_text_style: Option<TextStyle>,

    /// 範囲表記を装飾なしにする
    pub plain_range_text: bool,

    /// 表セルの扱い
    pub table_cells: Option<TableCells>,

    /// 欠損値として扱う文字列
    pub missing_markers: Option<Vec<String>>,

    /// 既定の出力ファイル名
    pub default_file_name: Option<String>,
}

impl PolicyConfig {
    /// JSON文字列から設定を読み込む
    ///
    /// # 発生し得るエラー
    ///
    /// * `ReportError::Config` - JSONとして不正、または未知の項目を含む場合
    pub fn from_json_str(json: &str) -> Result<Self, ReportError> {
        serde_json::from_str(json)
            .map_err(|e| ReportError::Config(format!("Invalid policy config: {}", e)))
    }

    /// プリセットに上書き項目を適用したポリシーを生成
    pub fn to_policy(&self) -> FormattingPolicy {
        let mut policy = FormattingPolicy::from_preset(self.preset);
        if let Some(rule) = &self.variable_sheet {
            policy.variable_sheet = rule.clone();
        }
        if let Some(rules) = self.number_rules {
            policy.number_rules = rules;
        }
        if let Some(rounding) = self.rounding {
            policy.rounding = rounding;
        }
        if let Some(style) = &self.number_style {
            policy.number_style = style.clone();
        }
        if let Some(style) = &self.range_text_style {
            policy.range_text_style = Some(style.clone());
        }
        if self.plain_range_text {
            policy.range_text_style = None;
        }
        if let Some(table_cells) = self.table_cells {
            policy.table_cells = table_cells;
        }
        policy
    }
}
