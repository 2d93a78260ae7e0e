//! Styled-Value Builder Module
//!
//! 分類結果と整形済み文字列から、テンプレートに渡す表示値
//! （装飾なし / 装飾付き）を組み立てる。

use crate::classify::classify;
use crate::formatter::format_number;
use crate::policy::FormattingPolicy;
use crate::types::{CellValue, ClassifiedValue, FormattedValue, ValueKind};

/// 分類結果から表示値を組み立てる
///
/// # 引数
///
/// * `classified` - 分類結果
/// * `formatted` - 数値の整形結果（`Number` 以外では使われない）
/// * `policy` - 整形ポリシー（装飾の選択に使用）
///
/// # 戻り値
///
/// * `Empty` → 装飾なしの空文字列
/// * `RangeText` → ポリシーに応じて装飾なし、または範囲表記用の装飾
/// * `Number` → 数値用の装飾を付けた整形済み文字列
/// * `Text` → 装飾なしの元の文字列
pub fn build_display(
    classified: &ClassifiedValue,
    formatted: &str,
    policy: &FormattingPolicy,
) -> FormattedValue {
    match classified.kind {
        ValueKind::Empty => FormattedValue::plain(""),
        ValueKind::RangeText => match &policy.range_text_style {
            Some(style) => FormattedValue::styled(classified.original.clone(), style.clone()),
            None => FormattedValue::plain(classified.original.clone()),
        },
        ValueKind::Number => FormattedValue::styled(formatted, policy.number_style.clone()),
        ValueKind::Text => FormattedValue::plain(classified.original.clone()),
    }
}

/// 1つのセル値を 分類 → 数値整形 → 表示値 の順に処理する
///
/// # 引数
///
/// * `raw` - セル値
/// * `field_name` - 変数名（表シートの場合は列見出し）
/// * `policy` - 整形ポリシー
pub fn render_value(raw: &CellValue, field_name: &str, policy: &FormattingPolicy) -> FormattedValue {
    let classified = classify(raw);
    let formatted = match classified.number {
        Some(number) => format_number(
            number,
            &classified.original,
            field_name,
            policy.number_rules,
            policy.rounding,
        ),
        None => String::new(),
    };
    build_display(&classified, &formatted, policy)
}
