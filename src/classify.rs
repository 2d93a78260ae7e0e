//! Value Classifier Module
//!
//! セル値の文字列表現から、空・範囲表記・数値・文字列のいずれかを判定する。
//! 型情報は使わず、文字列の形だけで判定する。
//!
//! 日付らしき文字列（`2023/01/01`、`2023-01-01`）を数値と誤判定しないため、
//! `/` を含む文字列や、先頭以外に `-` を含む文字列は数値として解釈しない。

use crate::types::{CellValue, ClassifiedValue, ValueKind};

/// 範囲表記を示す文字（半角・全角チルダ）
const RANGE_MARKERS: [char; 2] = ['~', '～'];

/// セル値を分類する
///
/// [`CellValue::Empty`] は常に `Empty`。それ以外は
/// [`CellValue::to_raw_string`] の結果を [`classify_str`] で分類する。
pub fn classify(raw: &CellValue) -> ClassifiedValue {
    match raw {
        CellValue::Empty => ClassifiedValue::empty(),
        other => classify_str(&other.to_raw_string()),
    }
}

/// 文字列を分類する
///
/// # 判定順序
///
/// 1. 前後の空白を除いて空 → `Empty`
/// 2. `~` / `～` を含む → `RangeText`
/// 3. 数値として解釈できる → `Number`
/// 4. それ以外 → `Text`
///
/// 解釈の失敗はエラーにならず、`Text` として扱われる。
/// 全角数字と数字の間の `_`（`1_000`）は数値として受け付け、
/// `Number` の `original` には半角に正規化した表記が入る。
pub fn classify_str(raw: &str) -> ClassifiedValue {
    let text = raw.trim();
    if text.is_empty() {
        return ClassifiedValue::empty();
    }

    if text.contains(RANGE_MARKERS) {
        return ClassifiedValue {
            kind: ValueKind::RangeText,
            original: text.to_string(),
            number: None,
        };
    }

    match parse_numeric(text) {
        Some((number, notation)) => ClassifiedValue {
            kind: ValueKind::Number,
            original: notation,
            number: Some(number),
        },
        None => ClassifiedValue {
            kind: ValueKind::Text,
            original: text.to_string(),
            number: None,
        },
    }
}

/// 数値として解釈する
///
/// 除外条件（`/` を含む、先頭以外の `-`、複数の `-`）は解釈の成否より優先する。
/// `inf` / `NaN` のような有限でない値は数値として扱わない。
/// 成功時は値と、半角に正規化した表記を返す。
fn parse_numeric(text: &str) -> Option<(f64, String)> {
    if text.contains('/') {
        return None;
    }

    let dash_count = text.matches('-').count();
    if dash_count > 1 || (dash_count == 1 && !text.starts_with('-')) {
        return None;
    }

    let notation = normalize_notation(text)?;
    let number = notation.parse::<f64>().ok().filter(|n| n.is_finite())?;
    Some((number, notation))
}

/// 全角数字を半角にし、数字の間の `_` を取り除く
///
/// 数字に挟まれていない `_`（先頭・末尾・連続）があれば `None`。
fn normalize_notation(text: &str) -> Option<String> {
    let digits: Vec<char> = text
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            _ => c,
        })
        .collect();

    let mut notation = String::with_capacity(digits.len());
    for (i, &c) in digits.iter().enumerate() {
        if c != '_' {
            notation.push(c);
            continue;
        }
        let before = i.checked_sub(1).and_then(|j| digits.get(j));
        let after = digits.get(i + 1);
        match (before, after) {
            (Some(b), Some(a)) if b.is_ascii_digit() && a.is_ascii_digit() => {}
            _ => return None,
        }
    }
    Some(notation)
}
