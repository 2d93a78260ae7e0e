//! Formatter Module
//!
//! 数値と判定された値の表示文字列を生成するモジュール。
//! 変数名の命名規則から書式（桁区切り・小数桁数）を選び、
//! 数値の符号と大きさは変えずに、桁区切りと精度だけを調整する。

use crate::api::{NumberRules, Rounding};

/// 丸め判定のために追加で展開する小数桁数
///
/// 小数2桁までの丸めで、ちょうど中間の値と中間に近い値を区別するのに十分な桁数。
const GUARD_DIGITS: usize = 30;

/// 変数名から選択される数値書式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRule {
    /// 桁区切り整数（元の文字列に小数部があればそのまま残す）
    GroupedVerbatimFraction,

    /// 桁区切り・固定小数桁数
    Fixed(usize),

    /// 元の数値表記をそのまま使う
    Verbatim,
}

/// 変数名から数値書式を選択する
///
/// 変数名は前後の空白を除き、小文字に変換してから判定する。
/// 先に一致した規則が優先される。
pub fn select_rule(field_name: &str, rules: NumberRules) -> FormatRule {
    if rules == NumberRules::Uniform {
        return FormatRule::Verbatim;
    }

    let key = field_name.trim().to_lowercase();
    if key.starts_with("me_") {
        FormatRule::GroupedVerbatimFraction
    } else if key.ends_with("_rate")
        || key.contains("elec_price")
        || key.contains("new_cop_std")
        || key.contains("new_eff_std")
    {
        FormatRule::Fixed(2)
    } else if key.ends_with("_year") {
        FormatRule::Fixed(1)
    } else {
        FormatRule::Fixed(0)
    }
}

/// 数値を整形する
///
/// # 引数
///
/// * `value` - 解釈済みの数値
/// * `original` - 元の文字列（`me_` 規則で小数部をそのまま使うため）
/// * `field_name` - 変数名（列見出し）
/// * `rules` - 整形ルール表
/// * `rounding` - 丸め方式
///
/// # 使用例
///
/// ```rust
/// use sheet2docx::{format_number, NumberRules, Rounding};
///
/// let s = format_number(1234.5, "1234.5", "x_rate", NumberRules::FieldNameAware, Rounding::HalfEven);
/// assert_eq!(s, "1,234.50");
/// ```
pub fn format_number(
    value: f64,
    original: &str,
    field_name: &str,
    rules: NumberRules,
    rounding: Rounding,
) -> String {
    match select_rule(field_name, rules) {
        FormatRule::GroupedVerbatimFraction => format_grouped_verbatim(value, original),
        FormatRule::Fixed(decimals) => format_fixed(value, decimals, rounding),
        FormatRule::Verbatim => original.trim().to_string(),
    }
}

/// 小数部を元の文字列のまま残す桁区切り整数
fn format_grouped_verbatim(value: f64, original: &str) -> String {
    let original = original.trim();
    match original.split_once('.') {
        Some((int_part, frac_part)) => {
            let (sign, digits) = split_sign(int_part);
            let digits = digits.trim_start_matches('0');
            let digits = if digits.is_empty() { "0" } else { digits };
            format!("{}{}.{}", sign, add_thousand_separators(digits), frac_part)
        }
        None => {
            // 0方向への切り捨て（整数に負のゼロはない）
            let truncated = value.trunc();
            if truncated == 0.0 {
                "0".to_string()
            } else {
                format_fixed(truncated, 0, Rounding::HalfEven)
            }
        }
    }
}

/// 符号と数字部分に分ける（`+` は捨てる）
fn split_sign(s: &str) -> (&'static str, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        ("-", rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        ("", rest)
    } else {
        ("", s)
    }
}

/// 桁区切り・固定小数桁数で整形する
///
/// 負の値は丸めの結果がゼロでも符号を残す（`-0.4` → `-0`）。
pub(crate) fn format_fixed(value: f64, decimals: usize, rounding: Rounding) -> String {
    let expanded = format!("{:.*}", decimals + GUARD_DIGITS, value.abs());
    let (int_part, frac_part) = expanded
        .split_once('.')
        .unwrap_or((expanded.as_str(), ""));

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(decimals))
        .map(|b| b - b'0')
        .collect();
    let rest = frac_part.as_bytes().get(decimals..).unwrap_or(&[]);

    if should_round_up(&digits, rest, rounding) {
        increment(&mut digits);
    }

    let split = digits.len() - decimals;
    let int_digits: String = digits[..split].iter().map(|d| (b'0' + d) as char).collect();
    let mut result = String::new();
    if value.is_sign_negative() {
        result.push('-');
    }
    result.push_str(&add_thousand_separators(&int_digits));
    if decimals > 0 {
        result.push('.');
        result.extend(digits[split..].iter().map(|d| (b'0' + d) as char));
    }
    result
}

/// 切り捨てられる桁から繰り上げが必要かを判定
fn should_round_up(kept: &[u8], rest: &[u8], rounding: Rounding) -> bool {
    match rest.first() {
        Some(b'6'..=b'9') => true,
        Some(b'5') => {
            let is_tie = rest[1..].iter().all(|&b| b == b'0');
            if !is_tie {
                return true;
            }
            match rounding {
                Rounding::HalfUp => true,
                Rounding::HalfEven => kept.last().is_some_and(|d| d % 2 == 1),
            }
        }
        _ => false,
    }
}

/// 10進数字列に1を加える（桁あふれは先頭に追加）
fn increment(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, 1);
}

/// 千の位区切りを追加
///
/// # 引数
///
/// * `s` - 数字のみの文字列
///
/// # 戻り値
///
/// 千の位区切りが追加された文字列
pub(crate) fn add_thousand_separators(s: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();

    for (i, ch) in chars.iter().enumerate() {
        result.push(*ch);
        // 右から3桁ごとにカンマを追加（ただし最後の桁の後は追加しない）
        #[allow(clippy::manual_is_multiple_of)]
        if (len - i - 1) % 3 == 0 && i < len - 1 {
            result.push(',');
        }
    }

    result
}
