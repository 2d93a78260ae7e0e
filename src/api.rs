//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。
//! 整形ポリシー（[`crate::FormattingPolicy`]）を構成する各選択肢をここに置く。

use serde::{Deserialize, Serialize};

/// 変数シートの選択方式
///
/// 変数シート（1列目: 変数名、2列目: 値）として扱うシートを決める。
/// 変数シートに該当しないシートはすべて表シートとして扱われる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum VariableSheetRule {
    /// 先頭のシートを変数シートとする（位置による判定）
    First,

    /// 指定された名前のシートを変数シートとする（位置は問わない）
    ///
    /// 例: `VariableSheetRule::Named(vec!["變數".to_string(), "Variables".to_string()])`
    Named(Vec<String>),
}

impl VariableSheetRule {
    /// 既定の変数シート名（`變數` / `Variables`）による選択方式
    pub fn default_names() -> Self {
        VariableSheetRule::Named(vec!["變數".to_string(), "Variables".to_string()])
    }

    /// 指定されたシートが変数シートかどうかを判定
    ///
    /// # 引数
    ///
    /// * `index` - シートインデックス（0始まり）
    /// * `name` - シート名
    pub fn is_variable_sheet(&self, index: usize, name: &str) -> bool {
        match self {
            VariableSheetRule::First => index == 0,
            VariableSheetRule::Named(names) => names.iter().any(|n| n == name),
        }
    }
}

/// 数値の整形ルール表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum NumberRules {
    /// 変数名の命名規則で書式を選択する
    ///
    /// 1. `me_` で始まる → 桁区切り整数（元の小数部はそのまま）
    /// 2. `_rate` で終わる、または `elec_price` / `new_cop_std` / `new_eff_std` を含む → 小数2桁
    /// 3. `_year` で終わる → 小数1桁
    /// 4. それ以外 → 整数（桁区切り、丸めあり）
    FieldNameAware,

    /// 変数名に関係なく、元の数値表記をそのまま使う（装飾のみ適用）
    Uniform,
}

/// 丸め方式
///
/// 丸めは `f64` の正確な10進展開に対して行う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum Rounding {
    /// 最近接偶数への丸め（既定）
    ///
    /// 例: `2.5` → `2`、`3.5` → `4`
    HalfEven,

    /// 四捨五入（0から遠い方へ）
    ///
    /// 例: `2.5` → `3`、`-2.5` → `-3`
    HalfUp,
}

/// 表シートのセルの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum TableCells {
    /// 値をそのまま使う（空セルのみ空文字列に置換、装飾なし）
    Raw,

    /// 列見出しを変数名として、変数シートと同じ分類・整形を適用する
    Formatted,
}
