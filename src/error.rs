//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。
//!
//! 値の分類・数値整形（コアパイプライン）はエラーを返さない。
//! 数値として解釈できない値は文字列として扱われるため、ここに定義されるエラーは
//! すべてワークブックの読み込み、テンプレートの展開、ファイル入出力に由来する。

use thiserror::Error;

/// sheet2docxクレート全体で使用するエラー型
///
/// # エラーの種類
///
/// - `Io`: I/O操作中に発生したエラー（ファイル読み込み失敗など）
/// - `Parse`: ワークブックの解析中に発生したエラー（calamine由来）
/// - `Zip` / `Xml`: テンプレート（.docx）のアーカイブ・XML処理エラー
/// - `Template`: テンプレート構文のエラー（閉じていないタグなど）
/// - `Config`: 設定の検証に失敗したエラー
/// - `SecurityViolation`: アーカイブのサイズ・パス制限違反
///
/// # 使用例
///
/// ```rust,no_run
/// use sheet2docx::ReportError;
/// use std::fs::File;
///
/// fn open_template(path: &str) -> Result<File, ReportError> {
///     let file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(file)
/// }
/// ```
#[derive(Error, Debug)]
pub enum ReportError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ワークブックの解析中に発生したエラー
    ///
    /// calamineクレートがワークブックを解析する際に発生したエラーです。
    /// ファイル形式が不正、破損したファイルなどが原因となります。
    #[error("Failed to parse workbook: {0}")]
    Parse(#[from] calamine::Error),

    /// UTF-8文字列の変換エラー
    ///
    /// テンプレート内のXMLパートがUTF-8として読めない場合に発生します。
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// ZIPアーカイブの解析・書き込みエラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XMLの解析エラー
    ///
    /// 展開後のパートが整形式のXMLでない場合にも発生します。
    #[error("XML error: {0}")]
    Xml(String),

    /// テンプレート構文のエラー
    ///
    /// `{% for %}` と `{% endfor %}` の対応が取れていない、
    /// 区切り文字が閉じていないなどの場合に発生します。
    #[error("Template error in '{part}': {message}")]
    Template {
        /// エラーが発生したパート名（例: `word/document.xml`）
        part: String,
        /// エラーの詳細メッセージ
        message: String,
    },

    /// 設定の検証に失敗したエラー
    ///
    /// `ReportGeneratorBuilder::build()`時、または設定ファイルの読み込み時に
    /// 無効な設定が検出された場合に発生します。
    ///
    /// ```rust,no_run
    /// use sheet2docx::{ReportGeneratorBuilder, ReportError, VariableSheetRule};
    ///
    /// let result = ReportGeneratorBuilder::new()
    ///     .with_variable_sheet(VariableSheetRule::Named(vec![]))
    ///     .build();
    ///
    /// if let Err(ReportError::Config(msg)) = result {
    ///     println!("設定エラー: {}", msg);
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb、パストラバーサル、ファイルサイズ制限などに違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}
