//! Generated Report Module
//!
//! 生成した文書のバイト列と、コンテキストから決まる出力ファイル名を保持する。

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use crate::context::Context;
use crate::error::ReportError;
use crate::types::{ContextValue, FormattedValue};

/// 出力ファイル名を指定する変数名
pub const FILE_NAME_KEY: &str = "檔名";

/// 出力ファイル名の既定値
pub const DEFAULT_FILE_NAME: &str = "報告測試.docx";

/// 出力ファイル名の変数が装飾付きの値だった場合のファイル名
pub const STYLED_FALLBACK_FILE_NAME: &str = "Generated_Report.docx";

/// 生成された文書
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
    bytes: Vec<u8>,
    file_name: String,
}

impl GeneratedReport {
    pub(crate) fn new(bytes: Vec<u8>, file_name: String) -> Self {
        Self { bytes, file_name }
    }

    /// 文書のバイト列
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 出力ファイル名
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// 文書のバイト列を取り出す
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// 文書をライターに書き込む
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), ReportError> {
        writer.write_all(&self.bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// 指定したディレクトリに出力ファイル名で保存する
    ///
    /// # 戻り値
    ///
    /// 保存したファイルのパス
    pub fn save_in<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, ReportError> {
        let path = dir.as_ref().join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        info!("Wrote {} bytes to {}", self.bytes.len(), path.display());
        Ok(path)
    }
}

/// コンテキストから出力ファイル名を決定する
///
/// | `檔名` の値 | ファイル名 |
/// | --- | --- |
/// | 装飾なし、空白以外を含む | `<前後の空白を除いた値>.docx` |
/// | 装飾付き | `Generated_Report.docx` |
/// | それ以外（存在しない、空、表） | `default_name` |
///
/// パス区切りなどファイル名に使えない文字は `_` に置き換える。
pub fn derive_file_name(context: &Context, default_name: &str) -> String {
    match context.get(FILE_NAME_KEY) {
        Some(ContextValue::Scalar(FormattedValue::Plain(text))) if !text.trim().is_empty() => {
            format!("{}.docx", sanitize_file_name(text.trim()))
        }
        Some(ContextValue::Scalar(FormattedValue::Styled { .. })) => {
            STYLED_FALLBACK_FILE_NAME.to_string()
        }
        _ => default_name.to_string(),
    }
}

/// ファイル名に使えない文字を置き換える
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
