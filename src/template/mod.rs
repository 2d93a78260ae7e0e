//! Template Module
//!
//! Word文書（.docx）のテンプレートを読み込み、コンテキストで展開する。
//!
//! 本文・ヘッダー・フッター・脚注・文末脚注のパーツを展開対象とし、
//! それ以外のエントリ（画像、スタイル、リレーションなど）はそのままコピーする。

mod engine;
mod preprocess;

use std::io::{Cursor, Read, Write};

use log::debug;
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::context::Context;
use crate::error::ReportError;
use crate::security::SecurityConfig;

use engine::Template;

/// 本文パーツ
const MAIN_DOCUMENT_PART: &str = "word/document.xml";

/// 展開対象のパーツかどうか
fn is_template_part(name: &str) -> bool {
    if matches!(
        name,
        "word/document.xml" | "word/footnotes.xml" | "word/endnotes.xml"
    ) {
        return true;
    }
    name.strip_prefix("word/")
        .filter(|file| !file.contains('/'))
        .is_some_and(|file| {
            (file.starts_with("header") || file.starts_with("footer")) && file.ends_with(".xml")
        })
}

/// アーカイブ内のエントリ
#[derive(Debug, Clone)]
struct Entry {
    name: String,
    compression: CompressionMethod,
    content: EntryContent,
}

#[derive(Debug, Clone)]
enum EntryContent {
    Directory,
    Raw(Vec<u8>),
    Template(Template),
}

/// Word文書のテンプレート
///
/// 読み込み時にすべての展開対象パーツを解析するため、
/// タグの構文エラーは [`DocxTemplate::open`] の時点で検出される。
#[derive(Debug, Clone)]
pub struct DocxTemplate {
    entries: Vec<Entry>,
}

impl DocxTemplate {
    /// テンプレートを読み込む（既定のセキュリティ設定）
    ///
    /// # 引数
    ///
    /// * `bytes` - .docx ファイルのバイト列
    ///
    /// # 戻り値
    ///
    /// * `Ok(DocxTemplate)` - 読み込みと解析に成功した場合
    /// * `Err(ReportError::Zip)` - ZIPアーカイブとして読めない場合
    /// * `Err(ReportError::Template)` - 本文パーツがない、またはタグが不正な場合
    /// * `Err(ReportError::SecurityViolation)` - セキュリティ制限を超えた場合
    pub fn open(bytes: &[u8]) -> Result<Self, ReportError> {
        Self::open_with_security(bytes, &SecurityConfig::default())
    }

    /// セキュリティ設定を指定してテンプレートを読み込む
    pub fn open_with_security(bytes: &[u8], security: &SecurityConfig) -> Result<Self, ReportError> {
        security.check_input_size("Template", bytes.len())?;

        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| ReportError::Zip(format!("{}", e)))?;
        security.check_archive(&mut archive)?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| ReportError::Zip(format!("{}", e)))?;
            let name = file.name().to_string();
            let compression = file.compression();

            let content = if file.is_dir() {
                EntryContent::Directory
            } else {
                let mut data = Vec::new();
                file.read_to_end(&mut data)?;
                if is_template_part(&name) {
                    EntryContent::Template(parse_part(&name, &data)?)
                } else {
                    EntryContent::Raw(data)
                }
            };

            entries.push(Entry {
                name,
                compression,
                content,
            });
        }

        if !entries.iter().any(|entry| entry.name == MAIN_DOCUMENT_PART) {
            return Err(ReportError::Template {
                part: MAIN_DOCUMENT_PART.to_string(),
                message: "Main document part is missing".to_string(),
            });
        }

        debug!(
            "Opened template: {} entries, {} template parts",
            entries.len(),
            entries
                .iter()
                .filter(|entry| matches!(entry.content, EntryContent::Template(_)))
                .count()
        );

        Ok(Self { entries })
    }

    /// 展開対象パーツの名前
    pub fn template_parts(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.content, EntryContent::Template(_)))
            .map(|entry| entry.name.as_str())
    }

    /// コンテキストで展開し、.docx のバイト列を生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - 生成した文書
    /// * `Err(ReportError::Xml)` - 展開結果がXMLとして不正な場合
    /// * `Err(ReportError::Zip)` - アーカイブの書き込みに失敗した場合
    pub fn render(&self, context: &Context) -> Result<Vec<u8>, ReportError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let options = FileOptions::default().compression_method(match entry.compression {
                CompressionMethod::Deflated => CompressionMethod::Deflated,
                _ => CompressionMethod::Stored,
            });

            match &entry.content {
                EntryContent::Directory => {
                    writer
                        .add_directory(entry.name.as_str(), options)
                        .map_err(|e| ReportError::Zip(format!("{}", e)))?;
                }
                EntryContent::Raw(data) => {
                    writer
                        .start_file(entry.name.as_str(), options)
                        .map_err(|e| ReportError::Zip(format!("{}", e)))?;
                    writer.write_all(data)?;
                }
                EntryContent::Template(template) => {
                    let rendered = template.render(context);
                    validate_xml(&entry.name, &rendered)?;
                    writer
                        .start_file(entry.name.as_str(), options)
                        .map_err(|e| ReportError::Zip(format!("{}", e)))?;
                    writer.write_all(rendered.as_bytes())?;
                }
            }
        }

        let cursor = writer
            .finish()
            .map_err(|e| ReportError::Zip(format!("{}", e)))?;
        Ok(cursor.into_inner())
    }
}

/// パーツを前処理して解析する
fn parse_part(name: &str, data: &[u8]) -> Result<Template, ReportError> {
    let xml = std::str::from_utf8(data)?;
    let prepared = preprocess::prepare(xml);
    Template::parse(&prepared).map_err(|message| ReportError::Template {
        part: name.to_string(),
        message,
    })
}

/// 展開結果が整形式のXMLであることを確認する
fn validate_xml(part: &str, xml: &str) -> Result<(), ReportError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => return Ok(()),
            Ok(_) => {}
            Err(e) => {
                return Err(ReportError::Xml(format!(
                    "Rendered part '{}' is malformed at position {}: {}",
                    part,
                    reader.buffer_position(),
                    e
                )))
            }
        }
        buf.clear();
    }
}
