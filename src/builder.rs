//! Builder Module
//!
//! Fluent Builder APIを提供し、`ReportGenerator`インスタンスを段階的に構築する。

use crate::api::{NumberRules, Rounding, TableCells, VariableSheetRule};
use crate::context::{assemble, Context};
use crate::error::ReportError;
use crate::parser::{WorkbookReader, DEFAULT_MISSING_MARKERS};
use crate::policy::{FormattingPolicy, PolicyConfig};
use crate::report::{derive_file_name, GeneratedReport, DEFAULT_FILE_NAME};
use crate::security::SecurityConfig;
use crate::template::DocxTemplate;
use crate::types::{SheetData, TextStyle};
use log::info;
use std::io::Read;

/// 生成処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct GeneratorConfig {
    /// 整形ポリシー
    pub policy: FormattingPolicy,

    /// 欠損値として扱う文字列
    pub missing_markers: Vec<String>,

    /// `檔名` がない場合の出力ファイル名
    pub default_file_name: String,

    /// 入力ファイルのセキュリティ制限
    pub security: SecurityConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            policy: FormattingPolicy::default(),
            missing_markers: DEFAULT_MISSING_MARKERS.iter().map(|s| s.to_string()).collect(),
            default_file_name: DEFAULT_FILE_NAME.to_string(),
            security: SecurityConfig::default(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `ReportGenerator`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheet2docx::{ReportGeneratorBuilder, FormattingPolicy, Rounding};
///
/// # fn main() -> Result<(), sheet2docx::ReportError> {
/// let generator = ReportGeneratorBuilder::new()
///     .with_policy(FormattingPolicy::uniform())
///     .with_rounding(Rounding::HalfUp)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ReportGeneratorBuilder {
    /// 内部設定（構築中）
    config: GeneratorConfig,
}

impl Default for ReportGeneratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGeneratorBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 整形ポリシー: [`FormattingPolicy::field_name_aware`]
    /// - 欠損値: [`DEFAULT_MISSING_MARKERS`]
    /// - 出力ファイル名: `報告測試.docx`
    pub fn new() -> Self {
        Self {
            config: GeneratorConfig::default(),
        }
    }

    /// 整形ポリシーを丸ごと指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use sheet2docx::{FormattingPolicy, ReportGeneratorBuilder};
    ///
    /// let builder = ReportGeneratorBuilder::new()
    ///     .with_policy(FormattingPolicy::uniform());
    /// ```
    pub fn with_policy(mut self, policy: FormattingPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// 変数シートの選択方式を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use sheet2docx::{ReportGeneratorBuilder, VariableSheetRule};
    ///
    /// let builder = ReportGeneratorBuilder::new()
    ///     .with_variable_sheet(VariableSheetRule::Named(vec!["變數".to_string()]));
    /// ```
    pub fn with_variable_sheet(mut self, rule: VariableSheetRule) -> Self {
        self.config.policy.variable_sheet = rule;
        self
    }

    /// 数値の整形ルール表を指定する
    pub fn with_number_rules(mut self, rules: NumberRules) -> Self {
        self.config.policy.number_rules = rules;
        self
    }

    /// 丸め方式を指定する
    pub fn with_rounding(mut self, rounding: Rounding) -> Self {
        self.config.policy.rounding = rounding;
        self
    }

    /// 表シートのセルの扱いを指定する
    pub fn with_table_cells(mut self, table_cells: TableCells) -> Self {
        self.config.policy.table_cells = table_cells;
        self
    }

    /// 数値に適用する装飾を指定する
    pub fn with_number_style(mut self, style: TextStyle) -> Self {
        self.config.policy.number_style = style;
        self
    }

    /// 範囲表記に適用する装飾を指定する（`None` で装飾なし）
    pub fn with_range_text_style(mut self, style: Option<TextStyle>) -> Self {
        self.config.policy.range_text_style = style;
        self
    }

    /// 欠損値として扱う文字列を指定する
    ///
    /// 一致したセルは空セルとして読み込まれる。
    pub fn with_missing_markers(mut self, markers: Vec<String>) -> Self {
        self.config.missing_markers = markers;
        self
    }

    /// `檔名` がない場合の出力ファイル名を指定する
    pub fn with_default_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.default_file_name = name.into();
        self
    }

    /// 入力ファイルのセキュリティ制限を指定する
    pub fn with_security_config(mut self, security: SecurityConfig) -> Self {
        self.config.security = security;
        self
    }

    /// 設定ファイルの内容を適用する
    ///
    /// ポリシーはプリセットから作り直され、欠損値と出力ファイル名は
    /// 設定ファイルで指定された場合のみ上書きされる。
    pub fn with_config(mut self, config: &PolicyConfig) -> Self {
        self.config.policy = config.to_policy();
        if let Some(markers) = &config.missing_markers {
            self.config.missing_markers = markers.clone();
        }
        if let Some(name) = &config.default_file_name {
            self.config.default_file_name = name.clone();
        }
        self
    }

    /// 設定を検証し、`ReportGenerator`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(ReportGenerator)`: 設定が有効な場合
    /// * `Err(ReportError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * `ReportError::Config(String)`: 設定の検証に失敗した場合
    ///   * 変数シート名の指定が空
    ///   * 装飾の色が16進6桁でない
    ///   * 既定の出力ファイル名が空
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use sheet2docx::{ReportError, ReportGeneratorBuilder, VariableSheetRule};
    ///
    /// let result = ReportGeneratorBuilder::new()
    ///     .with_variable_sheet(VariableSheetRule::Named(vec![]))
    ///     .build();
    /// assert!(matches!(result, Err(ReportError::Config(_))));
    /// ```
    pub fn build(self) -> Result<ReportGenerator, ReportError> {
        // 1. ポリシーの検証
        self.config.policy.validate()?;

        // 2. 出力ファイル名の検証
        if self.config.default_file_name.trim().is_empty() {
            return Err(ReportError::Config(
                "Default file name must not be empty".to_string(),
            ));
        }

        // 3. ReportGeneratorインスタンス生成
        Ok(ReportGenerator::new(self.config))
    }
}

/// 生成処理のファサード
///
/// ワークブックの読み込み → コンテキストの組み立て → テンプレートの展開を順に実行する。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheet2docx::ReportGeneratorBuilder;
///
/// # fn main() -> Result<(), sheet2docx::ReportError> {
/// let generator = ReportGeneratorBuilder::new().build()?;
/// let template = std::fs::read("template.docx")?;
/// let workbook = std::fs::read("data.xlsx")?;
///
/// let report = generator.generate(&template, &workbook)?;
/// report.save_in(".")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    /// 生成設定
    config: GeneratorConfig,

    /// ワークブックリーダー
    reader: WorkbookReader,
}

impl ReportGenerator {
    pub(crate) fn new(config: GeneratorConfig) -> Self {
        Self {
            reader: WorkbookReader::new()
                .with_missing_markers(config.missing_markers.clone())
                .with_security_config(config.security.clone()),
            config,
        }
    }

    /// 整形ポリシーを取得
    pub fn policy(&self) -> &FormattingPolicy {
        &self.config.policy
    }

    /// `檔名` がない場合の出力ファイル名
    pub fn default_file_name(&self) -> &str {
        &self.config.default_file_name
    }

    /// ワークブックの全シートを読み込む
    pub fn read_workbook(&self, workbook: &[u8]) -> Result<Vec<SheetData>, ReportError> {
        self.reader.read_all(workbook)
    }

    /// ワークブックからコンテキストを組み立てる
    ///
    /// # 引数
    ///
    /// * `workbook` - ワークブックのバイト列
    ///
    /// # 戻り値
    ///
    /// * `Ok(Context)` - テンプレートに渡す変数マップ
    /// * `Err(ReportError)` - ワークブックの読み込みに失敗した場合
    pub fn build_context(&self, workbook: &[u8]) -> Result<Context, ReportError> {
        let sheets = self.read_workbook(workbook)?;
        Ok(assemble(&sheets, &self.config.policy))
    }

    /// 組み立て済みのコンテキストでテンプレートを展開する
    ///
    /// # 引数
    ///
    /// * `template` - テンプレート（.docx）のバイト列
    /// * `context` - 変数マップ
    ///
    /// # 戻り値
    ///
    /// * `Ok(GeneratedReport)` - 生成した文書と出力ファイル名
    /// * `Err(ReportError)` - テンプレートの読み込みまたは展開に失敗した場合
    pub fn render_context(
        &self,
        template: &[u8],
        context: &Context,
    ) -> Result<GeneratedReport, ReportError> {
        let template = DocxTemplate::open_with_security(template, &self.config.security)?;
        let bytes = template.render(context)?;
        let file_name = derive_file_name(context, &self.config.default_file_name);

        info!(
            "Generated report '{}' ({} bytes, {} context entries)",
            file_name,
            bytes.len(),
            context.len()
        );
        Ok(GeneratedReport::new(bytes, file_name))
    }

    /// テンプレートとワークブックから文書を生成する
    ///
    /// # 処理フロー
    ///
    /// 1. ワークブックの全シートを読み込む
    /// 2. 変数シート・表シートからコンテキストを組み立てる
    /// 3. テンプレートを展開する
    /// 4. `檔名` から出力ファイル名を決定する
    pub fn generate(&self, template: &[u8], workbook: &[u8]) -> Result<GeneratedReport, ReportError> {
        let context = self.build_context(workbook)?;
        self.render_context(template, &context)
    }

    /// リーダーから読み込んで文書を生成する
    pub fn generate_from<T: Read, W: Read>(
        &self,
        mut template: T,
        mut workbook: W,
    ) -> Result<GeneratedReport, ReportError> {
        let mut template_bytes = Vec::new();
        template.read_to_end(&mut template_bytes)?;
        let mut workbook_bytes = Vec::new();
        workbook.read_to_end(&mut workbook_bytes)?;
        self.generate(&template_bytes, &workbook_bytes)
    }
}
