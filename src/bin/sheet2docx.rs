//! sheet2docx command line tool
//!
//! Reads a workbook, builds the template context and renders a `.docx` template.

use clap::{Parser, ValueEnum};
use log::{debug, LevelFilter, Log, Metadata, Record};
use sheet2docx::{PolicyConfig, Preset, ReportError, ReportGeneratorBuilder, Rounding};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Numbers are formatted by the naming convention of their variable name.
    FieldNameAware,
    /// Numbers keep their notation and are shown in bold red.
    Uniform,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoundingArg {
    HalfEven,
    HalfUp,
}

#[derive(Parser)]
#[command(
    name = "sheet2docx",
    version,
    about = "Fill a Word (.docx) report template with variables and tables from a workbook."
)]
struct Args {
    /// Word template containing docxtpl-style tags.
    #[arg(long, value_name = "PATH")]
    template: PathBuf,

    /// Workbook with the variable sheet and table sheets (xlsx/xls/ods).
    #[arg(long, value_name = "PATH")]
    data: PathBuf,

    /// Output file. Overrides the name derived from the `檔名` variable.
    #[arg(long, value_name = "PATH", conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Directory for the generated report.
    #[arg(long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Formatting preset.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Rounding used for fixed-precision numbers.
    #[arg(long, value_enum)]
    rounding: Option<RoundingArg>,

    /// Policy configuration file (JSON).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the assembled context as JSON instead of rendering.
    #[arg(long)]
    dump_context: bool,

    /// Print a table of the assembled context to stdout.
    #[arg(long)]
    summary: bool,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// 標準エラー出力へのロガー
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logger(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    // 二重登録は無視する
    if log::set_boxed_logger(Box::new(StderrLogger)).is_ok() {
        log::set_max_level(level);
    }
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose, args.quiet);

    if let Err(e) = run(&args) {
        handle_error(e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), ReportError> {
    // 1. 設定ファイル → コマンドライン引数の順に適用
    let mut config = match &args.config {
        Some(path) => PolicyConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => PolicyConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.preset = match mode {
            Mode::FieldNameAware => Preset::FieldNameAware,
            Mode::Uniform => Preset::Uniform,
        };
    }

    let mut builder = ReportGeneratorBuilder::new().with_config(&config);
    if let Some(rounding) = args.rounding {
        builder = builder.with_rounding(match rounding {
            RoundingArg::HalfEven => Rounding::HalfEven,
            RoundingArg::HalfUp => Rounding::HalfUp,
        });
    }
    let generator = builder.build()?;
    debug!("Using policy {:?}", generator.policy());

    // 2. コンテキストの組み立て
    let workbook = fs::read(&args.data)?;
    let context = generator.build_context(&workbook)?;

    if args.summary {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        context.write_summary(&mut handle)?;
        handle.flush()?;
    }

    if args.dump_context {
        let json = serde_json::to_string_pretty(&context)
            .map_err(|e| ReportError::Config(format!("Failed to serialize context: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    // 3. テンプレートの展開と保存
    let template = fs::read(&args.template)?;
    let report = generator.render_context(&template, &context)?;

    let path = match &args.output {
        Some(path) => {
            report.write_to(fs::File::create(path)?)?;
            path.clone()
        }
        None => report.save_in(&args.out_dir)?,
    };

    if !args.quiet {
        eprintln!("Report written: {}", path.display());
    }
    Ok(())
}

fn handle_error(error: ReportError) {
    match error {
        ReportError::Io(io_err) => {
            eprintln!("I/O Error: {}", io_err);
            eprintln!("Please check that the files exist and you have permission to access them.");
        }
        ReportError::Parse(parse_err) => {
            eprintln!("Parse Error: {}", parse_err);
            eprintln!("The data file may not be a valid workbook or may be corrupted.");
        }
        ReportError::Utf8(utf8_err) => {
            eprintln!("UTF-8 Conversion Error: {}", utf8_err);
            eprintln!("The template contains a part that is not valid UTF-8.");
        }
        ReportError::Zip(msg) => {
            eprintln!("ZIP Archive Error: {}", msg);
            eprintln!("The template may be corrupted or not a valid .docx file.");
        }
        ReportError::Xml(msg) => {
            eprintln!("XML Error: {}", msg);
            eprintln!("A template tag may break the document structure.");
        }
        ReportError::Template { part, message } => {
            eprintln!("Template Error:");
            eprintln!("  Part: {}", part);
            eprintln!("  Details: {}", message);
        }
        ReportError::Config(msg) => {
            eprintln!("Configuration Error: {}", msg);
            eprintln!("Please check the policy configuration and command line options.");
        }
        ReportError::SecurityViolation(msg) => {
            eprintln!("Security Violation: {}", msg);
            eprintln!("The input violates security constraints (e.g., file size limit).");
        }
    }
}
