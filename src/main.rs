mod app;
mod client;
mod config;
mod editor;
mod language;
mod presenter;
mod session;

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use app::{App, RunReport};
use client::HttpClient;
use config::{BASE_URL_ENV, Config, DEFAULT_BASE_URL};
use editor::MemoryEditor;
use language::Language;

/// `codepod` sends source code to a remote compile service and shows what
/// the program printed, or why it could not run.
#[derive(Parser, Debug)]
#[command(
    name = "codepod",
    version,
    about = "Run Python or C++ snippets on a remote compile service"
)]
struct Cli {
    /// Base URL of the compile service; requests go to `<base>/compile`.
    #[arg(long, global = true, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    api_base_url: String,

    /// Log request/response details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a source file (or the starter template) once and print the result.
    Run(RunArgs),
    /// Print the starter template for a language.
    Template {
        #[arg(value_enum)]
        language: Language,
    },
    /// List supported languages.
    Languages,
    /// Interactive session: switch languages, edit a file, run repeatedly.
    Session(SessionArgs),
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
enum ReportFormat {
    Human,
    Json,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Language of the submitted source.
    #[arg(short, long, value_enum, default_value_t = Language::Python)]
    language: Language,
    /// Source file to submit; the language's starter template when omitted.
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Standard input passed to the program.
    #[arg(long, value_name = "TEXT", conflicts_with = "stdin_file")]
    stdin: Option<String>,
    /// Read the program's standard input from a file.
    #[arg(long, value_name = "PATH")]
    stdin_file: Option<PathBuf>,
    /// Output format for the result.
    #[arg(long, default_value_t = ReportFormat::Human, value_enum)]
    format: ReportFormat,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            language: Language::Python,
            file: None,
            stdin: None,
            stdin_file: None,
            format: ReportFormat::Human,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct SessionArgs {
    /// Language selected when the session starts.
    #[arg(short, long, value_enum, default_value_t = Language::Python)]
    language: Language,
    /// Source file used as the editor buffer; created from the template if missing.
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    let config = Config::new(cli.api_base_url.clone());
    tracing::debug!(base_url = config.base_url(), "compile service configured");

    match &cli.command {
        Some(Command::Run(run_args)) => run_once(&config, run_args).await,
        Some(Command::Template { language }) => {
            println!("{}", language.default_code());
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Languages) => {
            for language in Language::ALL {
                println!("{} ({})", language.id(), language.display_name());
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Session(args)) => run_session(&config, args).await,
        None => run_once(&config, &cli.run).await,
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose, rust_log.as_deref())?)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

/// `RUST_LOG` when set and valid, else `codepod=warn`; `-v` adds `codepod=debug` on top.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> Result<EnvFilter> {
    let filter = rust_log
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new("codepod=warn"));
    if verbose {
        Ok(filter.add_directive("codepod=debug".parse()?))
    } else {
        Ok(filter)
    }
}

async fn run_once(config: &Config, args: &RunArgs) -> Result<ExitCode> {
    let app = App::new(HttpClient::new(config), args.language);

    if let Some(path) = &args.file {
        let code = fs::read_to_string(path)
            .with_context(|| format!("while reading {}", path.display()))?;
        app.edit_code(code);
    }
    app.mount(Box::new(MemoryEditor::new()));
    app.set_stdin(read_stdin_arg(args)?);

    let report = app
        .submit()
        .await
        .context("editor must be mounted before submitting")?;
    print_report(&report, args.format, io::stdout().is_terminal())?;

    Ok(if report.presented.is_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn read_stdin_arg(args: &RunArgs) -> Result<String> {
    match (&args.stdin, &args.stdin_file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("while reading {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

fn print_report(report: &RunReport, format: ReportFormat, color: bool) -> Result<()> {
    match format {
        ReportFormat::Human => println!("{}", presenter::render(&report.presented, color)),
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report)?;
            println!("{json}");
        }
    }
    Ok(())
}

async fn run_session(config: &Config, args: &SessionArgs) -> Result<ExitCode> {
    let client = HttpClient::new(config);
    let app = App::new(client, args.language);
    if let Some(path) = &args.file {
        session::load_file(&app, path.clone())?;
    }

    let mut out = io::stdout();
    let color = out.is_terminal();
    writeln!(
        out,
        "codepod session against {} (type `help` for commands)",
        app.client().endpoint()
    )?;
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    session::run(&app, input, &mut out, color).await?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn run_defaults_to_python_template_and_human_output() {
        let cli = Cli::try_parse_from(["codepod"]).expect("parse defaults");
        assert!(cli.command.is_none());
        assert_eq!(cli.run.language, Language::Python);
        assert_eq!(cli.run.format, ReportFormat::Human);
        assert!(cli.run.file.is_none());
    }

    #[test]
    fn run_subcommand_captures_sources() {
        let cli = Cli::try_parse_from([
            "codepod",
            "run",
            "--language",
            "cpp",
            "--file",
            "main.cpp",
            "--stdin",
            "1 2",
            "--format",
            "json",
        ])
        .expect("parse run options");
        match cli.command {
            Some(Command::Run(args)) => {
                assert_eq!(args.language, Language::Cpp);
                assert_eq!(args.file.as_deref(), Some(std::path::Path::new("main.cpp")));
                assert_eq!(args.stdin.as_deref(), Some("1 2"));
                assert_eq!(args.format, ReportFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn language_aliases_are_accepted() {
        let cli = Cli::try_parse_from(["codepod", "--language", "c++"]).expect("parse alias");
        assert_eq!(cli.run.language, Language::Cpp);
        assert!(Cli::try_parse_from(["codepod", "--language", "cobol"]).is_err());
    }

    #[test]
    fn stdin_sources_are_mutually_exclusive() {
        let parsed = Cli::try_parse_from([
            "codepod",
            "--stdin",
            "x",
            "--stdin-file",
            "input.txt",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn base_url_flag_overrides_default() {
        let cli = Cli::try_parse_from([
            "codepod",
            "languages",
            "--api-base-url",
            "https://pod.example/api",
        ])
        .expect("parse base url");
        assert_eq!(cli.api_base_url, "https://pod.example/api");
        assert!(matches!(cli.command, Some(Command::Languages)));
    }

    #[test]
    fn base_url_is_read_from_environment() {
        let previous = std::env::var(BASE_URL_ENV).ok();
        unsafe {
            std::env::set_var(BASE_URL_ENV, "http://env.example/api");
        }
        let cli = Cli::try_parse_from(["codepod", "languages"]).expect("parse with env");
        assert_eq!(cli.api_base_url, "http://env.example/api");

        match previous {
            Some(val) => unsafe { std::env::set_var(BASE_URL_ENV, val) },
            None => unsafe { std::env::remove_var(BASE_URL_ENV) },
        }
    }

    #[test]
    fn rust_log_takes_precedence_over_default_level() {
        let filter = log_filter(false, Some("codepod=debug")).expect("filter");
        assert_eq!(filter.to_string(), "codepod=debug");

        let filter = log_filter(false, None).expect("filter");
        assert_eq!(filter.to_string(), "codepod=warn");

        let filter = log_filter(false, Some("")).expect("filter");
        assert_eq!(filter.to_string(), "codepod=warn");
    }

    #[test]
    fn verbose_flag_raises_level() {
        let filter = log_filter(true, None).expect("filter");
        assert!(filter.to_string().contains("codepod=debug"));
    }

    #[test]
    fn stdin_text_wins_and_defaults_to_empty() {
        let args = RunArgs {
            stdin: Some("abc".into()),
            ..RunArgs::default()
        };
        assert_eq!(read_stdin_arg(&args).expect("inline stdin"), "abc");
        assert_eq!(read_stdin_arg(&RunArgs::default()).expect("no stdin"), "");
    }

    #[test]
    fn stdin_file_is_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("input.txt");
        fs::write(&path, "5\n").expect("write input");
        let args = RunArgs {
            stdin_file: Some(path),
            ..RunArgs::default()
        };
        assert_eq!(read_stdin_arg(&args).expect("file stdin"), "5\n");
    }
}
