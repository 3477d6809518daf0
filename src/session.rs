//! Line-oriented interactive session driving an [`App`].
//!
//! Each input line is one user action (pick a language, attach a file as the
//! editor, set stdin, run). Lines are tokenized with shell quoting rules so
//! paths and stdin text may contain spaces.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::app::App;
use crate::client::CompileClient;
use crate::editor::{BufferChange, EditorHandle, FileEditor};
use crate::language::Language;
use crate::presenter;

const HELP: &str = "\
commands:
  lang <python|cpp>     switch language (untouched templates follow along)
  load <path>           use a source file as the editor buffer
  stdin <text...>       set standard input for the next run
  stdin-file <path>     read standard input from a file
  clear-stdin           forget standard input
  show                  print language, editor and buffer
  run                   submit the buffer to the compile service
  output                print the output pane
  help                  this text
  quit                  leave the session";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    Lang(Language),
    Load(PathBuf),
    Stdin(String),
    StdinFile(PathBuf),
    ClearStdin,
    Show,
    Run,
    Output,
    Help,
    Quit,
}

/// Parse one input line; blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<SessionCommand>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let args = shlex::split(trimmed).ok_or_else(|| anyhow!("unbalanced quotes in '{trimmed}'"))?;
    let Some((verb, rest)) = args.split_first() else {
        return Ok(None);
    };

    let command = match (verb.as_str(), rest) {
        ("lang" | "language", [name]) => SessionCommand::Lang(name.parse()?),
        ("load" | "open", [path]) => SessionCommand::Load(PathBuf::from(path)),
        ("stdin", text) => SessionCommand::Stdin(text.join(" ")),
        ("stdin-file", [path]) => SessionCommand::StdinFile(PathBuf::from(path)),
        ("clear-stdin", []) => SessionCommand::ClearStdin,
        ("show", []) => SessionCommand::Show,
        ("run", []) => SessionCommand::Run,
        ("output", []) => SessionCommand::Output,
        ("help" | "?", []) => SessionCommand::Help,
        ("quit" | "exit", []) => SessionCommand::Quit,
        (other, _) => bail!("unknown or malformed command '{other}'; try `help`"),
    };
    Ok(Some(command))
}

/// Attach `path` as the editor, adopting its text when the file already exists.
pub fn load_file<C: CompileClient>(app: &App<C>, path: PathBuf) -> Result<()> {
    let editor = FileEditor::new(path);
    if let Some(text) = editor.value()? {
        app.edit_code(text);
    }
    app.mount(Box::new(editor));
    Ok(())
}

/// Read commands from `input` until EOF or `quit`, writing responses to `out`.
///
/// Command errors are reported and the loop continues; only IO failures on
/// `input`/`out` end the session with an error.
pub async fn run<C, R, W>(app: &App<C>, input: R, out: &mut W, color: bool) -> Result<()>
where
    C: CompileClient,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    write!(out, "{}> ", app.language())?;
    out.flush()?;

    while let Some(line) = lines.next_line().await.context("while reading session input")? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => {
                write!(out, "{}> ", app.language())?;
                out.flush()?;
                continue;
            }
            Err(err) => {
                writeln!(out, "error: {err:#}")?;
                write!(out, "{}> ", app.language())?;
                out.flush()?;
                continue;
            }
        };
        debug!(?command, "session command");

        if command == SessionCommand::Quit {
            break;
        }
        if let Err(err) = dispatch(app, command, out, color).await {
            writeln!(out, "error: {err:#}")?;
        }
        write!(out, "{}> ", app.language())?;
        out.flush()?;
    }

    writeln!(out)?;
    Ok(())
}

async fn dispatch<C, W>(
    app: &App<C>,
    command: SessionCommand,
    out: &mut W,
    color: bool,
) -> Result<()>
where
    C: CompileClient,
    W: Write,
{
    match command {
        SessionCommand::Lang(language) => match app.select_language(language) {
            BufferChange::Replace(_) => {
                writeln!(out, "switched to {}; loaded starter template", language.display_name())?
            }
            BufferChange::Keep => {
                writeln!(out, "switched to {}; kept your code", language.display_name())?
            }
        },
        SessionCommand::Load(path) => {
            load_file(app, path)?;
            writeln!(
                out,
                "editing {}",
                app.editor_label().unwrap_or_else(|| "(none)".into())
            )?;
        }
        SessionCommand::Stdin(text) => {
            app.set_stdin(text);
            writeln!(out, "stdin set ({} bytes)", app.stdin().len())?;
        }
        SessionCommand::StdinFile(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("while reading {}", path.display()))?;
            app.set_stdin(text);
            writeln!(out, "stdin set ({} bytes)", app.stdin().len())?;
        }
        SessionCommand::ClearStdin => {
            app.clear_stdin();
            writeln!(out, "stdin cleared")?;
        }
        SessionCommand::Show => {
            let editor = app.editor_label().unwrap_or_else(|| "(not mounted)".into());
            let template = if app.is_pristine() { " (starter template)" } else { "" };
            writeln!(out, "language: {}", app.language().display_name())?;
            writeln!(out, "editor: {editor}{template}")?;
            writeln!(out, "stdin: {} bytes", app.stdin().len())?;
            writeln!(out, "{}", app.code())?;
        }
        SessionCommand::Run => {
            writeln!(out, "{}", presenter::run_label(true))?;
            match app.submit().await {
                Some(report) => writeln!(out, "{}", presenter::render(&report.presented, color))?,
                None if !app.is_mounted() => {
                    writeln!(out, "no editor attached; use `load <path>` first")?
                }
                None => writeln!(out, "a run is already in progress")?,
            }
        }
        SessionCommand::Output => match app.output() {
            Some(result) if !app.is_loading() => {
                writeln!(out, "{}", presenter::render(&result, color))?
            }
            _ => writeln!(out, "{}", app.display_text())?,
        },
        SessionCommand::Help => writeln!(out, "{HELP}")?,
        SessionCommand::Quit => {}
    }
    Ok(())
}
