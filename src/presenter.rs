//! Turns compile outcomes into the text shown in the output pane.

use serde::Serialize;

use crate::client::CompileOutcome;

pub const NO_STDOUT: &str = "(No standard output)";
pub const UNKNOWN_ERROR: &str = "Unknown error";
pub const EXECUTING: &str = "Executing...";
pub const OUTPUT_PLACEHOLDER: &str = "Output will appear here...";

/// Display text plus the flag used to emphasize it as an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PresentedResult {
    pub text: String,
    pub is_error: bool,
}

/// Format an outcome for display.
pub fn present(outcome: &CompileOutcome) -> PresentedResult {
    let mut text = String::new();
    if let Some(code) = outcome.exit_code() {
        text.push_str(&format!("Exit Code: {code}\n\n"));
    }

    match outcome {
        CompileOutcome::Success { stdout, stderr, .. } => {
            text.push_str("Output:\n");
            text.push_str(or_fallback(stdout, NO_STDOUT));
            if !stderr.is_empty() {
                text.push_str("\n\nStderr:\n");
                text.push_str(stderr);
            }
        }
        CompileOutcome::ExecutionFailure {
            stdout,
            stderr,
            error,
            ..
        } => {
            text.push_str("Error/Stderr:\n");
            text.push_str(or_fallback(stderr, or_fallback(error, UNKNOWN_ERROR)));
            if !stdout.is_empty() {
                text.push_str("\n\nStdout (before error):\n");
                text.push_str(stdout);
            }
        }
        CompileOutcome::TransportFailure { message } => {
            text.push_str("Error:\n");
            text.push_str(message);
        }
    }

    let is_error = is_error_text(&text);
    PresentedResult { text, is_error }
}

/// Textual error sniffing, applied the same way to every outcome.
///
/// This looks only at the text, so a successful program printing `error:`
/// is flagged too.
pub fn is_error_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("error:") || lower.contains("compilation error:")
}

/// What the output pane shows for the current state.
pub fn display_text(loading: bool, output: &str) -> &str {
    if loading {
        EXECUTING
    } else if output.is_empty() {
        OUTPUT_PLACEHOLDER
    } else {
        output
    }
}

/// Output text for a terminal, painted red when the result reads as an error.
pub fn render(result: &PresentedResult, color: bool) -> String {
    if color && result.is_error {
        format!("\x1b[31m{}\x1b[0m", result.text)
    } else {
        result.text.clone()
    }
}

pub fn run_label(loading: bool) -> &'static str {
    if loading { "Running..." } else { "Run Code" }
}

fn or_fallback<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}
