//! Source buffer state kept in step with the selected language.
//!
//! The buffer is owned here and mirrored into an optional mounted
//! [`EditorHandle`]. Language switches go through [`resolve_buffer`], a pure
//! function of the previous language, the current text and the new language,
//! so the replace-or-keep decision never depends on notification order.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::language::Language;

/// The editing widget: something with a readable and writable value.
pub trait EditorHandle {
    /// Live text; `Ok(None)` when the widget has nothing to show yet.
    ///
    /// An `Err` means the widget holds something that could not be read, which
    /// must never be mistaken for an untouched buffer.
    fn value(&self) -> Result<Option<String>>;
    fn set_value(&mut self, text: &str) -> Result<()>;
    /// Short label used in logs and the session prompt.
    fn label(&self) -> String;
}

/// Editor that only lives in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryEditor {
    text: String,
}

impl MemoryEditor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EditorHandle for MemoryEditor {
    fn value(&self) -> Result<Option<String>> {
        Ok(Some(self.text.clone()))
    }

    fn set_value(&mut self, text: &str) -> Result<()> {
        self.text = text.to_string();
        Ok(())
    }

    fn label(&self) -> String {
        "memory".into()
    }
}

/// Editor backed by a source file: reading the file is the live value,
/// writing it replaces the buffer.
#[derive(Clone, Debug)]
pub struct FileEditor {
    path: PathBuf,
}

impl FileEditor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EditorHandle for FileEditor {
    /// File contents; a missing file reads as `Ok(None)`.
    fn value(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("while reading {}", self.path.display()))
            }
        }
    }

    fn set_value(&mut self, text: &str) -> Result<()> {
        fs::write(&self.path, text)
            .with_context(|| format!("while writing {}", self.path.display()))
    }

    fn label(&self) -> String {
        self.path.display().to_string()
    }
}

/// What a language switch does to the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferChange {
    /// Overwrite the buffer with this canonical default.
    Replace(&'static str),
    /// Leave the current text exactly as it is.
    Keep,
}

/// Decide what happens to `current` when switching from `previous` to `next`.
///
/// Only an untouched template of the previous language (or an empty buffer)
/// is swapped out. Any other text is kept verbatim, even when it is not valid
/// source for `next`.
pub fn resolve_buffer(previous: Language, current: &str, next: Language) -> BufferChange {
    if current.is_empty() || current == previous.default_code() {
        BufferChange::Replace(next.default_code())
    } else {
        BufferChange::Keep
    }
}

/// Selected language plus the text being edited for it.
pub struct EditorState {
    language: Language,
    code: String,
    handle: Option<Box<dyn EditorHandle>>,
}

impl EditorState {
    /// Fresh state showing `language`'s canonical default.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            code: language.default_code().to_string(),
            handle: None,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn is_mounted(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle_label(&self) -> Option<String> {
        self.handle.as_ref().map(|handle| handle.label())
    }

    /// Attach the editing widget and push the current text into it.
    ///
    /// A handle that was already mounted is replaced.
    pub fn mount(&mut self, mut handle: Box<dyn EditorHandle>) {
        if let Err(err) = handle.set_value(&self.code) {
            warn!(editor = %handle.label(), "failed to seed editor: {err:#}");
        }
        debug!(editor = %handle.label(), language = %self.language, "editor mounted");
        self.handle = Some(handle);
    }

    /// Change notification from the widget, or a direct edit without one.
    pub fn set_code(&mut self, text: impl Into<String>) {
        self.code = text.into();
    }

    fn live_text(&self) -> Result<Option<String>> {
        match self.handle.as_ref() {
            Some(handle) => handle.value(),
            None => Ok(None),
        }
    }

    /// Text to submit: the live widget value when readable, else the last known text.
    pub fn code(&self) -> String {
        match self.live_text() {
            Ok(Some(text)) => text,
            Ok(None) => self.code.clone(),
            Err(err) => {
                warn!("editor unreadable, using last known text: {err:#}");
                self.code.clone()
            }
        }
    }

    /// True when the buffer still holds some language's untouched template.
    pub fn is_pristine(&self) -> bool {
        Language::owning_default(&self.code()).is_some()
    }

    /// Switch languages, swapping in `next`'s default only over an untouched template.
    ///
    /// Returns the change that was applied. A widget that cannot be read is
    /// never overwritten. Writing to the widget may fail; that is logged and
    /// the state text is updated regardless.
    pub fn set_language(&mut self, next: Language) -> BufferChange {
        let previous = self.language;
        let current = match self.live_text() {
            Ok(text) => text.unwrap_or_else(|| self.code.clone()),
            Err(err) => {
                warn!(from = %previous, to = %next, "editor unreadable, keeping it: {err:#}");
                self.language = next;
                return BufferChange::Keep;
            }
        };
        let change = resolve_buffer(previous, &current, next);
        self.language = next;

        match change {
            BufferChange::Replace(default) => {
                debug!(from = %previous, to = %next, "replacing untouched template");
                self.code = default.to_string();
                if let Some(handle) = self.handle.as_mut() {
                    if let Err(err) = handle.set_value(default) {
                        warn!(editor = %handle.label(), "failed to write template: {err:#}");
                    }
                }
            }
            BufferChange::Keep => {
                debug!(from = %previous, to = %next, "keeping edited buffer");
                self.code = current;
            }
        }

        change
    }
}
