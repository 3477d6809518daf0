//! Composition root: one editing session wired to a compile client.

use std::cell::{Cell, RefCell};

use serde::Serialize;
use tracing::{debug, info};

use crate::client::{CompileClient, CompileOutcome, CompileRequest};
use crate::editor::{BufferChange, EditorHandle, EditorState};
use crate::language::Language;
use crate::presenter::{self, PresentedResult};

/// Everything the user can see and change, owned in one place.
pub struct Session {
    pub editor: EditorState,
    pub stdin: String,
    pub output: Option<PresentedResult>,
}

impl Session {
    pub fn new(language: Language) -> Self {
        Self {
            editor: EditorState::new(language),
            stdin: String::new(),
            output: None,
        }
    }

    fn request(&self) -> CompileRequest {
        CompileRequest::new(self.editor.language(), self.editor.code(), self.stdin.clone())
    }
}

/// Session plus the client it submits through.
///
/// Single-threaded by construction: state sits behind `RefCell`/`Cell` and
/// no borrow is held across the network await, so a second `submit` issued
/// while one is outstanding only sees the loading flag.
pub struct App<C> {
    client: C,
    session: RefCell<Session>,
    loading: Cell<bool>,
}

/// Clears the loading flag however `submit` exits.
struct LoadingGuard<'a>(&'a Cell<bool>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<C: CompileClient> App<C> {
    pub fn new(client: C, language: Language) -> Self {
        Self {
            client,
            session: RefCell::new(Session::new(language)),
            loading: Cell::new(false),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn mount(&self, handle: Box<dyn EditorHandle>) {
        self.session.borrow_mut().editor.mount(handle);
    }

    pub fn is_mounted(&self) -> bool {
        self.session.borrow().editor.is_mounted()
    }

    pub fn editor_label(&self) -> Option<String> {
        self.session.borrow().editor.handle_label()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn language(&self) -> Language {
        self.session.borrow().editor.language()
    }

    pub fn code(&self) -> String {
        self.session.borrow().editor.code()
    }

    pub fn is_pristine(&self) -> bool {
        self.session.borrow().editor.is_pristine()
    }

    /// Change notification from the editor.
    pub fn edit_code(&self, text: impl Into<String>) {
        self.session.borrow_mut().editor.set_code(text);
    }

    /// Switch languages; the previous run's output no longer applies.
    pub fn select_language(&self, language: Language) -> BufferChange {
        let mut session = self.session.borrow_mut();
        let change = session.editor.set_language(language);
        session.output = None;
        change
    }

    pub fn stdin(&self) -> String {
        self.session.borrow().stdin.clone()
    }

    pub fn set_stdin(&self, text: impl Into<String>) {
        self.session.borrow_mut().stdin = text.into();
    }

    pub fn clear_stdin(&self) {
        self.session.borrow_mut().stdin.clear();
    }

    pub fn output(&self) -> Option<PresentedResult> {
        self.session.borrow().output.clone()
    }

    /// Text for the output pane, including the loading and empty placeholders.
    pub fn display_text(&self) -> String {
        let session = self.session.borrow();
        let output = session.output.as_ref().map_or("", |result| result.text.as_str());
        presenter::display_text(self.loading.get(), output).to_string()
    }

    /// Run the current buffer once.
    ///
    /// Returns `None` without contacting the service when a run is already
    /// outstanding or no editor is mounted.
    pub async fn submit(&self) -> Option<RunReport> {
        let request = {
            let mut session = self.session.borrow_mut();
            if !session.editor.is_mounted() {
                debug!("submit ignored: no editor mounted");
                return None;
            }
            if self.loading.get() {
                debug!("submit ignored: a run is already in flight");
                return None;
            }
            self.loading.set(true);
            session.output = None;
            session.request()
        };
        let _loading = LoadingGuard(&self.loading);

        let outcome = self.client.submit(&request).await;
        let presented = presenter::present(&outcome);
        info!(
            language = %request.language,
            exit_code = ?outcome.exit_code(),
            is_error = presented.is_error,
            "run finished"
        );

        self.session.borrow_mut().output = Some(presented.clone());
        Some(RunReport {
            request,
            outcome,
            presented,
        })
    }
}

/// One finished run: what was sent, what came back, and how it was shown.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub request: CompileRequest,
    pub outcome: CompileOutcome,
    pub presented: PresentedResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CONNECT_FAILURE;
    use crate::editor::{FileEditor, MemoryEditor};

    /// Echoes the request back as stdout after yielding once, counting calls.
    #[derive(Default)]
    struct EchoClient {
        calls: Cell<usize>,
        last: RefCell<Option<CompileRequest>>,
    }

    impl CompileClient for EchoClient {
        async fn submit(&self, request: &CompileRequest) -> CompileOutcome {
            self.calls.set(self.calls.get() + 1);
            *self.last.borrow_mut() = Some(request.clone());
            tokio::task::yield_now().await;
            CompileOutcome::Success {
                exit_code: 0,
                stdout: request.code.clone(),
                stderr: request.stdin.clone(),
            }
        }
    }

    struct Unreachable;

    impl CompileClient for Unreachable {
        async fn submit(&self, _request: &CompileRequest) -> CompileOutcome {
            CompileOutcome::transport(CONNECT_FAILURE)
        }
    }

    fn mounted_app<C: CompileClient>(client: C) -> App<C> {
        let app = App::new(client, Language::Python);
        app.mount(Box::new(MemoryEditor::new()));
        app
    }

    #[tokio::test]
    async fn request_reaches_client_unchanged() {
        let app = mounted_app(EchoClient::default());
        app.select_language(Language::Cpp);
        app.set_stdin("3 4\n");

        let report = app.submit().await.expect("mounted app submits");
        let expected = CompileRequest::new(Language::Cpp, Language::Cpp.default_code(), "3 4\n");

        assert_eq!(report.request, expected);
        assert_eq!(app.client().last.borrow().as_ref(), Some(&expected));
        assert_eq!(
            report.outcome,
            CompileOutcome::Success {
                exit_code: 0,
                stdout: expected.code.clone(),
                stderr: expected.stdin.clone(),
            }
        );
    }

    #[tokio::test]
    async fn overlapping_submits_send_one_request() {
        let app = mounted_app(EchoClient::default());

        let (first, second) = tokio::join!(app.submit(), app.submit());

        assert!(
            first.is_some() ^ second.is_some(),
            "exactly one submit runs while the other sees the loading flag"
        );
        assert_eq!(app.client().calls.get(), 1);
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn unmounted_editor_makes_submit_a_no_op() {
        let app = App::new(EchoClient::default(), Language::Python);
        assert!(app.submit().await.is_none());
        assert_eq!(app.client().calls.get(), 0);
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn transport_failure_is_presented_and_clears_loading() {
        let app = mounted_app(Unreachable);
        let report = app.submit().await.expect("submitted");

        assert!(report.presented.is_error);
        assert_eq!(report.presented.text, format!("Error:\n{CONNECT_FAILURE}"));
        assert_eq!(app.output(), Some(report.presented));
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn language_switch_clears_output_but_not_stdin() {
        let app = mounted_app(EchoClient::default());
        app.set_stdin("input");
        app.submit().await.expect("submitted");
        assert!(app.output().is_some());

        app.select_language(Language::Cpp);
        assert!(app.output().is_none());
        assert_eq!(app.stdin(), "input");
        assert_eq!(app.display_text(), presenter::OUTPUT_PLACEHOLDER);

        app.clear_stdin();
        assert!(app.stdin().is_empty());
    }

    #[tokio::test]
    async fn edited_file_is_submitted_after_switch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scratch.txt");
        let app = App::new(EchoClient::default(), Language::Python);
        app.mount(Box::new(FileEditor::new(&path)));

        std::fs::write(&path, "print('edited')").expect("user edit");
        app.edit_code("print('edited')");
        assert_eq!(app.select_language(Language::Cpp), BufferChange::Keep);
        assert!(!app.is_pristine());

        let report = app.submit().await.expect("submitted");
        assert_eq!(report.request.language, Language::Cpp);
        assert_eq!(report.request.code, "print('edited')");
    }

    #[tokio::test]
    async fn untouched_template_follows_language() {
        let app = mounted_app(EchoClient::default());
        assert_eq!(
            app.select_language(Language::Cpp),
            BufferChange::Replace(Language::Cpp.default_code())
        );
        assert_eq!(app.code(), Language::Cpp.default_code());
        assert_eq!(app.language(), Language::Cpp);
    }
}
