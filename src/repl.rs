use std::borrow::Cow;
use std::io::{self, BufRead, Write};

use crossterm::tty::IsTty;
use reedline::{
    ColumnarMenu, Completer, Emacs, KeyCode, KeyModifiers, MenuBuilder, Prompt, PromptEditMode,
    PromptHistorySearch, PromptHistorySearchStatus, Reedline, ReedlineEvent, ReedlineMenu, Signal,
    default_emacs_keybindings,
};
use tracing::debug;

use crate::error::{EvalError, LineEditingUnavailable};
use crate::evaluator::Evaluator;

pub const PRIMARY_PROMPT: &str = ">>> ";
pub const CONTINUATION_PROMPT: &str = "... ";

const COMPLETION_MENU: &str = "completion_menu";

/// `>>>` / `...` prompt
#[derive(Debug, Default)]
struct PyPlayPrompt {
    is_continuation: bool,
}

impl PyPlayPrompt {
    fn text(&self) -> &'static str {
        if self.is_continuation {
            CONTINUATION_PROMPT
        } else {
            PRIMARY_PROMPT
        }
    }
}

impl Prompt for PyPlayPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        // Use ANSI reset code to ensure white/default terminal color
        Cow::Owned(format!("\x1b[0m{}", self.text()))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!("({}reverse search) ", prefix))
    }
}

enum ReadOutcome {
    Line(String),
    Interrupted,
    Eof,
}

/// Source of input lines for the loop
pub enum LineReader {
    /// reedline editor with history and tab completion
    Editor(Box<Reedline>),
    /// Unadorned lines from stdin or any other buffered source
    Plain(Box<dyn BufRead>),
}

impl LineReader {
    pub fn plain() -> Self {
        Self::from_reader(io::stdin().lock())
    }

    pub fn from_reader(source: impl BufRead + 'static) -> Self {
        LineReader::Plain(Box::new(source))
    }

    /// Editor with Tab bound to a completion menu over `completer`
    pub fn with_line_editing(
        completer: Option<Box<dyn Completer>>,
    ) -> Result<Self, LineEditingUnavailable> {
        if !io::stdin().is_tty() {
            return Err(LineEditingUnavailable::NotATerminal);
        }

        let mut keybindings = default_emacs_keybindings();
        keybindings.add_binding(
            KeyModifiers::NONE,
            KeyCode::Tab,
            ReedlineEvent::UntilFound(vec![
                ReedlineEvent::Menu(COMPLETION_MENU.to_string()),
                ReedlineEvent::MenuNext,
            ]),
        );

        let mut editor = Reedline::create().with_edit_mode(Box::new(Emacs::new(keybindings)));
        if let Some(completer) = completer {
            let menu = ColumnarMenu::default().with_name(COMPLETION_MENU);
            editor = editor
                .with_completer(completer)
                .with_menu(ReedlineMenu::EngineCompleter(Box::new(menu)))
                .with_quick_completions(true)
                .with_partial_completions(true);
        }

        Ok(LineReader::Editor(Box::new(editor)))
    }

    fn read(&mut self, prompt: &PyPlayPrompt) -> io::Result<ReadOutcome> {
        match self {
            LineReader::Editor(editor) => match editor.read_line(prompt)? {
                Signal::Success(line) => Ok(ReadOutcome::Line(line)),
                Signal::CtrlC => Ok(ReadOutcome::Interrupted),
                Signal::CtrlD => Ok(ReadOutcome::Eof),
                #[allow(unreachable_patterns)]
                _ => Ok(ReadOutcome::Interrupted),
            },
            LineReader::Plain(source) => {
                let mut stdout = io::stdout();
                write!(stdout, "{}", prompt.text())?;
                stdout.flush()?;

                let mut line = String::new();
                if source.read_line(&mut line)? == 0 {
                    return Ok(ReadOutcome::Eof);
                }
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                Ok(ReadOutcome::Line(line))
            }
        }
    }
}

/// Enable line editing, or print a notice and fall back to plain input
pub fn install_line_editing(
    completer: Option<Box<dyn Completer>>,
    out: &mut dyn Write,
) -> io::Result<LineReader> {
    match LineReader::with_line_editing(completer) {
        Ok(reader) => Ok(reader),
        Err(err) => {
            debug!(error = %err, "line editing unavailable");
            writeln!(out, "Line editing not available.")?;
            Ok(LineReader::plain())
        }
    }
}

/// Read-eval-print until end of input or an exit request; returns the exit
/// status
pub fn run<E: Evaluator + ?Sized>(evaluator: &E, mut reader: LineReader) -> anyhow::Result<i32> {
    let mut buffer = String::new();
    let mut prompt = PyPlayPrompt::default();

    loop {
        prompt.is_continuation = !buffer.is_empty();

        let mut outcome = reader.read(&prompt)?;
        // A SIGINT that arrived while blocked in a plain read is only
        // recorded; it discards the line instead of firing later
        if matches!(outcome, ReadOutcome::Line(_)) && evaluator.take_interrupt() {
            outcome = ReadOutcome::Interrupted;
        }

        match outcome {
            ReadOutcome::Line(line) => {
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);

                if !evaluator.is_complete(&buffer) {
                    continue;
                }

                let statement = std::mem::take(&mut buffer);
                if statement.trim().is_empty() {
                    continue;
                }

                match evaluator.run_interactive(&statement) {
                    Ok(()) => {}
                    Err(EvalError::Exit(status)) => return Ok(status),
                    Err(err) => eprint!("{err}"),
                }
            }
            ReadOutcome::Interrupted => {
                println!("KeyboardInterrupt");
                buffer.clear();
            }
            ReadOutcome::Eof => {
                println!();
                return Ok(0);
            }
        }
    }
}

/// Process exit status for an interpreter exit code, truncated to a byte
/// as the OS does
pub fn process_status(status: i32) -> u8 {
    (status & 0xff) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::io::Cursor;

    use crate::evaluator::Helpers;

    /// Records statements; `fail` raises, `quit` exits with status 4
    #[derive(Default)]
    struct Recorder {
        ran: RefCell<Vec<String>>,
        reads: Cell<usize>,
        interrupt_on_read: Option<usize>,
    }

    impl Evaluator for Recorder {
        fn run(&self, statement: &str) -> Result<(), EvalError> {
            self.ran.borrow_mut().push(statement.to_string());
            match statement {
                "fail" => Err(EvalError::raised("NameError: fail\n")),
                "quit" => Err(EvalError::Exit(4)),
                _ => Ok(()),
            }
        }

        fn is_complete(&self, source: &str) -> bool {
            let opens_block = source.lines().next().is_some_and(|line| line.ends_with(':'));
            !opens_block || source.ends_with('\n')
        }

        fn define_helpers(&self, _helpers: &Helpers) -> Result<(), EvalError> {
            Ok(())
        }

        fn take_interrupt(&self) -> bool {
            let read = self.reads.get() + 1;
            self.reads.set(read);
            self.interrupt_on_read == Some(read)
        }
    }

    fn run_lines(evaluator: &Recorder, input: &str) -> i32 {
        run(evaluator, LineReader::from_reader(Cursor::new(input.to_string()))).unwrap()
    }

    #[test]
    fn end_of_input_exits_cleanly() {
        let evaluator = Recorder::default();
        assert_eq!(run_lines(&evaluator, "x = 1\ny = 2\n"), 0);
        assert_eq!(*evaluator.ran.borrow(), vec!["x = 1", "y = 2"]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let evaluator = Recorder::default();
        run_lines(&evaluator, "\n   \nx = 1\n\n");
        assert_eq!(*evaluator.ran.borrow(), vec!["x = 1"]);
    }

    #[test]
    fn blocks_are_buffered_until_complete() {
        let evaluator = Recorder::default();
        run_lines(&evaluator, "if x:\n    y = 2\n\nz = 3\n");
        assert_eq!(*evaluator.ran.borrow(), vec!["if x:\n    y = 2\n", "z = 3"]);
    }

    #[test]
    fn errors_do_not_end_the_session() {
        let evaluator = Recorder::default();
        assert_eq!(run_lines(&evaluator, "fail\nafter\n"), 0);
        assert_eq!(*evaluator.ran.borrow(), vec!["fail", "after"]);
    }

    #[test]
    fn exit_request_returns_its_status() {
        let evaluator = Recorder::default();
        assert_eq!(run_lines(&evaluator, "x = 1\nquit\nnever\n"), 4);
        assert_eq!(*evaluator.ran.borrow(), vec!["x = 1", "quit"]);
    }

    #[test]
    fn pending_interrupt_discards_the_line_and_buffer() {
        let evaluator = Recorder {
            interrupt_on_read: Some(2),
            ..Recorder::default()
        };
        run_lines(&evaluator, "if x:\n    y = 2\nz = 3\n");
        assert_eq!(*evaluator.ran.borrow(), vec!["z = 3"]);
    }

    #[test]
    fn status_is_truncated_to_a_byte() {
        assert_eq!(process_status(0), 0);
        assert_eq!(process_status(3), 3);
        assert_eq!(process_status(256), 0);
        assert_eq!(process_status(-1), 255);
    }
}
