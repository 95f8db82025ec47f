use pyo3::prelude::*;
use pyo3::types::PyDict;
use reedline::{Completer, Span, Suggestion};
use tracing::debug;

const MAX_CANDIDATES: usize = 500;

/// Tab completion from Python's `rlcompleter` over the session namespace
pub struct PyCompleter {
    namespace: Py<PyDict>,
}

impl PyCompleter {
    pub fn new(namespace: Py<PyDict>) -> Self {
        Self { namespace }
    }

    fn candidates(&self, word: &str) -> PyResult<Vec<String>> {
        Python::attach(|py| {
            let completer = py
                .import("rlcompleter")?
                .getattr("Completer")?
                .call1((self.namespace.bind(py),))?;

            let mut found = Vec::new();
            for state in 0..MAX_CANDIDATES {
                let candidate = completer.call_method1("complete", (word, state))?;
                if candidate.is_none() {
                    break;
                }
                found.push(candidate.extract::<String>()?);
            }
            Ok(found)
        })
    }
}

impl Completer for PyCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let Some(before) = line.get(..pos) else {
            return Vec::new();
        };
        let start = word_start(before);
        let word = &before[start..];
        if word.is_empty() {
            return Vec::new();
        }

        let candidates = match self.candidates(word) {
            Ok(candidates) => candidates,
            Err(err) => {
                debug!(word, error = %err, "completion failed");
                return Vec::new();
            }
        };

        candidates
            .into_iter()
            .map(|value| Suggestion {
                value,
                span: Span::new(start, pos),
                append_whitespace: false,
                ..Suggestion::default()
            })
            .collect()
    }
}

/// Byte offset where the dotted identifier ending at the cursor begins
fn word_start(before: &str) -> usize {
    before
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '.')
        .last()
        .map_or(before.len(), |(i, _)| i)
}
