use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::Display;
use std::io::{Result as IoResult, Write};
use std::rc::Rc;

/// Source of operator input, one line per prompt.
///
/// `Ok(None)` means no more input will arrive (end of file or Ctrl-C).
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Terminal line editor with history, used by the binary.
pub struct EditorReader {
    editor: DefaultEditor,
}

impl EditorReader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineReader for EditorReader {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                self.editor.add_history_entry(line.as_str())?;
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) => {
                tracing::debug!("input interrupted");
                Ok(None)
            }
            Err(ReadlineError::Eof) => {
                tracing::debug!("input reached end of file");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Memory-backed reader that replays a fixed script of lines.
///
/// Prompts it was asked to show are recorded so callers can inspect them.
pub struct ScriptedReader {
    lines: VecDeque<String>,
    prompts: Rc<RefCell<Vec<String>>>,
}

impl ScriptedReader {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            prompts: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Convenience: create reader and return (reader, prompts handle).
    pub fn with_handle<I, S>(lines: I) -> (Self, Rc<RefCell<Vec<String>>>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let reader = Self::new(lines);
        let rc = reader.prompts.clone();
        (reader, rc)
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.lines.pop_front())
    }
}

/// Memory-backed writer for capturing menu output.
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self {
            buf: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Convenience: create writer and return (writer, rc_handle).
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let mw = MemWriter::new();
        let rc = mw.buf.clone();
        (mw, rc)
    }
}

impl Default for MemWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

/// The operator's terminal as seen by the menus: a line source plus an output sink.
pub struct Console {
    reader: Box<dyn LineReader>,
    out: Box<dyn Write>,
}

impl Console {
    pub fn new(reader: Box<dyn LineReader>, out: Box<dyn Write>) -> Self {
        Self { reader, out }
    }

    /// Console bound to the real terminal.
    pub fn interactive() -> Result<Self> {
        Ok(Self::new(
            Box::new(EditorReader::new()?),
            Box::new(std::io::stdout()),
        ))
    }

    /// Show `prompt` and wait for one line of input.
    pub fn prompt(&mut self, prompt: &str) -> Result<Option<String>> {
        self.out.flush()?;
        self.reader.read_line(prompt)
    }

    /// Print one line of output.
    pub fn say(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
