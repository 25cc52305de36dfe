//! Scoped indentation for nested textual output.
//!
//! The formatter knows nothing about declarations. It offers four
//! directives (open a scope, close a scope, break the line, emit a
//! separating space) plus plain text, and keeps track of the current
//! depth so that a document can be checked for balance when it is
//! finished.

use std::io::Write;

use crate::error::CoreError;

const INDENT_WIDTH: usize = 2;

pub struct Formatter<W: Write> {
    out: W,
    depth: usize,
    /// A line break was emitted but the padding for the new line is
    /// written only once something visible follows.
    pad_pending: bool,
}

impl<W: Write> Formatter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            depth: 0,
            pad_pending: false,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Open a scope.
    pub fn indent(&mut self) -> &mut Self {
        self.depth += 1;
        self
    }

    /// Close the innermost scope. Closing a scope that was never opened
    /// means the caller produced unbalanced structure.
    pub fn outdent(&mut self) -> Result<&mut Self, CoreError> {
        if self.depth == 0 {
            return Err(CoreError::UnbalancedScope(
                "close-scope without a matching open-scope".to_string(),
            ));
        }
        self.depth -= 1;
        Ok(self)
    }

    pub fn line(&mut self) -> Result<&mut Self, CoreError> {
        writeln!(self.out)?;
        self.pad_pending = true;
        Ok(self)
    }

    pub fn nbsp(&mut self) -> Result<&mut Self, CoreError> {
        self.text(" ")
    }

    /// Write `text`, turning each embedded newline into a line break at
    /// the current depth.
    pub fn text(&mut self, text: &str) -> Result<&mut Self, CoreError> {
        for (i, piece) in text.split('\n').enumerate() {
            if i > 0 {
                self.line()?;
            }
            if piece.is_empty() {
                continue;
            }
            if self.pad_pending {
                write!(self.out, "{:width$}", "", width = self.depth * INDENT_WIDTH)?;
                self.pad_pending = false;
            }
            self.out.write_all(piece.as_bytes())?;
        }
        Ok(self)
    }

    /// Run `body` one scope deeper. The scope is closed on every exit
    /// path, including when `body` fails.
    pub fn nested<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let depth = self.depth;
        self.indent();
        let result = body(self);
        if self.depth != depth + 1 {
            return Err(CoreError::UnbalancedScope(format!(
                "nested scope left at depth {} instead of {}",
                self.depth,
                depth + 1
            )));
        }
        self.outdent()?;
        result
    }

    /// Hand back the sink. Every open-scope must have been closed.
    pub fn finish(mut self) -> Result<W, CoreError> {
        if self.depth != 0 {
            return Err(CoreError::UnbalancedScope(format!(
                "{} scope(s) still open at end of document",
                self.depth
            )));
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Lay out a fragment into a fresh string. Used for sub-terms that are
/// later spliced into an enclosing formatter.
pub fn render_to_string(
    body: impl FnOnce(&mut Formatter<Vec<u8>>) -> Result<(), CoreError>,
) -> Result<String, CoreError> {
    let mut fmt = Formatter::new(Vec::new());
    body(&mut fmt)?;
    let bytes = fmt.finish()?;
    // Only `&str` pieces are ever written, so the buffer is valid UTF-8.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
