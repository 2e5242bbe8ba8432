use crate::source::*;
use std::{error::Error, fmt};

/// Describes an error that occurred while reading source text.
#[derive(Clone)]
pub struct ParseError {
    /// The error message. This is a string instead of an enum because the
    /// messages can be highly specific.
    pub message: String,

    /// The span in the source the error occurred in.
    pub span: Span,

    /// The source file the error occurred in.
    pub file: SourceFile,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span, file: SourceFile) -> Self {
        Self {
            message: message.into(),
            span,
            file,
        }
    }

    /// The line the error starts on. Begins at 1.
    pub fn line(&self) -> usize {
        self.span.start.line
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{}\n{}:{}:{}",
            self.message,
            self.file.name(),
            self.span.start.line,
            self.span.start.column,
        )?;

        let source = self.file.source();
        let start = self.span.start.offset.min(source.len());
        let end = self.span.end.offset.clamp(start, source.len());

        let starting_offset = source[..start].rfind('\n').map(|offset| offset + 1).unwrap_or(0);
        let ending_offset = source[end..].find('\n').map(|offset| offset + end).unwrap_or(source.len());

        for line in source[starting_offset..ending_offset].lines() {
            writeln!(f, "| {}", line.trim())?;
        }

        Ok(())
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Error for ParseError {}
