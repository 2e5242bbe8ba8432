//! Line-oriented read-eval-print loop.

use sapling_runtime::{prelude::*, syntax::source::SourceFile};
use std::{
    io::{self, BufRead, Write},
    mem,
};

const PROMPT: &str = "sapling> ";

/// Evaluate lines from `input` until it is exhausted, printing results to
/// `output`. Errors are reported and the loop continues.
///
/// A line that leaves an expression unfinished is joined with the lines after
/// it until the expression is complete.
pub fn run(interpreter: &mut Interpreter, mut input: impl BufRead, mut output: impl Write, prompt: bool) -> io::Result<()> {
    let mut buffer = String::new();
    let mut line_number = 0;

    loop {
        if prompt {
            write!(output, "{}", if buffer.is_empty() { PROMPT } else { "... " })?;
            output.flush()?;
        }

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        line_number += 1;

        buffer.push_str(&line);

        if buffer.trim().is_empty() {
            buffer.clear();
            continue;
        }

        if !is_balanced(&buffer) {
            continue;
        }

        let file = SourceFile::named(format!("<stdin:{}>", line_number), mem::take(&mut buffer));

        match interpreter.eval(file) {
            Ok(Value::Nil) => {}
            Ok(value) => writeln!(output, "{:?}", value)?,
            Err(e) => log::error!("{}", e),
        }
    }

    if !buffer.trim().is_empty() {
        log::warn!("discarding incomplete input at end of stream");
    }

    Ok(())
}

/// Whether every opened list and array has been closed, ignoring string
/// contents and comments.
fn is_balanced(text: &str) -> bool {
    let mut depth = 0i32;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            '"' => {
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    // Too many closers is a syntax error the reader should report.
    depth <= 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(input: &str) -> String {
        let mut interpreter = Interpreter::new();
        let mut output = Vec::new();

        run(&mut interpreter, input.as_bytes(), &mut output, false).unwrap();

        String::from_utf8(output).unwrap()
    }

    #[test]
    fn prints_non_nil_results() {
        assert_eq!(session("(def x 2)\n(+ x 1)\n\n'(a \"b\")\n"), "2\n3\n(a \"b\")\n");
        assert_eq!(session("nil\n"), "");
    }

    #[test]
    fn joins_unfinished_lines() {
        assert_eq!(session("(+ 1\n   2)\n"), "3\n");
        assert_eq!(session("(def s \"(\")\ns\n"), "\"(\"\n\"(\"\n");
    }

    #[test]
    fn continues_after_errors() {
        assert_eq!(session("(undefined)\n(+ 1 1)\n"), "2\n");
    }

    #[test]
    fn balance_ignores_strings_and_comments() {
        assert!(is_balanced("(a \")\" b)"));
        assert!(!is_balanced("(a ; )\n"));
        assert!(is_balanced("x"));
    }
}
