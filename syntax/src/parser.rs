//! The reader. Turns the parse tree produced by the grammar into plain
//! expressions, handling escapes, numeric ranges and quote sugar.

use crate::{
    ast::*,
    error::ParseError,
    grammar::{self, Rule},
    source::*,
};
use pest::{
    error::{Error, InputLocation},
    iterators::Pair,
};

/// Read all expressions in the given source file, in order.
pub fn parse(file: impl Into<SourceFile>) -> Result<Vec<Expr>, ParseError> {
    let file = file.into();

    let program = match grammar::parse(file.source(), Rule::program) {
        Ok(mut pairs) => pairs.next(),
        Err(e) => return Err(convert_error(e, &file)),
    };

    let reader = Reader {
        file: &file,
    };

    let expressions = program
        .into_iter()
        .flat_map(Pair::into_inner)
        .filter(|pair| pair.as_rule() != Rule::EOI)
        .map(|pair| reader.read_expr(pair))
        .collect::<Result<Vec<_>, _>>()?;

    log::trace!("read {} expressions from {}", expressions.len(), file.name());

    Ok(expressions)
}

struct Reader<'a> {
    file: &'a SourceFile,
}

impl<'a> Reader<'a> {
    fn read_expr(&self, pair: Pair<'_, Rule>) -> Result<Expr, ParseError> {
        let span = Span::from(pair.as_span());

        let kind = match pair.as_rule() {
            Rule::nil => ExprKind::Nil,
            Rule::boolean => ExprKind::Bool(pair.as_str() == "true"),
            Rule::integer => match pair.as_str().parse() {
                Ok(value) => ExprKind::Int(value),
                Err(_) => return Err(self.error("integer literal out of range", span)),
            },
            Rule::float => match pair.as_str().parse() {
                Ok(value) => ExprKind::Float(value),
                Err(_) => return Err(self.error("invalid float literal", span)),
            },
            Rule::string => {
                let raw = pair.into_inner().next().map(|inner| inner.as_str()).unwrap_or("");
                ExprKind::String(self.unescape(raw, span)?)
            }
            Rule::symbol => ExprKind::Symbol(pair.as_str().to_owned()),
            Rule::quoted => {
                let quoted = match pair.into_inner().next() {
                    Some(inner) => self.read_expr(inner)?,
                    None => return Err(self.error("expected expression after quote", span)),
                };

                ExprKind::List(vec![Expr::new(ExprKind::Symbol("quote".into()), span), quoted], None)
            }
            Rule::list => {
                let mut items = Vec::new();
                let mut tail = None;

                for child in pair.into_inner() {
                    if child.as_rule() == Rule::dotted_tail {
                        let child_span = Span::from(child.as_span());

                        match child.into_inner().find(|p| p.as_rule() != Rule::dot) {
                            Some(expr) => tail = Some(Box::new(self.read_expr(expr)?)),
                            None => return Err(self.error("expected expression after '.'", child_span)),
                        }
                    } else {
                        items.push(self.read_expr(child)?);
                    }
                }

                if tail.is_some() && items.is_empty() {
                    return Err(self.error("dotted list requires at least one item before '.'", span));
                }

                ExprKind::List(items, tail)
            }
            Rule::array => ExprKind::Array(
                pair.into_inner()
                    .map(|child| self.read_expr(child))
                    .collect::<Result<_, _>>()?,
            ),
            rule => return Err(self.error(format!("unexpected {:?}", rule), span)),
        };

        Ok(Expr::new(kind, span))
    }

    fn unescape(&self, raw: &str, span: Span) -> Result<String, ParseError> {
        let mut string = String::with_capacity(raw.len());
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            if c != '\\' {
                string.push(c);
                continue;
            }

            string.push(match chars.next() {
                Some('n') => '\n',
                Some('t') => '\t',
                Some('r') => '\r',
                Some('0') => '\0',
                Some('\\') => '\\',
                Some('"') => '"',
                Some(other) => return Err(self.error(format!("unknown escape sequence '\\{}'", other), span)),
                None => return Err(self.error("unterminated escape sequence", span)),
            });
        }

        Ok(string)
    }

    fn error(&self, message: impl Into<String>, span: Span) -> ParseError {
        ParseError::new(message, span, self.file.clone())
    }
}

fn convert_error(error: Error<Rule>, file: &SourceFile) -> ParseError {
    let (start, end) = match error.location {
        InputLocation::Pos(pos) => (pos, pos),
        InputLocation::Span(span) => span,
    };

    let position = |offset| {
        pest::Position::new(file.source(), offset)
            .map(Position::from)
            .unwrap_or_default()
    };

    let span = Span {
        start: position(start),
        end: position(end),
    };

    ParseError::new(error.variant.message().into_owned(), span, file.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_one(source: &str) -> Expr {
        let mut exprs = parse(source).unwrap();
        assert_eq!(exprs.len(), 1);
        exprs.remove(0)
    }

    #[test]
    fn atoms() {
        assert_eq!(read_one("nil").kind, ExprKind::Nil);
        assert_eq!(read_one("true").kind, ExprKind::Bool(true));
        assert_eq!(read_one("-42").kind, ExprKind::Int(-42));
        assert_eq!(read_one("2.5").kind, ExprKind::Float(2.5));
        assert_eq!(read_one("set!").kind, ExprKind::Symbol("set!".into()));
        assert_eq!(read_one("nil?").kind, ExprKind::Symbol("nil?".into()));
        assert_eq!(read_one("-").kind, ExprKind::Symbol("-".into()));
        assert_eq!(read_one("1+").kind, ExprKind::Symbol("1+".into()));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(read_one(r#""a\"b\n""#).kind, ExprKind::String("a\"b\n".into()));
        assert_eq!(read_one(r#""""#).kind, ExprKind::String(String::new()));
        assert!(parse(r#""bad \q""#).is_err());
    }

    #[test]
    fn dotted_lists() {
        match read_one("(a b . c)").kind {
            ExprKind::List(items, Some(tail)) => {
                assert_eq!(items.len(), 2);
                assert_eq!(tail.as_symbol(), Some("c"));
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(format!("{:?}", read_one("(a ... b)")), "(a ... b)");
    }

    #[test]
    fn quote_sugar() {
        assert_eq!(format!("{:?}", read_one("'(1 [2 x])")), "(quote (1 [2 x]))");
    }

    #[test]
    fn comments_and_lines() {
        let exprs = parse("; leading comment\n(def x 1)\n\n  y ; trailing\n").unwrap();

        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[0].line(), 2);
        assert_eq!(exprs[1].line(), 4);
        assert_eq!(exprs[1].span.start.column, 3);
    }

    #[test]
    fn errors_report_line() {
        let error = parse(SourceFile::named("broken.sap", "(def x 1)\n(def y")).unwrap_err();

        assert_eq!(error.line(), 2);
        assert!(error.to_string().contains("broken.sap:2:"));
    }

    #[test]
    fn integer_out_of_range() {
        let error = parse("99999999999999999999").unwrap_err();
        assert!(error.message.contains("out of range"));
    }
}
