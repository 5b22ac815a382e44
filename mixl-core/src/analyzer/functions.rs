//! Function definition tracking
//!
//! Two explicit state machines, one per block style:
//!
//! - braces: `Outside -> AwaitingBrace -> InBlock(depth) -> Outside`
//! - indentation: `Outside -> AwaitingBody -> InBlock(indent) -> Outside`

use super::token::{brace_balance, indent_of, is_blank_or_comment, matching_close, split_top_level, Token, TokenKind};
use crate::error::{StructureError, StructureErrorKind};
use crate::language::Syntax;
use mixl_config::GuestLanguage;

/// Where a line sits relative to blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    /// Top-level statement outside any function
    TopLevel,
    /// Inside a non-function block (`if`, loop, class, object literal...)
    Nested,
    /// Part of a function definition (introducer, body, or closing line)
    InFunction,
}

/// Function introducer: name, parameters, position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub params: Vec<String>,
    /// Line index inside the segment
    pub start: usize,
    /// 1-based file line
    pub line: usize,
}

/// A closed function definition, as an inclusive range of segment line indexes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpan {
    pub header: Header,
    pub end: usize,
}

/// Per-language block tracker fed one line at a time
pub trait BlockTracker {
    fn feed(&mut self, idx: usize, line_no: usize, line: &str, tokens: &[Token]) -> LineRole;

    fn finish(self: Box<Self>) -> Result<Vec<FunctionSpan>, StructureError>;
}

/// Create the tracker matching a language's block style
pub fn tracker_for(language: GuestLanguage) -> Box<dyn BlockTracker> {
    match language {
        GuestLanguage::JavaScript => Box::new(BraceTracker::default()),
        GuestLanguage::Python => Box::new(IndentTracker::default()),
    }
}

/// Parse `[async] function name(params)` / `[async] def name(params):`
///
/// Only matches when the keyword starts the line, so `obj.function(` or a
/// call that merely mentions the name never opens a definition.
pub fn parse_introducer(
    line: &str,
    tokens: &[Token],
    language: GuestLanguage,
) -> Option<(String, Vec<String>)> {
    let mut idx = 0;
    if tokens.first()?.text(line) == "async" {
        idx += 1;
    }
    let keyword = tokens.get(idx)?;
    if !keyword.is_ident() || keyword.text(line) != language.function_keyword() {
        return None;
    }
    let name = tokens.get(idx + 1)?;
    if !name.is_ident() || !tokens.get(idx + 2)?.is_punct('(') {
        return None;
    }

    let open = idx + 2;
    let close = matching_close(tokens, open).unwrap_or(tokens.len());
    let inner = &tokens[open + 1..close];
    let params = split_top_level(inner, ',')
        .into_iter()
        .filter_map(|part| {
            // `...rest`, `*args`, `x: int = 1` -> first identifier
            part.iter()
                .find(|t| t.kind == TokenKind::Ident)
                .map(|t| t.text(line).to_string())
        })
        .collect();

    Some((name.text(line).to_string(), params))
}

// ===== braces =====

#[derive(Debug, Default)]
enum BraceState {
    #[default]
    Outside,
    AwaitingBrace(Header),
    InBlock { header: Header, depth: usize },
}

/// Brace-counting tracker
#[derive(Debug, Default)]
pub struct BraceTracker {
    /// Depth of non-function blocks
    depth: usize,
    state: BraceState,
    completed: Vec<FunctionSpan>,
}

impl BraceTracker {
    fn enter(&mut self, header: Header, idx: usize, open: usize, close: usize) {
        if open == 0 {
            self.state = BraceState::AwaitingBrace(header);
        } else if close >= open {
            self.completed.push(FunctionSpan { header, end: idx });
        } else {
            self.state = BraceState::InBlock {
                header,
                depth: open - close,
            };
        }
    }
}

impl BlockTracker for BraceTracker {
    fn feed(&mut self, idx: usize, line_no: usize, line: &str, tokens: &[Token]) -> LineRole {
        let (open, close) = brace_balance(tokens);

        match std::mem::take(&mut self.state) {
            BraceState::Outside => {
                if self.depth == 0 {
                    if let Some((name, params)) =
                        parse_introducer(line, tokens, GuestLanguage::JavaScript)
                    {
                        let header = Header {
                            name,
                            params,
                            start: idx,
                            line: line_no,
                        };
                        self.enter(header, idx, open, close);
                        return LineRole::InFunction;
                    }
                }
                let role = if self.depth == 0 {
                    LineRole::TopLevel
                } else {
                    LineRole::Nested
                };
                self.depth = (self.depth + open).saturating_sub(close);
                role
            }
            BraceState::AwaitingBrace(header) => {
                self.enter(header, idx, open, close);
                LineRole::InFunction
            }
            BraceState::InBlock { header, depth } => {
                if close >= depth + open {
                    self.completed.push(FunctionSpan { header, end: idx });
                } else {
                    self.state = BraceState::InBlock {
                        header,
                        depth: depth + open - close,
                    };
                }
                LineRole::InFunction
            }
        }
    }

    fn finish(self: Box<Self>) -> Result<Vec<FunctionSpan>, StructureError> {
        match self.state {
            BraceState::Outside => Ok(self.completed),
            BraceState::AwaitingBrace(header) | BraceState::InBlock { header, .. } => {
                Err(StructureError::new(
                    StructureErrorKind::UnterminatedFunction { name: header.name },
                    header.line,
                ))
            }
        }
    }
}

// ===== indentation =====

#[derive(Debug, Default)]
enum IndentState {
    #[default]
    Outside,
    AwaitingBody(Header),
    InBlock {
        header: Header,
        indent: usize,
        last: usize,
    },
}

/// Indentation tracker
#[derive(Debug, Default)]
pub struct IndentTracker {
    state: IndentState,
    completed: Vec<FunctionSpan>,
}

impl IndentTracker {
    fn outside(
        &mut self,
        idx: usize,
        line_no: usize,
        line: &str,
        tokens: &[Token],
        indent: usize,
    ) -> LineRole {
        if indent > 0 {
            return LineRole::Nested;
        }
        match parse_introducer(line, tokens, GuestLanguage::Python) {
            Some((name, params)) => {
                self.state = IndentState::AwaitingBody(Header {
                    name,
                    params,
                    start: idx,
                    line: line_no,
                });
                LineRole::InFunction
            }
            None => LineRole::TopLevel,
        }
    }
}

impl BlockTracker for IndentTracker {
    fn feed(&mut self, idx: usize, line_no: usize, line: &str, tokens: &[Token]) -> LineRole {
        let blank = is_blank_or_comment(tokens);
        let indent = indent_of(line);

        match std::mem::take(&mut self.state) {
            IndentState::Outside if blank => LineRole::TopLevel,
            IndentState::Outside => self.outside(idx, line_no, line, tokens, indent),
            IndentState::AwaitingBody(header) => {
                if blank {
                    self.state = IndentState::AwaitingBody(header);
                    LineRole::InFunction
                } else if indent > 0 {
                    self.state = IndentState::InBlock {
                        header,
                        indent,
                        last: idx,
                    };
                    LineRole::InFunction
                } else {
                    // one-line `def f(x): return x`
                    let end = header.start;
                    self.completed.push(FunctionSpan { header, end });
                    self.outside(idx, line_no, line, tokens, indent)
                }
            }
            IndentState::InBlock {
                header,
                indent: body,
                last,
            } => {
                if blank {
                    self.state = IndentState::InBlock {
                        header,
                        indent: body,
                        last,
                    };
                    LineRole::InFunction
                } else if indent >= body {
                    self.state = IndentState::InBlock {
                        header,
                        indent: body,
                        last: idx,
                    };
                    LineRole::InFunction
                } else {
                    self.completed.push(FunctionSpan { header, end: last });
                    self.outside(idx, line_no, line, tokens, indent)
                }
            }
        }
    }

    fn finish(self: Box<Self>) -> Result<Vec<FunctionSpan>, StructureError> {
        let mut completed = self.completed;
        match self.state {
            IndentState::Outside => {}
            IndentState::AwaitingBody(header) => {
                let end = header.start;
                completed.push(FunctionSpan { header, end });
            }
            IndentState::InBlock { header, last, .. } => {
                completed.push(FunctionSpan { header, end: last });
            }
        }
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::token::tokenize;

    fn track(source: &str, language: GuestLanguage) -> (Vec<LineRole>, Result<Vec<FunctionSpan>, StructureError>) {
        let mut tracker = tracker_for(language);
        let roles = source
            .split('\n')
            .enumerate()
            .map(|(idx, line)| tracker.feed(idx, idx + 1, line, &tokenize(line, language)))
            .collect();
        (roles, tracker.finish())
    }

    #[test]
    fn test_introducer_params_are_stripped() {
        let line = "def f(a, b: int = 2, *args, **kw):";
        let tokens = tokenize(line, GuestLanguage::Python);
        let (name, params) = parse_introducer(line, &tokens, GuestLanguage::Python).unwrap();
        assert_eq!(name, "f");
        assert_eq!(params, vec!["a", "b", "args", "kw"]);

        let line = "async function g(x = 1, ...rest) {";
        let tokens = tokenize(line, GuestLanguage::JavaScript);
        let (name, params) = parse_introducer(line, &tokens, GuestLanguage::JavaScript).unwrap();
        assert_eq!(name, "g");
        assert_eq!(params, vec!["x", "rest"]);
    }

    #[test]
    fn test_introducer_requires_leading_keyword() {
        let line = "let function_name = f(1)";
        let tokens = tokenize(line, GuestLanguage::JavaScript);
        assert!(parse_introducer(line, &tokens, GuestLanguage::JavaScript).is_none());
        let line = "f()";
        let tokens = tokenize(line, GuestLanguage::Python);
        assert!(parse_introducer(line, &tokens, GuestLanguage::Python).is_none());
    }

    // ===== braces =====

    #[test]
    fn test_brace_function_spans() {
        let src = "function f(a) {\n  if (a) {\n    return 1\n  }\n  return 2\n}\nlet x = 1";
        let (roles, spans) = track(src, GuestLanguage::JavaScript);
        let spans = spans.unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].header.name, "f");
        assert_eq!(spans[0].end, 5);
        assert_eq!(roles[5], LineRole::InFunction);
        assert_eq!(roles[6], LineRole::TopLevel);
    }

    #[test]
    fn test_brace_on_next_line_and_one_liner() {
        let src = "function f(a)\n{\n  return a\n}\nfunction g() { return 1 }";
        let (_, spans) = track(src, GuestLanguage::JavaScript);
        let spans = spans.unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].end, 3);
        assert_eq!((spans[1].header.start, spans[1].end), (4, 4));
    }

    #[test]
    fn test_nested_function_not_registered() {
        let src = "if (x) {\n  function inner() {\n  }\n}";
        let (roles, spans) = track(src, GuestLanguage::JavaScript);
        assert!(spans.unwrap().is_empty());
        assert_eq!(roles[0], LineRole::TopLevel);
        assert_eq!(roles[1], LineRole::Nested);
        assert_eq!(roles[3], LineRole::Nested);
    }

    #[test]
    fn test_braces_in_strings_do_not_count() {
        let src = "function f() {\n  return \"}\"\n}";
        let (_, spans) = track(src, GuestLanguage::JavaScript);
        assert_eq!(spans.unwrap()[0].end, 2);
    }

    #[test]
    fn test_unterminated_brace_function() {
        let src = "let a = 1\nfunction broken(x) {\n  return x";
        let (_, spans) = track(src, GuestLanguage::JavaScript);
        let err = spans.unwrap_err();
        assert_eq!(
            err.kind,
            StructureErrorKind::UnterminatedFunction {
                name: "broken".to_string()
            }
        );
        assert_eq!(err.line, 2);
    }

    // ===== indentation =====

    #[test]
    fn test_indent_function_spans() {
        let src = "def f(x):\n    y = x\n\n    return y\nprint(f(1))";
        let (roles, spans) = track(src, GuestLanguage::Python);
        let spans = spans.unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].end, 3);
        assert_eq!(roles[2], LineRole::InFunction);
        assert_eq!(roles[4], LineRole::TopLevel);
    }

    #[test]
    fn test_closing_line_can_open_next_function() {
        let src = "def f():\n    return 1\ndef g():\n    return 2";
        let (_, spans) = track(src, GuestLanguage::Python);
        let spans = spans.unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].header.start, spans[0].end), (0, 1));
        assert_eq!((spans[1].header.start, spans[1].end), (2, 3));
    }

    #[test]
    fn test_end_of_input_is_tolerated() {
        let src = "def f():\n    return 1\n\n";
        let (_, spans) = track(src, GuestLanguage::Python);
        assert_eq!(spans.unwrap()[0].end, 1);
    }

    #[test]
    fn test_one_line_def() {
        let src = "def f(x): return x\ny = f(2)";
        let (roles, spans) = track(src, GuestLanguage::Python);
        let spans = spans.unwrap();
        assert_eq!((spans[0].header.start, spans[0].end), (0, 0));
        assert_eq!(roles[1], LineRole::TopLevel);
    }

    #[test]
    fn test_methods_are_nested() {
        let src = "class A:\n    def m(self):\n        return 1";
        let (roles, spans) = track(src, GuestLanguage::Python);
        assert!(spans.unwrap().is_empty());
        assert_eq!(roles, vec![LineRole::TopLevel, LineRole::Nested, LineRole::Nested]);
    }
}
