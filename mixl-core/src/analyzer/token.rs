//! 行级词法分析
//!
//! A deliberately small tokenizer: one logical line at a time, just enough
//! to tell identifiers, strings, comments and punctuation apart.

use crate::language::Syntax;
use mixl_config::GuestLanguage;

/// Token category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Comment,
    Punct(char),
}

/// Token with its byte range inside the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    /// Text of the token inside its line
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.start..self.end]
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }
}

const PY_STRING_PREFIXES: &[&str] = &["r", "b", "f", "u", "rb", "br", "fr", "rf"];

/// Tokenize one line
pub fn tokenize(line: &str, language: GuestLanguage) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();
    let comment = language.line_comment();
    let quotes = language.string_quotes();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if line[start..].starts_with(comment) {
            tokens.push(Token {
                kind: TokenKind::Comment,
                start,
                end: line.len(),
            });
            break;
        }

        if quotes.contains(&c) {
            let end = scan_string(line, start);
            tokens.push(Token {
                kind: TokenKind::Str,
                start,
                end,
            });
            while chars.peek().is_some_and(|&(i, _)| i < end) {
                chars.next();
            }
            continue;
        }

        if language.is_ident_start(c) {
            let mut end = start;
            while let Some(&(i, ch)) = chars.peek() {
                if !language.is_ident_continue(ch) {
                    break;
                }
                end = i + ch.len_utf8();
                chars.next();
            }

            // f"..." / rb'...'
            let next = line[end..].chars().next();
            if language == GuestLanguage::Python
                && next.is_some_and(|q| quotes.contains(&q))
                && PY_STRING_PREFIXES.contains(&line[start..end].to_ascii_lowercase().as_str())
            {
                let str_end = scan_string(line, end);
                while chars.peek().is_some_and(|&(i, _)| i < str_end) {
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Str,
                    start,
                    end: str_end,
                });
                continue;
            }

            tokens.push(Token {
                kind: TokenKind::Ident,
                start,
                end,
            });
            continue;
        }

        if c.is_ascii_digit() {
            let mut end = start;
            while let Some(&(i, ch)) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '.' || ch == '_') {
                    break;
                }
                end = i + ch.len_utf8();
                chars.next();
            }
            tokens.push(Token {
                kind: TokenKind::Number,
                start,
                end,
            });
            continue;
        }

        chars.next();
        tokens.push(Token {
            kind: TokenKind::Punct(c),
            start,
            end: start + c.len_utf8(),
        });
    }

    tokens
}

/// Scan a string literal opening at `start`; unterminated strings run to end of line
fn scan_string(line: &str, start: usize) -> usize {
    let mut iter = line[start..].char_indices();
    let Some((_, quote)) = iter.next() else {
        return line.len();
    };
    let mut escaped = false;
    for (offset, ch) in iter {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return start + offset + ch.len_utf8();
        }
    }
    line.len()
}

/// Leading whitespace width (each space or tab counts one)
pub fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

/// Whether a line has nothing but whitespace or a comment
pub fn is_blank_or_comment(tokens: &[Token]) -> bool {
    tokens.iter().all(|t| t.kind == TokenKind::Comment)
}

/// Count `{` and `}` tokens
pub fn brace_balance(tokens: &[Token]) -> (usize, usize) {
    tokens.iter().fold((0, 0), |(open, close), t| match t.kind {
        TokenKind::Punct('{') => (open + 1, close),
        TokenKind::Punct('}') => (open, close + 1),
        _ => (open, close),
    })
}

/// Index of the bracket closing the one at `open_idx`, counting `()`, `[]` and `{}`
pub fn matching_close(tokens: &[Token], open_idx: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(open_idx) {
        match token.kind {
            TokenKind::Punct('(') | TokenKind::Punct('[') | TokenKind::Punct('{') => depth += 1,
            TokenKind::Punct(')') | TokenKind::Punct(']') | TokenKind::Punct('}') => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `tokens` on a separator that sits outside any bracket pair
pub fn split_top_level(tokens: &[Token], separator: char) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut from = 0;
    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Punct('(') | TokenKind::Punct('[') | TokenKind::Punct('{') => depth += 1,
            TokenKind::Punct(')') | TokenKind::Punct(']') | TokenKind::Punct('}') => {
                depth = depth.saturating_sub(1)
            }
            TokenKind::Punct(c) if c == separator && depth == 0 => {
                parts.push(&tokens[from..idx]);
                from = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[from..]);
    parts
}
