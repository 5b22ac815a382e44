//! Variable binding extraction from top-level lines

use super::token::{split_top_level, Token, TokenKind};
use crate::language::Syntax;
use mixl_config::GuestLanguage;

/// A top-level variable binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    /// Right-hand side as written
    pub expression: String,
    /// 1-based file line
    pub line: usize,
}

const JS_DECLARATIONS: &[&str] = &["let", "var", "const"];

/// Extract every binding on one top-level line
pub fn extract(line: &str, tokens: &[Token], language: GuestLanguage, line_no: usize) -> Vec<Binding> {
    let code: Vec<Token> = tokens
        .iter()
        .copied()
        .filter(|t| t.kind != TokenKind::Comment)
        .collect();

    let mut out = Vec::new();
    for statement in split_top_level(&code, ';') {
        match language {
            GuestLanguage::JavaScript => js_statement(line, statement, line_no, &mut out),
            GuestLanguage::Python => py_statement(line, statement, line_no, &mut out),
        }
    }
    out
}

/// Whether `tokens[idx]` is a lone `=` (not `==`, `=>`, `===`)
fn is_assign(tokens: &[Token], idx: usize) -> bool {
    let Some(eq) = tokens.get(idx) else {
        return false;
    };
    if !eq.is_punct('=') {
        return false;
    }
    match tokens.get(idx + 1) {
        Some(next) if next.start == eq.end => !(next.is_punct('=') || next.is_punct('>')),
        _ => true,
    }
}

fn rest_text(line: &str, tokens: &[Token]) -> Option<String> {
    let first = tokens.first()?;
    let last = tokens.last()?;
    let text = line[first.start..last.end].trim();
    (!text.is_empty()).then(|| text.to_string())
}

// `let a = 1, b = f(2, 3)`
fn js_statement(line: &str, statement: &[Token], line_no: usize, out: &mut Vec<Binding>) {
    let Some(keyword) = statement.first() else {
        return;
    };
    if !keyword.is_ident() || !JS_DECLARATIONS.contains(&keyword.text(line)) {
        return;
    }

    for declarator in split_top_level(&statement[1..], ',') {
        let Some(name) = declarator.first() else {
            continue;
        };
        if !name.is_ident() || !is_assign(declarator, 1) {
            continue;
        }
        if let Some(expression) = rest_text(line, &declarator[2..]) {
            out.push(Binding {
                name: name.text(line).to_string(),
                expression,
                line: line_no,
            });
        }
    }
}

// `a = b = 1`
fn py_statement(line: &str, statement: &[Token], line_no: usize, out: &mut Vec<Binding>) {
    let mut targets = Vec::new();
    let mut idx = 0;
    while idx + 1 < statement.len()
        && statement[idx].is_ident()
        && !GuestLanguage::Python.is_reserved(statement[idx].text(line))
        && is_assign(statement, idx + 1)
    {
        targets.push(statement[idx].text(line).to_string());
        idx += 2;
    }
    if targets.is_empty() {
        return;
    }

    if let Some(expression) = rest_text(line, &statement[idx..]) {
        out.extend(targets.into_iter().map(|name| Binding {
            name,
            expression: expression.clone(),
            line: line_no,
        }));
    }
}
