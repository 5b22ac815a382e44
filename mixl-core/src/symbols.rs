//! Symbol tables
//!
//! - [`Declarations`]: compile-phase ledger of top-level bindings
//! - [`FunctionTable`]: custom functions, read-only after compilation
//! - [`GlobalSymbols`]: runtime values threaded between units

use crate::error::{RedefinitionError, SymbolKind};
use crate::language::Syntax;
use indexmap::IndexMap;
use mixl_config::GuestLanguage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;

/// Reserved result key carrying an invocation's return value
pub const RETURN_KEY: &str = "__mixl_return__";

/// A portable value, rendered as source in whichever language needs it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Literal(Value);

impl Literal {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Render as an expression of `language`
    pub fn render(&self, language: GuestLanguage) -> String {
        let mut out = String::new();
        render_into(&self.0, language, &mut out);
        out
    }
}

impl From<Value> for Literal {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn render_into(value: &Value, language: GuestLanguage, out: &mut String) {
    let (t, f, null) = language.keyword_literals();
    match value {
        Value::Null => out.push_str(null),
        Value::Bool(true) => out.push_str(t),
        Value::Bool(false) => out.push_str(f),
        Value::Number(n) => {
            let _ = write!(out, "{}", n);
        }
        // JSON string escapes are valid in both languages
        Value::String(s) => out.push_str(&Value::String(s.clone()).to_string()),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                render_into(item, language, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (idx, (key, item)) in map.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push_str(": ");
                render_into(item, language, out);
            }
            out.push('}');
        }
    }
}

/// Runtime globals, in first-definition order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GlobalSymbols {
    values: IndexMap<String, Literal>,
}

impl GlobalSymbols {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge a unit's result; later values win. Returns the reserved return value, if any.
    pub fn merge(&mut self, result: IndexMap<String, Literal>) -> Option<Literal> {
        let mut returned = None;
        for (name, value) in result {
            if name == RETURN_KEY {
                returned = Some(value);
            } else {
                self.values.insert(name, value);
            }
        }
        returned
    }
}

/// One top-level binding as declared in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub expression: String,
    pub language: GuestLanguage,
    pub segment: usize,
    pub line: usize,
}

/// Compile-phase binding ledger
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    entries: IndexMap<String, Declaration>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a binding. Languages that forbid redeclaration fail on an
    /// existing name; the others overwrite it.
    pub fn declare(&mut self, declaration: Declaration) -> Result<(), RedefinitionError> {
        if let Some(previous) = self.entries.get(&declaration.name) {
            if declaration.language.redefinition_is_error() {
                return Err(RedefinitionError {
                    kind: SymbolKind::Variable,
                    name: declaration.name,
                    line: declaration.line,
                    previous_line: previous.line,
                });
            }
        }
        self.entries.insert(declaration.name.clone(), declaration);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.entries.values()
    }
}

/// A custom function definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub language: GuestLanguage,
    pub params: Vec<String>,
    /// Full definition text, introducer through last body line
    pub source: String,
    /// Ordinal of the defining segment
    pub segment: usize,
    /// 1-based file line of the introducer
    pub line: usize,
}

impl FunctionDef {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Custom functions by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionTable {
    entries: IndexMap<String, FunctionDef>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function; any name collision is an error
    pub fn define(&mut self, def: FunctionDef) -> Result<(), RedefinitionError> {
        if let Some(previous) = self.entries.get(&def.name) {
            return Err(RedefinitionError {
                kind: SymbolKind::Function,
                name: def.name,
                line: def.line,
                previous_line: previous.line,
            });
        }
        self.entries.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionDef> {
        self.entries.values()
    }

    /// Functions defined by one segment, in definition order
    pub fn in_segment(&self, ordinal: usize) -> impl Iterator<Item = &FunctionDef> {
        self.entries.values().filter(move |def| def.segment == ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decl(name: &str, language: GuestLanguage, line: usize) -> Declaration {
        Declaration {
            name: name.to_string(),
            expression: "1".to_string(),
            language,
            segment: 0,
            line,
        }
    }

    fn func(name: &str, line: usize) -> FunctionDef {
        FunctionDef {
            name: name.to_string(),
            language: GuestLanguage::Python,
            params: vec!["a".to_string()],
            source: format!("def {}(a):\n    return a", name),
            segment: 0,
            line,
        }
    }

    // ===== literals =====

    #[test]
    fn test_render_scalars() {
        let py = GuestLanguage::Python;
        let js = GuestLanguage::JavaScript;
        assert_eq!(Literal::new(json!(true)).render(py), "True");
        assert_eq!(Literal::new(json!(true)).render(js), "true");
        assert_eq!(Literal::new(json!(null)).render(py), "None");
        assert_eq!(Literal::new(json!(null)).render(js), "null");
        assert_eq!(Literal::new(json!(1.5)).render(py), "1.5");
        assert_eq!(Literal::new(json!(42)).render(js), "42");
    }

    #[test]
    fn test_render_strings_are_requoted() {
        let lit = Literal::new(json!("say \"hi\"\n"));
        assert_eq!(lit.render(GuestLanguage::Python), r#""say \"hi\"\n""#);
        assert_eq!(lit.render(GuestLanguage::JavaScript), r#""say \"hi\"\n""#);
    }

    #[test]
    fn test_render_nested() {
        let lit = Literal::new(json!({"a": [1, null, false], "b": {"c": "d"}}));
        assert_eq!(
            lit.render(GuestLanguage::Python),
            r#"{"a": [1, None, False], "b": {"c": "d"}}"#
        );
        assert_eq!(
            lit.render(GuestLanguage::JavaScript),
            r#"{"a": [1, null, false], "b": {"c": "d"}}"#
        );
    }

    #[test]
    fn test_big_integers_keep_every_digit() {
        let result: IndexMap<String, Literal> =
            serde_json::from_str(r#"{"big": 1180591620717411303424, "tiny": 0.1}"#).unwrap();
        assert_eq!(result["big"].render(GuestLanguage::Python), "1180591620717411303424");
        assert_eq!(result["tiny"].render(GuestLanguage::JavaScript), "0.1");
    }

    // ===== globals =====

    #[test]
    fn test_merge_later_wins_and_extracts_return() {
        let mut globals = GlobalSymbols::new();
        let first: IndexMap<String, Literal> =
            serde_json::from_value(json!({"a": 1, "b": 2})).unwrap();
        assert!(globals.merge(first).is_none());

        let second: IndexMap<String, Literal> =
            serde_json::from_value(json!({"b": 3, "c": 4, "__mixl_return__": "r"})).unwrap();
        let returned = globals.merge(second).unwrap();

        assert_eq!(returned, Literal::new(json!("r")));
        assert_eq!(globals.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(globals.get("b"), Some(&Literal::new(json!(3))));
        assert!(!globals.contains(RETURN_KEY));
    }

    // ===== declarations =====

    #[test]
    fn test_js_redeclaration_is_error() {
        let mut decls = Declarations::new();
        decls.declare(decl("a", GuestLanguage::Python, 2)).unwrap();
        let err = decls
            .declare(decl("a", GuestLanguage::JavaScript, 7))
            .unwrap_err();
        assert_eq!(err.kind, SymbolKind::Variable);
        assert_eq!((err.line, err.previous_line), (7, 2));
    }

    #[test]
    fn test_python_redeclaration_overwrites() {
        let mut decls = Declarations::new();
        decls.declare(decl("a", GuestLanguage::JavaScript, 2)).unwrap();
        decls.declare(decl("a", GuestLanguage::Python, 9)).unwrap();
        assert_eq!(decls.get("a").unwrap().line, 9);
        assert_eq!(decls.len(), 1);
    }

    // ===== functions =====

    #[test]
    fn test_function_redefinition_is_always_error() {
        let mut table = FunctionTable::new();
        table.define(func("f", 3)).unwrap();
        let err = table.define(func("f", 12)).unwrap_err();
        assert_eq!(err.kind, SymbolKind::Function);
        assert!(err.to_string().contains("line 12"));
        assert!(err.to_string().contains("line 3"));
        assert_eq!(table.get("f").unwrap().arity(), 1);
    }
}
