//! Per-language syntax facts used by the analyzer and the code generator

use mixl_config::GuestLanguage;

const JS_RESERVED: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

const PY_RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Syntax properties of a guest language
pub trait Syntax {
    /// Line comment marker
    fn line_comment(&self) -> &'static str;

    /// Characters that open a string literal
    fn string_quotes(&self) -> &'static [char];

    /// Keyword introducing a function definition
    fn function_keyword(&self) -> &'static str;

    /// Whether a later declaration of an existing variable is an error
    fn redefinition_is_error(&self) -> bool;

    /// Whether the generated preamble must skip names the unit declares itself
    fn redeclaration_conflicts(&self) -> bool;

    /// Keyword literals as (true, false, null)
    fn keyword_literals(&self) -> (&'static str, &'static str, &'static str);

    /// Whether a character may continue an identifier
    fn is_ident_continue(&self, c: char) -> bool;

    /// Whether a character may start an identifier
    fn is_ident_start(&self, c: char) -> bool;

    /// Reserved words that can never name a variable
    fn reserved_words(&self) -> &'static [&'static str];

    fn is_reserved(&self, name: &str) -> bool {
        self.reserved_words().contains(&name)
    }

    /// Whether `name` can be declared as a variable of this language
    fn is_valid_identifier(&self, name: &str) -> bool {
        let mut chars = name.chars();
        chars.next().is_some_and(|c| self.is_ident_start(c))
            && chars.all(|c| self.is_ident_continue(c))
            && !self.is_reserved(name)
    }
}

impl Syntax for GuestLanguage {
    fn line_comment(&self) -> &'static str {
        match self {
            GuestLanguage::JavaScript => "//",
            GuestLanguage::Python => "#",
        }
    }

    fn string_quotes(&self) -> &'static [char] {
        match self {
            GuestLanguage::JavaScript => &['"', '\'', '`'],
            GuestLanguage::Python => &['"', '\''],
        }
    }

    fn function_keyword(&self) -> &'static str {
        match self {
            GuestLanguage::JavaScript => "function",
            GuestLanguage::Python => "def",
        }
    }

    fn redefinition_is_error(&self) -> bool {
        matches!(self, GuestLanguage::JavaScript)
    }

    fn redeclaration_conflicts(&self) -> bool {
        matches!(self, GuestLanguage::JavaScript)
    }

    fn keyword_literals(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            GuestLanguage::JavaScript => ("true", "false", "null"),
            GuestLanguage::Python => ("True", "False", "None"),
        }
    }

    fn is_ident_continue(&self, c: char) -> bool {
        c.is_alphanumeric() || c == '_' || (c == '$' && *self == GuestLanguage::JavaScript)
    }

    fn is_ident_start(&self, c: char) -> bool {
        c.is_alphabetic() || c == '_' || (c == '$' && *self == GuestLanguage::JavaScript)
    }

    fn reserved_words(&self) -> &'static [&'static str] {
        match self {
            GuestLanguage::JavaScript => JS_RESERVED,
            GuestLanguage::Python => PY_RESERVED,
        }
    }
}
