//! JavaScript emitter (node)

use super::Emitter;
use crate::symbols::RETURN_KEY;
use mixl_config::GuestLanguage;
use std::fmt::Write;

pub struct JavaScriptEmitter;

impl Emitter for JavaScriptEmitter {
    fn language(&self) -> GuestLanguage {
        GuestLanguage::JavaScript
    }

    fn declare(&self, name: &str, value: &str) -> String {
        format!("var {} = {};", name, value)
    }

    fn capture_return(&self, call: &str) -> String {
        format!("var {} = {};", RETURN_KEY, call)
    }

    fn postamble(&self, names: &[String]) -> String {
        let mut out = String::from(";(function () {\n  var __mixl_out = {};\n");
        for name in names {
            let _ = writeln!(
                out,
                "  if (typeof {0} !== 'undefined') __mixl_out['{0}'] = {0};",
                name
            );
        }
        out.push_str(
            "  require('fs').writeFileSync(__filename.replace(/\\.[^.]+$/, '.json'), JSON.stringify(__mixl_out));\n",
        );
        out.push_str("})();");
        out
    }
}
