//! Python emitter (python3)

use super::Emitter;
use crate::symbols::RETURN_KEY;
use mixl_config::GuestLanguage;

pub struct PythonEmitter;

impl Emitter for PythonEmitter {
    fn language(&self) -> GuestLanguage {
        GuestLanguage::Python
    }

    fn declare(&self, name: &str, value: &str) -> String {
        format!("{} = {}", name, value)
    }

    fn capture_return(&self, call: &str) -> String {
        format!("{} = {}", RETURN_KEY, call)
    }

    /// Callables are left out like JSON.stringify leaves out JS functions
    fn postamble(&self, names: &[String]) -> String {
        let quoted: Vec<String> = names.iter().map(|n| format!("'{}'", n)).collect();
        format!(
            "import json as __mixl_json\n\
             import os as __mixl_os\n\
             __mixl_out = {{}}\n\
             for __mixl_name in [{}]:\n    \
                 if __mixl_name in globals() and not callable(globals()[__mixl_name]):\n        \
                     __mixl_out[__mixl_name] = globals()[__mixl_name]\n\
             with open(__mixl_os.path.splitext(__mixl_os.path.abspath(__file__))[0] + '.json', 'w') as __mixl_file:\n    \
                 __mixl_json.dump(__mixl_out, __mixl_file, default=str)",
            quoted.join(", ")
        )
    }
}
