//! MixL - one source file, two guest languages
//!
//! A `.mixl` file interleaves `[js]` and `[py]` segments. Variables and
//! custom functions defined in one segment are visible to every later
//! segment, whichever language it is written in.
//!
//! # Architecture
//!
//! ```text
//! mixl-config/  - Pure configuration vocabulary (no IO)
//! mixl-core/    - Segmenter, analyzer, resolver, code generator, scheduler
//! mixl-api/     - Build orchestration, RunConfig, MixlError
//! mixl-cli/     - `mixl` binary
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use mixl_workspace::{build, RunConfig};
//!
//! let output = build("demos/hello/main.mixl".as_ref(), &RunConfig::default()).unwrap();
//! print!("{}", output.stdout);
//! ```

pub use mixl_api::*;
