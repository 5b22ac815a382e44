//! 平台相关输出

mod cli;

pub use cli::{
    format_check, print_bench, print_entry, print_error_with_source, print_order, ConsoleOutput,
};
