pub mod config;
pub mod diagnostics;
pub mod language;
pub mod verify;

pub use config::FrontendOptions;
pub use language::parser::{check_source, parse_translation_unit, Analysis};
