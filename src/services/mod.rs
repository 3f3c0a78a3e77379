pub mod locator_script;
pub mod result_parser;

pub use locator_script::{locators, LocatorScript, ScriptStep, SettleWaits, Step, TextSource};
pub use result_parser::{count_result_rows, normalize_text, parse_detail, DetailFields, ExtractionError};
