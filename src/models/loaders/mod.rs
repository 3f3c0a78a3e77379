pub mod flat_file_loader;

pub use flat_file_loader::{load_flat_file, parse_address_line, parse_flat_text};
