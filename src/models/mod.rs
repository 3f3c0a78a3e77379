pub mod loaders;
pub mod record;

pub use loaders::{load_flat_file, parse_address_line};
pub use record::{RecordStatus, SessionOutcome, WorkRecord};
