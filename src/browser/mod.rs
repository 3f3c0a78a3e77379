pub mod headless;
pub mod runtime;

pub use headless::{launch_browser, LaunchOptions};
pub use runtime::BrowserRuntime;
