pub mod browser;

pub use browser::{ChromeContext, ChromeSession, LaunchConfig};
