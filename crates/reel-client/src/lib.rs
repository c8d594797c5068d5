pub mod browser;
pub mod page;
pub mod profile;

pub use browser::{ChromeSession, LaunchOptions};
pub use page::BrowserPage;
pub use profile::find_profile_dir;
