pub mod console;
pub mod extract;
pub mod fetcher;
pub mod webhook;

pub use console::ConsoleMessenger;
pub use extract::HtmlExtractor;
pub use fetcher::{ProxyConfig, ReqwestFetcher};
pub use webhook::WebhookMessenger;
