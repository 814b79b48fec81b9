mod cache;
mod client;
mod models;
mod source_error;

pub use cache::ResponseCache;
pub use client::FlashfoodClient;
pub use models::{RawItem, RawStore};
pub use source_error::SourceError;
