//! Local persistence. A string key-value table stands in for browser
//! storage and the chat history and API key are kept under fixed keys.
pub mod history;
pub mod kv;

pub use history::*;
pub use kv::KvStore;
