//! PostgreSQL adapters - chat persistence.

mod chat_store;

pub use chat_store::PostgresChatStore;
