pub mod base;
pub mod cookie;
pub mod memory_store;
pub mod mongodb_store;

// Re-export the primary session items so code outside can do
// "use crate::session::{SessionStore, Session, create_session_store};"
pub use base::{create_session_store, SessionStore};
pub use cookie::Session;
