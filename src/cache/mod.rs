pub mod token_cache;

// Re-export the primary cache items so code outside can do
// "use crate::cache::TokenCache;"
pub use token_cache::{CachedAccessToken, TokenCache};
