pub mod authority;
pub mod confidential;
pub mod pkce;

// Re-export the primary client items so code outside can do
// "use crate::client::{Authority, ConfidentialClient};"
pub use authority::Authority;
pub use confidential::ConfidentialClient;
