pub mod account;
pub mod flow;
pub mod token;

pub use account::Account;
pub use flow::AuthCodeFlow;
pub use token::{CallbackParams, TokenResponse, TokenResult};
