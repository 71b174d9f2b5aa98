pub mod cache;
pub mod oauth;
pub mod random;
pub mod session;
