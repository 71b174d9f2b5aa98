pub mod guard;
pub mod http;
pub mod security_headers;
pub mod session;
