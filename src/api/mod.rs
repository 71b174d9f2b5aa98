pub mod auth;
pub mod extractors;
pub mod pages;
pub mod response;
