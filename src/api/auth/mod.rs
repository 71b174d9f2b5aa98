/*
 * Responsibility
 * - OAuth2 authorization-code flow の HTTP 面 (/auth 配下の login / callback / logout / status)
 */
mod cookies;
pub mod dto;
pub mod handlers;
mod routes;

#[cfg(test)]
mod tests;

pub use routes::routes;

/// Mount point of [`routes`].
pub const AUTH_PREFIX: &str = "/auth";

/// Where guards send unauthenticated browsers.
pub const LOGIN_PATH: &str = "/auth/login";
