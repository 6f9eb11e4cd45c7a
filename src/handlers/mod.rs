pub mod auth;
pub mod authorize;
pub mod clients;
pub mod oauth2;
pub mod pats;
