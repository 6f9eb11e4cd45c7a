pub mod access_tokens;
pub mod auth_codes;
pub mod clients;
pub mod personal_tokens;
pub mod refresh_tokens;
pub mod users;
