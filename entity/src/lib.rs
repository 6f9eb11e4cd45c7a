pub mod access_token;
pub mod authorization_code;
pub mod oauth_client;
pub mod personal_access_token;
pub mod refresh_token;
pub mod user;
