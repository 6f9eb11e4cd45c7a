pub mod jwt;
pub mod middleware;
pub mod oauth2;
pub mod password;
pub mod scopes;
pub mod tokens;
