pub use sea_orm_migration::prelude::*;

mod m20260829_000001_create_users;
mod m20260829_000002_create_oauth_clients;
mod m20260829_000003_create_authorization_codes;
mod m20260829_000004_create_access_tokens;
mod m20260829_000005_create_refresh_tokens;
mod m20260829_000006_create_personal_access_tokens;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260829_000001_create_users::Migration),
            Box::new(m20260829_000002_create_oauth_clients::Migration),
            Box::new(m20260829_000003_create_authorization_codes::Migration),
            Box::new(m20260829_000004_create_access_tokens::Migration),
            Box::new(m20260829_000005_create_refresh_tokens::Migration),
            Box::new(m20260829_000006_create_personal_access_tokens::Migration),
        ]
    }
}
