use sea_orm_migration::prelude::*;

use crate::m20260829_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OauthClients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OauthClients::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OauthClients::ClientId)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(OauthClients::ClientSecretHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthClients::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OauthClients::Description).text().null())
                    .col(
                        ColumnDef::new(OauthClients::RedirectUris)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OauthClients::Scopes).text().not_null())
                    .col(
                        ColumnDef::new(OauthClients::UserId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OauthClients::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(OauthClients::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-oauth_clients-user_id")
                            .from(OauthClients::Table, OauthClients::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OauthClients::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum OauthClients {
    Table,
    Id,
    ClientId,
    ClientSecretHash,
    Name,
    Description,
    RedirectUris,
    Scopes,
    UserId,
    CreatedAt,
    UpdatedAt,
}
