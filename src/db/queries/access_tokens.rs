use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};

use crate::error::AppError;

pub async fn find_by_hash<C: ConnectionTrait>(
    conn: &C,
    token_hash: &str,
) -> Result<Option<entity::access_token::Model>, AppError> {
    Ok(entity::access_token::Entity::find()
        .filter(entity::access_token::Column::TokenHash.eq(token_hash))
        .one(conn)
        .await?)
}

pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    token_hash: &str,
    user_id: &str,
    client_id: Option<&str>,
    scopes: &str,
    expires_at: chrono::NaiveDateTime,
) -> Result<entity::access_token::Model, AppError> {
    let model = entity::access_token::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        token_hash: Set(token_hash.to_string()),
        user_id: Set(user_id.to_string()),
        client_id: Set(client_id.map(|s| s.to_string())),
        scopes: Set(scopes.to_string()),
        expires_at: Set(expires_at),
        created_at: Set(chrono::Utc::now().naive_utc()),
    };
    Ok(model.insert(conn).await?)
}

pub async fn delete_by_id<C: ConnectionTrait>(conn: &C, id: &str) -> Result<u64, AppError> {
    let result = entity::access_token::Entity::delete_by_id(id)
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
