use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, Set,
};

use crate::error::AppError;

pub async fn find_by_hash<C: ConnectionTrait>(
    conn: &C,
    token_hash: &str,
) -> Result<Option<entity::personal_access_token::Model>, AppError> {
    Ok(entity::personal_access_token::Entity::find()
        .filter(entity::personal_access_token::Column::TokenHash.eq(token_hash))
        .one(conn)
        .await?)
}

pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    token_hash: &str,
    user_id: &str,
    name: &str,
    token_prefix: &str,
    scopes: &str,
    expires_at: Option<chrono::NaiveDateTime>,
) -> Result<entity::personal_access_token::Model, AppError> {
    let model = entity::personal_access_token::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        token_hash: Set(token_hash.to_string()),
        user_id: Set(user_id.to_string()),
        name: Set(name.to_string()),
        token_prefix: Set(token_prefix.to_string()),
        scopes: Set(scopes.to_string()),
        expires_at: Set(expires_at),
        last_used_at: Set(None),
        created_at: Set(chrono::Utc::now().naive_utc()),
    };
    Ok(model.insert(conn).await?)
}

pub async fn list_for_owner<C: ConnectionTrait>(
    conn: &C,
    owner_id: &str,
) -> Result<Vec<entity::personal_access_token::Model>, AppError> {
    Ok(entity::personal_access_token::Entity::find()
        .filter(entity::personal_access_token::Column::UserId.eq(owner_id))
        .all(conn)
        .await?)
}

pub async fn delete_for_owner<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    owner_id: &str,
) -> Result<(), AppError> {
    let pat = entity::personal_access_token::Entity::find_by_id(id)
        .filter(entity::personal_access_token::Column::UserId.eq(owner_id))
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    pat.delete(conn).await?;
    Ok(())
}

/// Usage watermark, bumped on every successful authentication.
pub async fn touch_last_used<C: ConnectionTrait>(conn: &C, id: &str) -> Result<(), AppError> {
    let Some(pat) = entity::personal_access_token::Entity::find_by_id(id)
        .one(conn)
        .await?
    else {
        return Ok(());
    };
    let mut active: entity::personal_access_token::ActiveModel = pat.into();
    active.last_used_at = Set(Some(chrono::Utc::now().naive_utc()));
    active.update(conn).await?;
    Ok(())
}
