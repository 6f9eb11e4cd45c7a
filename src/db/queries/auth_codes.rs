use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};

use crate::error::AppError;

pub async fn find_by_hash<C: ConnectionTrait>(
    conn: &C,
    code_hash: &str,
) -> Result<Option<entity::authorization_code::Model>, AppError> {
    Ok(entity::authorization_code::Entity::find_by_id(code_hash)
        .one(conn)
        .await?)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    code_hash: &str,
    client_id: &str,
    user_id: &str,
    redirect_uri: &str,
    scopes: &str,
    expires_at: chrono::NaiveDateTime,
) -> Result<(), AppError> {
    let model = entity::authorization_code::ActiveModel {
        code_hash: Set(code_hash.to_string()),
        client_id: Set(client_id.to_string()),
        user_id: Set(user_id.to_string()),
        redirect_uri: Set(redirect_uri.to_string()),
        scopes: Set(scopes.to_string()),
        expires_at: Set(expires_at),
        created_at: Set(chrono::Utc::now().naive_utc()),
    };
    model.insert(conn).await?;
    Ok(())
}

/// Returns the number of rows deleted. Redemption races on the same code
/// are decided by this count: only one caller sees 1.
pub async fn delete_by_hash<C: ConnectionTrait>(
    conn: &C,
    code_hash: &str,
) -> Result<u64, AppError> {
    let result = entity::authorization_code::Entity::delete_by_id(code_hash)
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
