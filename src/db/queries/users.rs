use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::error::AppError;

pub async fn find_by_id<C: ConnectionTrait>(
    conn: &C,
    id: &str,
) -> Result<Option<entity::user::Model>, AppError> {
    Ok(entity::user::Entity::find_by_id(id).one(conn).await?)
}

pub async fn find_by_username<C: ConnectionTrait>(
    conn: &C,
    username: &str,
) -> Result<Option<entity::user::Model>, AppError> {
    Ok(entity::user::Entity::find()
        .filter(entity::user::Column::Username.eq(username))
        .one(conn)
        .await?)
}

pub async fn find_by_email<C: ConnectionTrait>(
    conn: &C,
    email: &str,
) -> Result<Option<entity::user::Model>, AppError> {
    Ok(entity::user::Entity::find()
        .filter(entity::user::Column::Email.eq(email))
        .one(conn)
        .await?)
}

pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<entity::user::Model, AppError> {
    let now = chrono::Utc::now().naive_utc();
    let model = entity::user::ActiveModel {
        id: Set(id.to_string()),
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash.to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(model.insert(conn).await?)
}
