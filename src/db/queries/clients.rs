use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, Set,
};

use crate::auth::tokens;
use crate::db::{decode_list, encode_list};
use crate::error::AppError;

pub struct NewClient {
    pub name: String,
    pub description: Option<String>,
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Default)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    pub scopes: Option<Vec<String>>,
}

pub struct CreatedClient {
    pub client: entity::oauth_client::Model,
    /// Raw secret, returned to the caller exactly once. Only its hash is
    /// stored.
    pub client_secret: String,
}

pub async fn create<C: ConnectionTrait>(
    conn: &C,
    owner_id: &str,
    new: NewClient,
) -> Result<CreatedClient, AppError> {
    let client_secret = tokens::new_client_secret();
    let now = chrono::Utc::now().naive_utc();

    let model = entity::oauth_client::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        client_id: Set(tokens::new_client_id()),
        client_secret_hash: Set(tokens::hash_token(&client_secret)),
        name: Set(new.name),
        description: Set(new.description),
        redirect_uris: Set(encode_list(&new.redirect_uris)),
        scopes: Set(encode_list(&new.scopes)),
        user_id: Set(owner_id.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let client = model.insert(conn).await?;
    Ok(CreatedClient {
        client,
        client_secret,
    })
}

pub async fn list_for_owner<C: ConnectionTrait>(
    conn: &C,
    owner_id: &str,
) -> Result<Vec<entity::oauth_client::Model>, AppError> {
    Ok(entity::oauth_client::Entity::find()
        .filter(entity::oauth_client::Column::UserId.eq(owner_id))
        .all(conn)
        .await?)
}

/// Owner-scoped lookup. A row owned by someone else is indistinguishable
/// from a missing row.
pub async fn find_for_owner<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    owner_id: &str,
) -> Result<entity::oauth_client::Model, AppError> {
    entity::oauth_client::Entity::find_by_id(id)
        .filter(entity::oauth_client::Column::UserId.eq(owner_id))
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

/// Unscoped lookup by public client id, used during token exchange where
/// the caller proves ownership with the client secret instead.
pub async fn find_by_client_id<C: ConnectionTrait>(
    conn: &C,
    client_id: &str,
) -> Result<Option<entity::oauth_client::Model>, AppError> {
    Ok(entity::oauth_client::Entity::find()
        .filter(entity::oauth_client::Column::ClientId.eq(client_id))
        .one(conn)
        .await?)
}

pub async fn update_for_owner<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    owner_id: &str,
    changes: ClientChanges,
) -> Result<entity::oauth_client::Model, AppError> {
    let client = find_for_owner(conn, id, owner_id).await?;

    let mut active: entity::oauth_client::ActiveModel = client.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(description) = changes.description {
        active.description = Set(Some(description));
    }
    if let Some(redirect_uris) = changes.redirect_uris {
        active.redirect_uris = Set(encode_list(&redirect_uris));
    }
    if let Some(scopes) = changes.scopes {
        active.scopes = Set(encode_list(&scopes));
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    Ok(active.update(conn).await?)
}

/// Deletes the registration; issued tokens and outstanding codes go with it
/// via the cascading foreign keys.
pub async fn delete_for_owner<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    owner_id: &str,
) -> Result<(), AppError> {
    let client = find_for_owner(conn, id, owner_id).await?;
    client.delete(conn).await?;
    Ok(())
}

/// Replaces the secret hash in place; the previous secret stops working
/// immediately. Returns the new raw secret once.
pub async fn regenerate_secret<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    owner_id: &str,
) -> Result<String, AppError> {
    let client = find_for_owner(conn, id, owner_id).await?;

    let client_secret = tokens::new_client_secret();
    let mut active: entity::oauth_client::ActiveModel = client.into();
    active.client_secret_hash = Set(tokens::hash_token(&client_secret));
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(conn).await?;

    Ok(client_secret)
}

pub fn redirect_uris(client: &entity::oauth_client::Model) -> Vec<String> {
    decode_list(&client.redirect_uris)
}

pub fn allowed_scopes(client: &entity::oauth_client::Model) -> Vec<String> {
    decode_list(&client.scopes)
}
