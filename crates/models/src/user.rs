use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create(db: &impl ConnectionTrait, email: &str, name: &str) -> Result<Model, ModelError> {
    if !email.contains('@') { return Err(ModelError::Validation("invalid email".into())); }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        name: Set(name.to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(ModelError::from_db)
}

pub async fn find_by_email(db: &impl ConnectionTrait, email: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::Email.eq(email))
        .one(db)
        .await
        .map_err(ModelError::from_db)
}

/// Apply optional email/name changes. Returns the stored row untouched when
/// nothing differs.
pub async fn update_profile(
    db: &impl ConnectionTrait,
    id: Uuid,
    email: Option<&str>,
    name: Option<&str>,
) -> Result<Model, ModelError> {
    let found = Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ModelError::from_db)?
        .ok_or_else(|| ModelError::Validation("user not found".into()))?;
    let email = email.filter(|e| *e != found.email);
    let name = name.filter(|n| *n != found.name);
    if email.is_none() && name.is_none() {
        return Ok(found);
    }
    let mut am: ActiveModel = found.into();
    if let Some(email) = email { am.email = Set(email.to_string()); }
    if let Some(name) = name { am.name = Set(name.to_string()); }
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(ModelError::from_db)
}
