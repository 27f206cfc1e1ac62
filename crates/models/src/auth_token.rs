use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "auth_token")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find_by_user(db: &impl ConnectionTrait, user_id: Uuid) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(ModelError::from_db)
}

/// Look up the token row together with its owner.
pub async fn find_user_by_key(db: &impl ConnectionTrait, key: &str) -> Result<Option<user::Model>, ModelError> {
    let found = Entity::find_by_id(key.to_string())
        .find_also_related(user::Entity)
        .one(db)
        .await
        .map_err(ModelError::from_db)?;
    Ok(found.and_then(|(_, user)| user))
}

pub async fn create(db: &impl ConnectionTrait, user_id: Uuid, key: String) -> Result<Model, ModelError> {
    if key.len() != 40 { return Err(ModelError::Validation("token key must be 40 characters".into())); }
    let am = ActiveModel {
        key: Set(key),
        user_id: Set(user_id),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(ModelError::from_db)
}
