use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A tenant's knowledge namespace, created on the tenant's first upload.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "namespace")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Organization id.
    #[sea_orm(unique)]
    pub key: String,

    pub created_at: DateTimeUtc,

    #[sea_orm(has_many)]
    pub entries: HasMany<super::knowledge_entry::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
