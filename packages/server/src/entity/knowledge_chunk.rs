use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A slice of an entry's text, in document order.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "knowledge_chunk")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub entry_id: Uuid,
    #[sea_orm(belongs_to, from = "entry_id", to = "id")]
    pub entry: HasOne<super::knowledge_entry::Entity>,

    pub position: i32,

    #[sea_orm(column_type = "Text")]
    pub content: String,
}

impl ActiveModelBehavior for ActiveModel {}
