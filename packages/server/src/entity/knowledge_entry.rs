use common::knowledge::EntryStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "knowledge_entry")]
pub struct Model {
    /// UUIDv7 primary key. Doubles as the pagination cursor.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique_key = "namespace_content")]
    pub namespace_id: Uuid,
    #[sea_orm(belongs_to, from = "namespace_id", to = "id")]
    pub namespace: HasOne<super::namespace::Entity>,

    /// Hex SHA-256 of the uploaded bytes.
    #[sea_orm(unique_key = "namespace_content")]
    pub content_hash: String,

    pub key: String,
    pub title: String,

    /// Extracted text, kept until the entry is chunked.
    #[sea_orm(column_type = "Text")]
    pub text: String,

    #[sea_orm(indexed)]
    pub status: EntryStatus,

    /// Serialized `EntryMetadata`.
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: serde_json::Value,

    pub created_at: DateTimeUtc,

    #[sea_orm(has_many)]
    pub chunks: HasMany<super::knowledge_chunk::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
