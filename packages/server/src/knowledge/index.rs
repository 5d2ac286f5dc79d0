use async_trait::async_trait;
use chrono::Utc;
use common::knowledge::{
    AddOutcome, Entry, EntryId, EntryMetadata, EntryStatus, IndexError, KnowledgeIndex,
    Namespace, NamespaceId, NewEntry, Page, PaginationOpts,
};
use common::storage::ContentHash;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::entity::{knowledge_chunk, knowledge_entry, namespace};

/// Knowledge index persisted through SeaORM.
///
/// Deduplication relies on the `(namespace_id, content_hash)` unique key, so
/// concurrent adds of the same content resolve to a single entry.
#[derive(Clone)]
pub struct SeaOrmKnowledgeIndex {
    db: DatabaseConnection,
}

impl SeaOrmKnowledgeIndex {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn ensure_namespace(&self, key: &str) -> Result<namespace::Model, DbErr> {
        let model = namespace::ActiveModel {
            id: Set(Uuid::now_v7()),
            key: Set(key.to_string()),
            created_at: Set(Utc::now()),
        };

        let result = namespace::Entity::insert(model)
            .on_conflict(
                OnConflict::column(namespace::Column::Key)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;

        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }

        namespace::Entity::find()
            .filter(namespace::Column::Key.eq(key))
            .one(&self.db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("namespace '{key}'")))
    }

    async fn find_by_content(
        &self,
        namespace_id: Uuid,
        content_hash: &str,
    ) -> Result<Option<knowledge_entry::Model>, DbErr> {
        knowledge_entry::Entity::find()
            .filter(knowledge_entry::Column::NamespaceId.eq(namespace_id))
            .filter(knowledge_entry::Column::ContentHash.eq(content_hash))
            .one(&self.db)
            .await
    }
}

fn to_entry(model: knowledge_entry::Model) -> Result<Entry, IndexError> {
    let content_hash = ContentHash::from_hex(&model.content_hash)
        .map_err(|e| IndexError::CorruptHash(e.to_string()))?;

    Ok(Entry {
        id: model.id.into(),
        namespace_id: model.namespace_id.into(),
        key: model.key,
        title: model.title,
        content_hash,
        status: model.status,
        metadata: EntryMetadata::from_json(model.metadata)?,
        created_at: model.created_at,
    })
}

#[async_trait]
impl KnowledgeIndex for SeaOrmKnowledgeIndex {
    async fn get_namespace(&self, key: &str) -> Result<Option<Namespace>, IndexError> {
        let model = namespace::Entity::find()
            .filter(namespace::Column::Key.eq(key))
            .one(&self.db)
            .await?;

        Ok(model.map(|m| Namespace {
            id: NamespaceId::from(m.id),
            key: m.key,
        }))
    }

    async fn add(&self, new: NewEntry) -> Result<AddOutcome, IndexError> {
        new.metadata.validate()?;

        let namespace = self.ensure_namespace(&new.namespace).await?;
        let content_hash = new.content_hash.to_hex();
        let id = Uuid::now_v7();

        let model = knowledge_entry::ActiveModel {
            id: Set(id),
            namespace_id: Set(namespace.id),
            content_hash: Set(content_hash.clone()),
            key: Set(new.key),
            title: Set(new.title),
            text: Set(new.text),
            status: Set(EntryStatus::Pending),
            metadata: Set(new.metadata.to_json()),
            created_at: Set(Utc::now()),
        };

        let result = knowledge_entry::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    knowledge_entry::Column::NamespaceId,
                    knowledge_entry::Column::ContentHash,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;

        let inserted = match result {
            Ok(rows) => rows > 0,
            Err(DbErr::RecordNotInserted) => false,
            Err(e) => return Err(e.into()),
        };

        if inserted {
            return Ok(AddOutcome {
                entry_id: id.into(),
                created: true,
            });
        }

        let existing = self
            .find_by_content(namespace.id, &content_hash)
            .await?
            .ok_or_else(|| {
                DbErr::RecordNotFound(format!("entry with content hash {content_hash}"))
            })?;
        debug!(entry_id = %existing.id, "Content already registered in namespace");

        Ok(AddOutcome {
            entry_id: existing.id.into(),
            created: false,
        })
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, IndexError> {
        knowledge_entry::Entity::find_by_id(*id.as_uuid())
            .one(&self.db)
            .await?
            .map(to_entry)
            .transpose()
    }

    async fn delete_entry(&self, id: EntryId) -> Result<(), IndexError> {
        let txn = self.db.begin().await?;

        knowledge_chunk::Entity::delete_many()
            .filter(knowledge_chunk::Column::EntryId.eq(*id.as_uuid()))
            .exec(&txn)
            .await?;
        knowledge_entry::Entity::delete_by_id(*id.as_uuid())
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    async fn list(
        &self,
        namespace_id: NamespaceId,
        opts: &PaginationOpts,
    ) -> Result<Page<Entry>, IndexError> {
        let start_after = opts.start_after()?;

        let mut query = knowledge_entry::Entity::find()
            .filter(knowledge_entry::Column::NamespaceId.eq(*namespace_id.as_uuid()));
        if let Some(after) = start_after {
            query = query.filter(knowledge_entry::Column::Id.gt(*after.as_uuid()));
        }

        let models = query
            .order_by_asc(knowledge_entry::Column::Id)
            .limit(Some(opts.num_items + 1))
            .all(&self.db)
            .await?;

        let items = models
            .into_iter()
            .map(to_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::from_overfetch(
            items,
            opts.num_items as usize,
            opts.cursor.as_deref(),
            |e| e.id.to_string(),
        ))
    }
}
