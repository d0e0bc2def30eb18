use super::webhook_event;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ConnectionTrait, DbErr, EntityTrait, QueryOrder,
    QuerySelect, Set,
};
use serde_json::Value;
use tracing::instrument;

/// A delivery that passed signature and JSON checks, ready to be stored.
///
/// Header values are kept exactly as received, including absence.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWebhookEvent {
    pub event_type: Option<String>,
    pub delivery_id: Option<String>,
    pub signature: Option<String>,
    pub payload: Value,
}

/// Queries over the `webhook_events` table.
///
/// Every operation takes any sea-orm connection, so it can run on the pool
/// directly or inside a [`Session`](super::Session).
pub struct WebhookEvents;

impl WebhookEvents {
    /// Insert a new, unprocessed event and return the stored row.
    ///
    /// `delivery_id` is not checked for duplicates here; the column's unique
    /// constraint is the only guard. A missing `event_type` violates the
    /// column's NOT NULL constraint and fails the insert.
    #[instrument(skip(db, event), fields(event_type = ?event.event_type, delivery_id = ?event.delivery_id))]
    pub async fn insert<C: ConnectionTrait>(
        db: &C,
        event: NewWebhookEvent,
    ) -> Result<webhook_event::Model, DbErr> {
        let active = webhook_event::ActiveModel {
            event_type: match event.event_type {
                Some(event_type) => Set(event_type),
                None => NotSet,
            },
            delivery_id: Set(event.delivery_id),
            signature: Set(event.signature),
            payload: Set(event.payload),
            processed: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        active.insert(db).await
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<webhook_event::Model>, DbErr> {
        webhook_event::Entity::find_by_id(id).one(db).await
    }

    /// Flag an event as processed.
    pub async fn mark_processed<C: ConnectionTrait>(
        db: &C,
        event: webhook_event::Model,
    ) -> Result<webhook_event::Model, DbErr> {
        let mut active: webhook_event::ActiveModel = event.into();
        active.processed = Set(true);
        active.update(db).await
    }

    /// Most recent events first. No upper bound is applied to `limit` beyond
    /// what the database can represent.
    pub async fn list_recent<C: ConnectionTrait>(
        db: &C,
        limit: u64,
    ) -> Result<Vec<webhook_event::Model>, DbErr> {
        webhook_event::Entity::find()
            .order_by_desc(webhook_event::Column::CreatedAt)
            .order_by_desc(webhook_event::Column::Id)
            .limit(limit.min(i64::MAX as u64))
            .all(db)
            .await
    }
}
