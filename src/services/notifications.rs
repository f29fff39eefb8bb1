use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::notification::{self, NotificationKind};
use crate::errors::ServiceError;

const LIST_LIMIT: u64 = 100;

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub company_id: Uuid,
    /// `None` addresses every user of the company
    pub user_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}

impl NewNotification {
    pub fn company_wide(
        company_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            company_id,
            user_id: None,
            title: title.into(),
            message: message.into(),
            kind,
        }
    }
}

/// Stores a notification on any connection, including an open transaction.
pub(crate) async fn notify<C: ConnectionTrait>(
    conn: &C,
    new: NewNotification,
) -> Result<notification::Model, ServiceError> {
    let created = notification::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_id: Set(new.company_id),
        user_id: Set(new.user_id),
        title: Set(new.title),
        message: Set(new.message),
        kind: Set(new.kind.to_string()),
        read: Set(false),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    debug!(notification_id = %created.id, kind = %created.kind, "notification stored");
    Ok(created)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread_only: bool,
}

fn visible_to(company_id: Uuid, user_id: Uuid) -> Condition {
    Condition::all()
        .add(notification::Column::CompanyId.eq(company_id))
        .add(
            Condition::any()
                .add(notification::Column::UserId.is_null())
                .add(notification::Column::UserId.eq(user_id)),
        )
}

#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DbPool>,
}

impl NotificationService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn create(&self, new: NewNotification) -> Result<notification::Model, ServiceError> {
        notify(&*self.db, new).await
    }

    /// Most recent notifications visible to the user.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        filter: NotificationFilter,
    ) -> Result<Vec<notification::Model>, ServiceError> {
        let mut query = notification::Entity::find()
            .filter(visible_to(company_id, user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .limit(LIST_LIMIT);
        if filter.unread_only {
            query = query.filter(notification::Column::Read.eq(false));
        }
        Ok(query.all(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn mark_read(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<notification::Model, ServiceError> {
        let existing = notification::Entity::find_by_id(id)
            .filter(visible_to(company_id, user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Notificação {} não encontrada", id)))?;
        if existing.read {
            return Ok(existing);
        }
        let mut model: notification::ActiveModel = existing.into();
        model.read = Set(true);
        Ok(model.update(&*self.db).await?)
    }

    /// Returns how many notifications were flipped to read.
    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, company_id: Uuid, user_id: Uuid) -> Result<u64, ServiceError> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::Read, Expr::value(true))
            .filter(visible_to(company_id, user_id))
            .filter(notification::Column::Read.eq(false))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
