//! PostgreSQL adapter for UserRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use sea_orm::sea_query::Expr;

use crate::domain::entities::{User, UserId};
use crate::domain::ports::UserRepository;
use crate::entity::{sessions, users};
use crate::error::DomainError;

/// PostgreSQL implementation of UserRepository
pub struct PostgresUserRepository {
    db: DatabaseConnection,
}

impl PostgresUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        let result = users::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_session_hash(&self, token_hash: &str) -> Result<Option<User>, DomainError> {
        let session = sessions::Entity::find_by_id(token_hash.to_string())
            .filter(sessions::Column::ExpiresAt.gt(Utc::now().fixed_offset()))
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        match session {
            Some(session) => self.find_by_id(&UserId(session.user_id)).await,
            None => Ok(None),
        }
    }

    async fn set_auto_purchase(&self, id: &UserId, enabled: bool) -> Result<(), DomainError> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::AutoPurchase, Expr::value(enabled))
            .filter(users::Column::Id.eq(id.0))
            .exec(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }
}

/// Convert SeaORM model to domain entity
impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        User {
            id: UserId(model.id),
            point_balance: model.point_balance,
            auto_purchase: model.auto_purchase,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
