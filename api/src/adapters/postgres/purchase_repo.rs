//! PostgreSQL adapter for PurchaseRepository
//!
//! One database transaction per purchase. The user row is locked
//! `FOR UPDATE` first, so purchases by the same user run one at a time and
//! the ownership re-check and the balance check both see committed state.
//! Dropping the transaction before commit rolls it back.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};

use crate::domain::entities::{
    CommitOutcome, OwnershipRecord, PricedEpisode, PurchaseReceipt, UserId,
};
use crate::domain::ports::PurchaseRepository;
use crate::entity::{episode_purchases, users};
use crate::error::DomainError;

/// PostgreSQL implementation of PurchaseRepository
pub struct PostgresPurchaseRepository {
    db: DatabaseConnection,
}

impl PostgresPurchaseRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PurchaseRepository for PostgresPurchaseRepository {
    async fn commit(
        &self,
        user_id: &UserId,
        episodes: &[PricedEpisode],
    ) -> Result<CommitOutcome, DomainError> {
        let txn = self.db.begin().await?;

        let user = users::Entity::find_by_id(user_id.0)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("user {}", user_id)))?;

        let owned: HashSet<i64> = episode_purchases::Entity::find()
            .filter(episode_purchases::Column::UserId.eq(user_id.0))
            .filter(episode_purchases::Column::EpisodeId.is_in(episodes.iter().map(|e| e.id.0)))
            .all(&txn)
            .await?
            .into_iter()
            .map(|m| m.episode_id)
            .collect();

        let (skipped, to_grant): (Vec<PricedEpisode>, Vec<PricedEpisode>) =
            episodes.iter().partition(|e| owned.contains(&e.id.0));

        if to_grant.is_empty() {
            txn.rollback().await?;
            return Ok(CommitOutcome::AlreadyOwned);
        }

        let total: i64 = to_grant.iter().map(|e| e.price).sum();
        if user.point_balance < total || !debit(&txn, user_id, total).await? {
            txn.rollback().await?;
            return Ok(CommitOutcome::InsufficientPoints {
                balance: user.point_balance,
                required: total,
            });
        }

        let now = Utc::now();
        let records: Vec<OwnershipRecord> = to_grant
            .iter()
            .map(|e| OwnershipRecord::new(*user_id, e, now))
            .collect();
        let inserted = grant(&txn, &records).await?;
        if inserted != records.len() as u64 {
            // a writer bypassing the row lock got there first
            tracing::warn!(
                user_id = %user_id,
                expected = to_grant.len(),
                inserted,
                "Ownership insert conflicted, rolling back purchase"
            );
            txn.rollback().await?;
            return Ok(CommitOutcome::AlreadyOwned);
        }

        txn.commit().await?;

        Ok(CommitOutcome::Granted(PurchaseReceipt {
            granted: records,
            skipped: skipped.iter().map(|e| e.id).collect(),
            charged: total,
            balance_after: user.point_balance - total,
        }))
    }
}

/// Conditional debit; false when the balance no longer covers `amount`
async fn debit(txn: &DatabaseTransaction, user_id: &UserId, amount: i64) -> Result<bool, DbErr> {
    let result = users::Entity::update_many()
        .col_expr(
            users::Column::PointBalance,
            Expr::col(users::Column::PointBalance).sub(amount),
        )
        .filter(users::Column::Id.eq(user_id.0))
        .filter(users::Column::PointBalance.gte(amount))
        .exec(txn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Insert ownership records, returning how many were actually created
async fn grant(txn: &DatabaseTransaction, records: &[OwnershipRecord]) -> Result<u64, DbErr> {
    let rows = records.iter().map(|r| episode_purchases::ActiveModel {
        user_id: Set(r.user_id.0),
        episode_id: Set(r.episode_id.0),
        price_paid: Set(r.price_paid),
        purchased_at: Set(r.purchased_at.fixed_offset()),
        ..Default::default()
    });

    episode_purchases::Entity::insert_many(rows)
        .on_conflict(
            OnConflict::columns([
                episode_purchases::Column::UserId,
                episode_purchases::Column::EpisodeId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(txn)
        .await
}
