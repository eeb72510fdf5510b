use chrono::Utc;
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    ActivityAction, ActivityEntry, EngineError, ExpenseList, Participant, ResultEngine, Settlement,
    SettlementStatus, error::is_lock_contention, settlements,
};

use super::{Engine, access::require_members, with_tx};

impl Engine {
    /// Settlements of the list, newest first, optionally by status.
    pub(super) async fn fetch_settlements(
        &self,
        db: &DatabaseTransaction,
        list_id: Uuid,
        status: Option<SettlementStatus>,
    ) -> ResultEngine<Vec<Settlement>> {
        let mut query = settlements::Entity::find()
            .filter(settlements::Column::ListId.eq(list_id.to_string()))
            .order_by_desc(settlements::Column::Date)
            .order_by_desc(settlements::Column::Id);
        if let Some(status) = status {
            query = query.filter(settlements::Column::Status.eq(status.as_str()));
        }
        query
            .all(db)
            .await?
            .into_iter()
            .map(Settlement::try_from)
            .collect()
    }

    /// Inserts `settlement` unless an equivalent live one exists.
    async fn insert_settlement(
        &self,
        db: &DatabaseTransaction,
        list: &ExpenseList,
        settlement: &Settlement,
    ) -> ResultEngine<()> {
        settlement.validate()?;
        require_members(list, [&settlement.from, &settlement.to])?;

        let existing = settlements::Entity::find()
            .filter(settlements::Column::ListId.eq(settlement.list_id.to_string()))
            .filter(settlements::Column::FromParticipant.eq(settlement.from.to_string()))
            .filter(settlements::Column::ToParticipant.eq(settlement.to.to_string()))
            .filter(settlements::Column::Status.is_in([
                SettlementStatus::Pending.as_str(),
                SettlementStatus::Confirmed.as_str(),
            ]))
            .all(db)
            .await?;
        for model in existing {
            let other = Settlement::try_from(model)?;
            if other.duplicates(&settlement.from, &settlement.to, settlement.amount) {
                return Err(EngineError::ExistingKey(format!(
                    "settlement {} -> {} of {:.2}",
                    settlement.from, settlement.to, settlement.amount
                )));
            }
        }

        settlements::ActiveModel::from(settlement).insert(db).await?;
        Ok(())
    }

    /// Loads the list's settlements, newest first.
    pub async fn load_settlements(
        &self,
        list_id: Uuid,
        actor: &Participant,
        status: Option<SettlementStatus>,
    ) -> ResultEngine<Vec<Settlement>> {
        with_tx!(self, |db_tx| {
            self.require_list_member(&db_tx, list_id, actor).await?;
            let out = self.fetch_settlements(&db_tx, list_id, status).await?;
            tracing::debug!("loaded {} settlements of list {}", out.len(), list_id);
            Ok(out)
        })
    }

    /// The debtor announces a payment; it stays `pending` until `to` acts.
    pub async fn record_settlement(
        &self,
        list_id: Uuid,
        from: &Participant,
        to: &Participant,
        amount: f64,
        description: Option<&str>,
        actor: &Participant,
    ) -> ResultEngine<Settlement> {
        with_tx!(self, |db_tx| {
            let list = self.require_list_member(&db_tx, list_id, actor).await?;
            if actor != from {
                return Err(EngineError::Forbidden(
                    "only the debtor can record a payment".to_string(),
                ));
            }
            let settlement =
                Settlement::new_pending(list_id, from.clone(), to.clone(), amount, description);
            self.insert_settlement(&db_tx, &list, &settlement).await?;
            tracing::info!(
                "{} recorded a payment of {:.2} to {} in list {}",
                from,
                amount,
                to,
                list_id
            );
            Ok(settlement)
        })
    }

    /// The creditor records money already received; no confirmation needed.
    pub async fn record_received_payment(
        &self,
        list_id: Uuid,
        from: &Participant,
        to: &Participant,
        amount: f64,
        description: Option<&str>,
        actor: &Participant,
    ) -> ResultEngine<Settlement> {
        with_tx!(self, |db_tx| {
            let list = self.require_list_member(&db_tx, list_id, actor).await?;
            if actor != to {
                return Err(EngineError::Forbidden(
                    "only the recipient can record a received payment".to_string(),
                ));
            }
            let settlement =
                Settlement::new_confirmed(list_id, from.clone(), to.clone(), amount, description);
            self.insert_settlement(&db_tx, &list, &settlement).await?;
            tracing::info!(
                "{} received {:.2} from {} in list {}",
                to,
                amount,
                from,
                list_id
            );
            Ok(settlement)
        })
    }

    /// Moves a pending settlement to `status`; only its recipient may do it.
    ///
    /// The update is conditioned on the row still being `pending`, so of two
    /// racing transitions exactly one wins and the other gets `Conflict`.
    /// The loser sees either zero affected rows or SQLite refusing its write
    /// lock, and both surface as `Conflict`.
    pub async fn transition_settlement(
        &self,
        list_id: Uuid,
        settlement_id: Uuid,
        status: SettlementStatus,
        actor: &Participant,
    ) -> ResultEngine<Settlement> {
        if !status.is_final() {
            return Err(EngineError::Validation(
                "a settlement can only be confirmed or rejected".to_string(),
            ));
        }
        self.apply_transition(list_id, settlement_id, status, actor)
            .await
            .map_err(|err| match err {
                EngineError::Database(db_err) if is_lock_contention(&db_err) => {
                    tracing::warn!(
                        "settlement {} changed concurrently: {}",
                        settlement_id,
                        db_err
                    );
                    EngineError::Conflict(format!(
                        "settlement {settlement_id} is no longer pending"
                    ))
                }
                other => other,
            })
    }

    async fn apply_transition(
        &self,
        list_id: Uuid,
        settlement_id: Uuid,
        status: SettlementStatus,
        actor: &Participant,
    ) -> ResultEngine<Settlement> {
        with_tx!(self, |db_tx| {
            self.require_list_member(&db_tx, list_id, actor).await?;
            let model = settlements::Entity::find_by_id(settlement_id.to_string())
                .filter(settlements::Column::ListId.eq(list_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("settlement not exists".to_string()))?;
            let mut settlement = Settlement::try_from(model)?;

            if &settlement.to != actor {
                tracing::warn!("{} tried to {} settlement {}", actor, status.as_str(), settlement_id);
                return Err(EngineError::Forbidden(
                    "only the recipient can confirm or reject a payment".to_string(),
                ));
            }

            let now = Utc::now();
            let result = settlements::Entity::update_many()
                .col_expr(settlements::Column::Status, Expr::value(status.as_str()))
                .col_expr(
                    settlements::Column::ConfirmedBy,
                    Expr::value(Some(actor.to_string())),
                )
                .col_expr(settlements::Column::ConfirmedAt, Expr::value(Some(now)))
                .filter(settlements::Column::Id.eq(settlement_id.to_string()))
                .filter(settlements::Column::Status.eq(SettlementStatus::Pending.as_str()))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                tracing::warn!(
                    "settlement {} already {}",
                    settlement_id,
                    settlement.status.as_str()
                );
                return Err(EngineError::Conflict(format!(
                    "settlement {settlement_id} is no longer pending"
                )));
            }

            settlement.status = status;
            settlement.confirmed_by = Some(actor.clone());
            settlement.confirmed_at = Some(now);

            let action = match status {
                SettlementStatus::Rejected => ActivityAction::SettlementRejected,
                _ => ActivityAction::SettlementConfirmed,
            };
            let entry =
                ActivityEntry::new(list_id, action, actor.clone(), settlement_id.to_string());
            self.log_activity(&db_tx, &entry).await?;

            tracing::info!("settlement {} {}", settlement_id, status.as_str());
            Ok(settlement)
        })
    }

    pub async fn confirm_settlement(
        &self,
        list_id: Uuid,
        settlement_id: Uuid,
        actor: &Participant,
    ) -> ResultEngine<Settlement> {
        self.transition_settlement(list_id, settlement_id, SettlementStatus::Confirmed, actor)
            .await
    }

    pub async fn reject_settlement(
        &self,
        list_id: Uuid,
        settlement_id: Uuid,
        actor: &Participant,
    ) -> ResultEngine<Settlement> {
        self.transition_settlement(list_id, settlement_id, SettlementStatus::Rejected, actor)
            .await
    }
}
