use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{
    Balances, Debt, Participant, ResultEngine, compute_adjusted_balances, compute_balances,
    simplify_debts,
};

use super::{Engine, with_tx};

impl Engine {
    /// Net balances from expenses only.
    pub async fn balances(&self, list_id: Uuid, actor: &Participant) -> ResultEngine<Balances> {
        with_tx!(self, |db_tx| {
            self.require_list_member(&db_tx, list_id, actor).await?;
            let expenses = self.fetch_expenses(&db_tx, list_id).await?;
            Ok(compute_balances(&expenses))
        })
    }

    /// Net balances after confirmed settlements.
    pub async fn adjusted_balances(
        &self,
        list_id: Uuid,
        actor: &Participant,
    ) -> ResultEngine<Balances> {
        with_tx!(self, |db_tx| {
            self.require_list_member(&db_tx, list_id, actor).await?;
            let expenses = self.fetch_expenses(&db_tx, list_id).await?;
            let settlements = self.fetch_settlements(&db_tx, list_id, None).await?;
            Ok(compute_adjusted_balances(&expenses, &settlements))
        })
    }

    /// Payments that would settle the list, from the adjusted balances.
    pub async fn suggested_payments(
        &self,
        list_id: Uuid,
        actor: &Participant,
    ) -> ResultEngine<Vec<Debt>> {
        let balances = self.adjusted_balances(list_id, actor).await?;
        let debts = simplify_debts(&balances);
        tracing::debug!("{} payments suggested for list {}", debts.len(), list_id);
        Ok(debts)
    }
}
