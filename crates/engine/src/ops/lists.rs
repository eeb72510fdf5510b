use sea_orm::{Condition, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    ExpenseList, Participant, ResultEngine, expense_lists, list_memberships,
    util::normalize_required_name,
};

use super::{Engine, with_tx};

impl Engine {
    /// Creates a list owned by `owner`.
    pub async fn new_list(&self, name: &str, owner: &Participant) -> ResultEngine<ExpenseList> {
        let name = normalize_required_name(name, "list")?;
        with_tx!(self, |db_tx| {
            let list = ExpenseList::new(name, owner.clone());
            expense_lists::ActiveModel::from(&list).insert(&db_tx).await?;
            tracing::info!("created list {} for {}", list.id, owner);
            Ok(list)
        })
    }

    /// Returns the list if `actor` is a member.
    pub async fn list(&self, list_id: Uuid, actor: &Participant) -> ResultEngine<ExpenseList> {
        with_tx!(self, |db_tx| {
            self.require_list_member(&db_tx, list_id, actor).await
        })
    }

    /// Lists owned by or shared with `actor`, oldest first.
    pub async fn lists_for(&self, actor: &Participant) -> ResultEngine<Vec<ExpenseList>> {
        with_tx!(self, |db_tx| {
            let shared_ids: Vec<String> = list_memberships::Entity::find()
                .filter(list_memberships::Column::Participant.eq(actor.to_string()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|m| m.list_id)
                .collect();

            let models = expense_lists::Entity::find()
                .filter(
                    Condition::any()
                        .add(expense_lists::Column::Owner.eq(actor.to_string()))
                        .add(expense_lists::Column::Id.is_in(shared_ids)),
                )
                .order_by_asc(expense_lists::Column::CreatedAt)
                .order_by_asc(expense_lists::Column::Id)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                out.push(self.hydrate_list(&db_tx, model).await?);
            }
            tracing::debug!("{} lists visible to {}", out.len(), actor);
            Ok(out)
        })
    }

    /// Sum of the list's expense amounts, computed from the stored expenses.
    pub async fn list_total(&self, list_id: Uuid, actor: &Participant) -> ResultEngine<f64> {
        with_tx!(self, |db_tx| {
            self.require_list_member(&db_tx, list_id, actor).await?;
            let stmt = Statement::from_sql_and_values(
                db_tx.get_database_backend(),
                "SELECT COALESCE(SUM(amount), 0.0) AS total FROM expenses WHERE list_id = ?",
                vec![list_id.to_string().into()],
            );
            let row = db_tx.query_one(stmt).await?;
            let total: f64 = match row {
                Some(row) => row.try_get("", "total")?,
                None => 0.0,
            };
            Ok(total)
        })
    }
}
