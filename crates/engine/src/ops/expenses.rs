use std::collections::HashMap;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};

use crate::{
    EngineError, Expense, Participant, ResultEngine, SplitPolicy, expenses, split_items,
};

use super::{Engine, access::require_members, with_tx};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ExpensesCursor {
    date: DateTime<Utc>,
    expense_id: String,
}

impl ExpensesCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid expenses cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid expenses cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid expenses cursor".to_string()))
    }
}

impl Engine {
    /// Attaches the split items to each expense row, keeping row order.
    pub(super) async fn hydrate_expenses(
        &self,
        db: &DatabaseTransaction,
        models: Vec<expenses::Model>,
    ) -> ResultEngine<Vec<Expense>> {
        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let mut items: HashMap<String, Vec<split_items::Model>> = HashMap::new();
        if !ids.is_empty() {
            let rows = split_items::Entity::find()
                .filter(split_items::Column::ExpenseId.is_in(ids))
                .order_by_asc(split_items::Column::ExpenseId)
                .order_by_asc(split_items::Column::Position)
                .all(db)
                .await?;
            for row in rows {
                items.entry(row.expense_id.clone()).or_default().push(row);
            }
        }

        models
            .into_iter()
            .map(|model| {
                let rows = items.remove(&model.id).unwrap_or_default();
                Expense::try_from((model, rows))
            })
            .collect()
    }

    /// Every expense of the list, newest first.
    pub(super) async fn fetch_expenses(
        &self,
        db: &DatabaseTransaction,
        list_id: Uuid,
    ) -> ResultEngine<Vec<Expense>> {
        let models = expenses::Entity::find()
            .filter(expenses::Column::ListId.eq(list_id.to_string()))
            .order_by_desc(expenses::Column::Date)
            .order_by_desc(expenses::Column::Id)
            .all(db)
            .await?;
        self.hydrate_expenses(db, models).await
    }

    /// Dynamic expenses of the list, read on `db` so membership changes act
    /// on the rows they are about to rewrite.
    pub(super) async fn fetch_dynamic_expenses(
        &self,
        db: &DatabaseTransaction,
        list_id: Uuid,
    ) -> ResultEngine<Vec<Expense>> {
        let models = expenses::Entity::find()
            .filter(expenses::Column::ListId.eq(list_id.to_string()))
            .filter(expenses::Column::SplitPolicy.eq(SplitPolicy::Dynamic.as_str()))
            .order_by_asc(expenses::Column::Id)
            .all(db)
            .await?;
        self.hydrate_expenses(db, models).await
    }

    /// Replaces the stored split items of `expense`.
    pub(super) async fn write_split_items(
        &self,
        db: &DatabaseTransaction,
        expense: &Expense,
    ) -> ResultEngine<()> {
        let expense_id = expense.id.to_string();
        split_items::Entity::delete_many()
            .filter(split_items::Column::ExpenseId.eq(expense_id.clone()))
            .exec(db)
            .await?;
        for (position, item) in expense.split_items.iter().enumerate() {
            split_items::active_model(item, &expense_id, position)
                .insert(db)
                .await?;
        }
        Ok(())
    }

    /// Loads every expense of the list, newest first.
    pub async fn load_expenses(
        &self,
        list_id: Uuid,
        actor: &Participant,
    ) -> ResultEngine<Vec<Expense>> {
        with_tx!(self, |db_tx| {
            self.require_list_member(&db_tx, list_id, actor).await?;
            let out = self.fetch_expenses(&db_tx, list_id).await?;
            tracing::debug!("loaded {} expenses of list {}", out.len(), list_id);
            Ok(out)
        })
    }

    /// Lists expenses with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(date DESC, expense_id DESC)`.
    pub async fn list_expenses_page(
        &self,
        list_id: Uuid,
        actor: &Participant,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<Expense>, Option<String>)> {
        if limit == 0 {
            return Err(EngineError::Validation(
                "page limit must be at least 1".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.require_list_member(&db_tx, list_id, actor).await?;

            let limit_plus_one = limit.saturating_add(1);
            let mut query = expenses::Entity::find()
                .filter(expenses::Column::ListId.eq(list_id.to_string()))
                .order_by_desc(expenses::Column::Date)
                .order_by_desc(expenses::Column::Id)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = ExpensesCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(expenses::Column::Date.lt(cursor.date))
                        .add(
                            Condition::all()
                                .add(expenses::Column::Date.eq(cursor.date))
                                .add(expenses::Column::Id.lt(cursor.expense_id)),
                        ),
                );
            }

            let mut models = query.all(&db_tx).await?;
            let has_more = models.len() > limit as usize;
            models.truncate(limit as usize);
            let out = self.hydrate_expenses(&db_tx, models).await?;

            let next_cursor = if has_more {
                out.last()
                    .map(|expense| ExpensesCursor {
                        date: expense.date,
                        expense_id: expense.id.to_string(),
                    })
                    .map(|c| c.encode())
                    .transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }

    /// Stores a new expense recorded by `actor`.
    ///
    /// The payer and everyone in the split must be list members. Expenses
    /// are immutable: saving an id twice fails.
    pub async fn save_expense(
        &self,
        list_id: Uuid,
        mut expense: Expense,
        actor: &Participant,
    ) -> ResultEngine<Expense> {
        expense.created_by = actor.clone();
        expense.validate()?;
        with_tx!(self, |db_tx| {
            let list = self.require_list_member(&db_tx, list_id, actor).await?;
            require_members(&list, expense.involved())?;

            if expenses::Entity::find_by_id(expense.id.to_string())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(expense.id.to_string()));
            }

            expense.active_model(&list_id.to_string())?.insert(&db_tx).await?;
            self.write_split_items(&db_tx, &expense).await?;
            tracing::info!(
                "saved expense {} ({:.2}) in list {}",
                expense.id,
                expense.amount,
                list_id
            );
            Ok(expense)
        })
    }

    /// Deletes an expense and its split items.
    pub async fn delete_expense(
        &self,
        list_id: Uuid,
        expense_id: Uuid,
        actor: &Participant,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_list_member(&db_tx, list_id, actor).await?;
            let model = expenses::Entity::find_by_id(expense_id.to_string())
                .filter(expenses::Column::ListId.eq(list_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;

            split_items::Entity::delete_many()
                .filter(split_items::Column::ExpenseId.eq(model.id.clone()))
                .exec(&db_tx)
                .await?;
            expenses::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            tracing::info!("deleted expense {} from list {}", expense_id, list_id);
            Ok(())
        })
    }
}
