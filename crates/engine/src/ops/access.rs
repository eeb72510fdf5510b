use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ExpenseList, Participant, ResultEngine, expense_lists, list_memberships};

use super::Engine;

impl Engine {
    async fn find_list_by_id(
        &self,
        db: &DatabaseTransaction,
        list_id: Uuid,
    ) -> ResultEngine<Option<expense_lists::Model>> {
        expense_lists::Entity::find_by_id(list_id.to_string())
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Builds the domain list, shared participants in the order they joined.
    pub(super) async fn hydrate_list(
        &self,
        db: &DatabaseTransaction,
        model: expense_lists::Model,
    ) -> ResultEngine<ExpenseList> {
        let members = list_memberships::Entity::find()
            .filter(list_memberships::Column::ListId.eq(model.id.clone()))
            .order_by_asc(list_memberships::Column::AddedAt)
            .order_by_asc(list_memberships::Column::Participant)
            .all(db)
            .await?;
        ExpenseList::try_from((model, members))
    }

    pub(super) async fn require_list(
        &self,
        db: &DatabaseTransaction,
        list_id: Uuid,
    ) -> ResultEngine<ExpenseList> {
        let model = self
            .find_list_by_id(db, list_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense list not exists".to_string()))?;
        self.hydrate_list(db, model).await
    }

    /// Any member (owner included) may read and add records.
    pub(super) async fn require_list_member(
        &self,
        db: &DatabaseTransaction,
        list_id: Uuid,
        actor: &Participant,
    ) -> ResultEngine<ExpenseList> {
        let list = self.require_list(db, list_id).await?;
        if !list.is_member(actor) {
            return Err(EngineError::Forbidden(format!(
                "{actor} is not a member of the list"
            )));
        }
        Ok(list)
    }

    /// Sharing is owner-only.
    pub(super) async fn require_list_owner(
        &self,
        db: &DatabaseTransaction,
        list_id: Uuid,
        actor: &Participant,
    ) -> ResultEngine<ExpenseList> {
        let list = self.require_list(db, list_id).await?;
        if !list.is_owner(actor) {
            return Err(EngineError::Forbidden(
                "only the list owner can change its members".to_string(),
            ));
        }
        Ok(list)
    }
}

/// Every participant must belong to `list`.
pub(super) fn require_members<'a>(
    list: &ExpenseList,
    participants: impl IntoIterator<Item = &'a Participant>,
) -> ResultEngine<()> {
    for participant in participants {
        if !list.is_member(participant) {
            return Err(EngineError::Validation(format!(
                "{participant} is not a member of the list"
            )));
        }
    }
    Ok(())
}
