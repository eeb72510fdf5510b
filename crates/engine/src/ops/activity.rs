use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{ActivityEntry, Participant, ResultEngine, activity_log};

use super::{Engine, with_tx};

impl Engine {
    pub(super) async fn log_activity(
        &self,
        db: &DatabaseTransaction,
        entry: &ActivityEntry,
    ) -> ResultEngine<()> {
        activity_log::ActiveModel::from(entry).insert(db).await?;
        Ok(())
    }

    /// Sharing changes and settlement transitions, newest first.
    pub async fn activity_log(
        &self,
        list_id: Uuid,
        actor: &Participant,
    ) -> ResultEngine<Vec<ActivityEntry>> {
        with_tx!(self, |db_tx| {
            self.require_list_member(&db_tx, list_id, actor).await?;
            let rows = activity_log::Entity::find()
                .filter(activity_log::Column::ListId.eq(list_id.to_string()))
                .order_by_desc(activity_log::Column::CreatedAt)
                .order_by_desc(activity_log::Column::Id)
                .all(&db_tx)
                .await?;
            rows.into_iter()
                .map(ActivityEntry::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
