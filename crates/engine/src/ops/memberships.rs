use chrono::Utc;
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    ActivityAction, ActivityEntry, EngineError, Participant, ResultEngine, list_memberships,
    membership::{apply_participant_added, apply_participant_removed},
};

use super::{Engine, with_tx};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipChange {
    Add,
    Remove,
}

impl Engine {
    /// Shares the list with `email` or revokes its access (owner-only).
    ///
    /// The membership row, the rewrite of every affected `dynamic` expense
    /// and the activity entry commit together. Returns how many expenses
    /// were adjusted.
    pub async fn update_membership(
        &self,
        list_id: Uuid,
        change: MembershipChange,
        email: &str,
        actor: &Participant,
    ) -> ResultEngine<usize> {
        let participant = Participant::parse(email)?;
        with_tx!(self, |db_tx| {
            let list = self.require_list_owner(&db_tx, list_id, actor).await?;

            match change {
                MembershipChange::Add => {
                    if list.is_owner(&participant) {
                        return Err(EngineError::Validation(
                            "the owner is already a member".to_string(),
                        ));
                    }
                    if list.shared_with.contains(&participant) {
                        return Err(EngineError::ExistingKey(participant.to_string()));
                    }
                    list_memberships::ActiveModel {
                        list_id: ActiveValue::Set(list_id.to_string()),
                        participant: ActiveValue::Set(participant.to_string()),
                        added_at: ActiveValue::Set(Utc::now()),
                    }
                    .insert(&db_tx)
                    .await?;
                }
                MembershipChange::Remove => {
                    if list.is_owner(&participant) {
                        return Err(EngineError::Validation(
                            "cannot remove the list owner".to_string(),
                        ));
                    }
                    if !list.shared_with.contains(&participant) {
                        return Err(EngineError::KeyNotFound(participant.to_string()));
                    }
                    list_memberships::Entity::delete_by_id((
                        list_id.to_string(),
                        participant.to_string(),
                    ))
                    .exec(&db_tx)
                    .await?;
                }
            }

            let mut adjusted = 0;
            for mut expense in self.fetch_dynamic_expenses(&db_tx, list_id).await? {
                let changed = match change {
                    MembershipChange::Add => apply_participant_added(&mut expense, &participant),
                    MembershipChange::Remove => {
                        apply_participant_removed(&mut expense, &participant, &list.owner)
                    }
                };
                if !changed {
                    continue;
                }
                expense
                    .active_model(&list_id.to_string())?
                    .update(&db_tx)
                    .await?;
                self.write_split_items(&db_tx, &expense).await?;
                adjusted += 1;
            }

            let action = match change {
                MembershipChange::Add => ActivityAction::Share,
                MembershipChange::Remove => ActivityAction::RemoveAccess,
            };
            let entry = ActivityEntry::new(list.id, action, actor.clone(), participant.to_string());
            self.log_activity(&db_tx, &entry).await?;

            tracing::info!(
                "{} {} on list {}: {} dynamic expenses adjusted",
                action.as_str(),
                participant,
                list_id,
                adjusted
            );
            Ok(adjusted)
        })
    }
}
