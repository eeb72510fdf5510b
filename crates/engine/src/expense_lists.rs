//! An `ExpenseList` groups expenses and settlements shared by a set of
//! participants. The owner is always a member.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Participant, ResultEngine, list_memberships, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseList {
    pub id: Uuid,
    pub name: String,
    pub owner: Participant,
    /// Members other than the owner, in the order they were added.
    pub shared_with: Vec<Participant>,
    pub created_at: DateTime<Utc>,
}

impl ExpenseList {
    pub fn new(name: String, owner: Participant) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            owner,
            shared_with: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Owner first, then the shared participants.
    pub fn participants(&self) -> Vec<Participant> {
        let mut out = vec![self.owner.clone()];
        for participant in &self.shared_with {
            if !out.contains(participant) {
                out.push(participant.clone());
            }
        }
        out
    }

    pub fn is_owner(&self, participant: &Participant) -> bool {
        &self.owner == participant
    }

    pub fn is_member(&self, participant: &Participant) -> bool {
        self.is_owner(participant) || self.shared_with.contains(participant)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_lists")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub owner: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::list_memberships::Entity")]
    ListMemberships,
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
    #[sea_orm(has_many = "super::settlements::Entity")]
    Settlements,
}

impl Related<super::list_memberships::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ListMemberships.def()
    }
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::settlements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Settlements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ExpenseList> for ActiveModel {
    fn from(list: &ExpenseList) -> Self {
        Self {
            id: ActiveValue::Set(list.id.to_string()),
            name: ActiveValue::Set(list.name.clone()),
            owner: ActiveValue::Set(list.owner.to_string()),
            created_at: ActiveValue::Set(list.created_at),
        }
    }
}

impl TryFrom<(Model, Vec<list_memberships::Model>)> for ExpenseList {
    type Error = EngineError;

    fn try_from(
        (model, members): (Model, Vec<list_memberships::Model>),
    ) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "expense list")?,
            name: model.name,
            owner: Participant::new(&model.owner),
            shared_with: members
                .into_iter()
                .map(|m| Participant::new(&m.participant))
                .collect(),
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_always_a_member() {
        let owner = Participant::new("owner@example.com");
        let mut list = ExpenseList::new("Trip".to_string(), owner.clone());
        assert!(list.is_member(&owner));
        assert!(!list.is_member(&Participant::new("guest@example.com")));

        list.shared_with.push(Participant::new("guest@example.com"));
        list.shared_with.push(owner.clone());
        assert_eq!(
            list.participants(),
            vec![owner, Participant::new("guest@example.com")]
        );
    }
}
