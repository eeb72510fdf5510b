//! Audit trail of sharing changes and settlement transitions.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Participant, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Share,
    RemoveAccess,
    SettlementConfirmed,
    SettlementRejected,
}

impl ActivityAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Share => "share",
            Self::RemoveAccess => "remove_access",
            Self::SettlementConfirmed => "settlement_confirmed",
            Self::SettlementRejected => "settlement_rejected",
        }
    }
}

impl TryFrom<&str> for ActivityAction {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "share" => Ok(Self::Share),
            "remove_access" => Ok(Self::RemoveAccess),
            "settlement_confirmed" => Ok(Self::SettlementConfirmed),
            "settlement_rejected" => Ok(Self::SettlementRejected),
            other => Err(EngineError::InvalidData(format!(
                "invalid activity action: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub list_id: Uuid,
    pub action: ActivityAction,
    pub actor: Participant,
    /// The participant or settlement the action was about.
    pub subject: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(list_id: Uuid, action: ActivityAction, actor: Participant, subject: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            list_id,
            action,
            actor,
            subject,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "activity_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub list_id: String,
    pub action: String,
    pub actor: String,
    pub subject: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expense_lists::Entity",
        from = "Column::ListId",
        to = "super::expense_lists::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    ExpenseLists,
}

impl Related<super::expense_lists::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseLists.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ActivityEntry> for ActiveModel {
    fn from(entry: &ActivityEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            list_id: ActiveValue::Set(entry.list_id.to_string()),
            action: ActiveValue::Set(entry.action.as_str().to_string()),
            actor: ActiveValue::Set(entry.actor.to_string()),
            subject: ActiveValue::Set(entry.subject.clone()),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for ActivityEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "activity")?,
            list_id: parse_uuid(&model.list_id, "expense list")?,
            action: ActivityAction::try_from(model.action.as_str())?,
            actor: Participant::new(&model.actor),
            subject: model.subject,
            created_at: model.created_at,
        })
    }
}
