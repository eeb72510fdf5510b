//! A `Settlement` records money handed from a debtor to a creditor.
//!
//! Settlements recorded by the debtor start `pending` and are confirmed or
//! rejected by the recipient; a recipient recording a payment they already
//! received creates it `confirmed`. Only confirmed settlements move balances.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Participant, ResultEngine, util::parse_uuid};

pub const DEFAULT_DESCRIPTION: &str = "Debt settlement";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl SettlementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }

    /// `confirmed` and `rejected` are final.
    pub fn is_final(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl TryFrom<&str> for SettlementStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::Validation(format!(
                "invalid settlement status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub list_id: Uuid,
    pub from: Participant,
    pub to: Participant,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub description: String,
    pub status: SettlementStatus,
    pub created_by: Participant,
    pub confirmed_by: Option<Participant>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Settlement {
    fn new(
        list_id: Uuid,
        from: Participant,
        to: Participant,
        amount: f64,
        description: Option<&str>,
        created_by: Participant,
    ) -> Self {
        let description = description
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION)
            .to_string();
        Self {
            id: Uuid::new_v4(),
            list_id,
            from,
            to,
            amount,
            date: Utc::now(),
            description,
            status: SettlementStatus::Pending,
            created_by,
            confirmed_by: None,
            confirmed_at: None,
        }
    }

    /// A payment announced by the debtor, waiting for the recipient.
    pub fn new_pending(
        list_id: Uuid,
        from: Participant,
        to: Participant,
        amount: f64,
        description: Option<&str>,
    ) -> Self {
        let created_by = from.clone();
        Self::new(list_id, from, to, amount, description, created_by)
    }

    /// A payment the recipient declares as already received.
    pub fn new_confirmed(
        list_id: Uuid,
        from: Participant,
        to: Participant,
        amount: f64,
        description: Option<&str>,
    ) -> Self {
        let created_by = to.clone();
        let mut settlement = Self::new(list_id, from, to, amount, description, created_by.clone());
        settlement.status = SettlementStatus::Confirmed;
        settlement.confirmed_by = Some(created_by);
        settlement.confirmed_at = Some(settlement.date);
        settlement
    }

    pub fn validate(&self) -> ResultEngine<()> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(EngineError::Validation("amount must be > 0".to_string()));
        }
        if self.from == self.to {
            return Err(EngineError::Validation(
                "cannot settle with yourself".to_string(),
            ));
        }
        Ok(())
    }

    /// Same parties and (almost) the same amount as `other`.
    pub fn duplicates(&self, from: &Participant, to: &Participant, amount: f64) -> bool {
        &self.from == from
            && &self.to == to
            && (self.amount - amount).abs() < crate::expenses::FIXED_TOLERANCE
            && self.status != SettlementStatus::Rejected
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub list_id: String,
    pub from_participant: String,
    pub to_participant: String,
    pub amount: f64,
    pub date: DateTimeUtc,
    pub description: String,
    pub status: String,
    pub created_by: String,
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<DateTimeUtc>,
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

impl From<&Settlement> for ActiveModel {
    fn from(settlement: &Settlement) -> Self {
        Self {
            id: ActiveValue::Set(settlement.id.to_string()),
            list_id: ActiveValue::Set(settlement.list_id.to_string()),
            from_participant: ActiveValue::Set(settlement.from.to_string()),
            to_participant: ActiveValue::Set(settlement.to.to_string()),
            amount: ActiveValue::Set(settlement.amount),
            date: ActiveValue::Set(settlement.date),
            description: ActiveValue::Set(settlement.description.clone()),
            status: ActiveValue::Set(settlement.status.as_str().to_string()),
            created_by: ActiveValue::Set(settlement.created_by.to_string()),
            confirmed_by: ActiveValue::Set(settlement.confirmed_by.as_ref().map(ToString::to_string)),
            confirmed_at: ActiveValue::Set(settlement.confirmed_at),
        }
    }
}

impl TryFrom<Model> for Settlement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "settlement")?,
            list_id: parse_uuid(&model.list_id, "expense list")?,
            from: Participant::new(&model.from_participant),
            to: Participant::new(&model.to_participant),
            amount: model.amount,
            date: model.date,
            description: model.description,
            status: SettlementStatus::try_from(model.status.as_str())?,
            created_by: Participant::new(&model.created_by),
            confirmed_by: model.confirmed_by.as_deref().map(Participant::new),
            confirmed_at: model.confirmed_at,
        })
    }
}
