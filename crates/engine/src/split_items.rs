//! Rows backing [`SplitItem`]. `position` keeps the order the items were
//! entered in.

use sea_orm::{ActiveValue, entity::prelude::*};

use crate::{EngineError, Participant, SplitItem, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "split_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub position: i32,
    pub participant: String,
    pub value: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for SplitItem {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "split item")?,
            participant: Participant::new(&model.participant),
            value: model.value,
        })
    }
}

pub(crate) fn active_model(item: &SplitItem, expense_id: &str, position: usize) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::Set(item.id.to_string()),
        expense_id: ActiveValue::Set(expense_id.to_string()),
        position: ActiveValue::Set(i32::try_from(position).unwrap_or(i32::MAX)),
        participant: ActiveValue::Set(item.participant.to_string()),
        value: ActiveValue::Set(item.value),
    }
}
