//! Shared participants of an expense list. The owner has no row here.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "list_memberships")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub list_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub participant: String,
    pub added_at: DateTimeUtc,
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
