//! Initial schema migration - creates all tables from scratch.
//!
//! - `expense_lists`: lists owned by a participant
//! - `list_memberships`: participants a list is shared with
//! - `expenses`: shared expenses with their split policy
//! - `split_items`: percentage / fixed shares of an expense
//! - `settlements`: payments between participants
//! - `activity_log`: sharing and settlement history

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum ExpenseLists {
    Table,
    Id,
    Name,
    Owner,
    CreatedAt,
}

#[derive(Iden)]
enum ListMemberships {
    Table,
    ListId,
    Participant,
    AddedAt,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    ListId,
    Description,
    Amount,
    Date,
    Payer,
    SplitPolicy,
    SplitParticipants,
    Category,
    Notes,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum SplitItems {
    Table,
    Id,
    ExpenseId,
    Position,
    Participant,
    Value,
}

#[derive(Iden)]
enum Settlements {
    Table,
    Id,
    ListId,
    FromParticipant,
    ToParticipant,
    Amount,
    Date,
    Description,
    Status,
    CreatedBy,
    ConfirmedBy,
    ConfirmedAt,
}

#[derive(Iden)]
enum ActivityLog {
    Table,
    Id,
    ListId,
    Action,
    Actor,
    Subject,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Expense lists
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ExpenseLists::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseLists::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExpenseLists::Name).string().not_null())
                    .col(ColumnDef::new(ExpenseLists::Owner).string().not_null())
                    .col(
                        ColumnDef::new(ExpenseLists::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_lists-owner")
                    .table(ExpenseLists::Table)
                    .col(ExpenseLists::Owner)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. List memberships
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ListMemberships::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ListMemberships::ListId).string().not_null())
                    .col(
                        ColumnDef::new(ListMemberships::Participant)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ListMemberships::AddedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ListMemberships::ListId)
                            .col(ListMemberships::Participant),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-list_memberships-list_id")
                            .from(ListMemberships::Table, ListMemberships::ListId)
                            .to(ExpenseLists::Table, ExpenseLists::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-list_memberships-participant")
                    .table(ListMemberships::Table)
                    .col(ListMemberships::Participant)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::ListId).string().not_null())
                    .col(ColumnDef::new(Expenses::Description).string().not_null())
                    .col(ColumnDef::new(Expenses::Amount).double().not_null())
                    .col(
                        ColumnDef::new(Expenses::Date)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::Payer).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::SplitPolicy)
                            .string()
                            .not_null()
                            .default("dynamic"),
                    )
                    .col(
                        ColumnDef::new(Expenses::SplitParticipants)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Expenses::Category)
                            .string()
                            .not_null()
                            .default("Uncategorized"),
                    )
                    .col(ColumnDef::new(Expenses::Notes).string())
                    .col(ColumnDef::new(Expenses::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-list_id")
                            .from(Expenses::Table, Expenses::ListId)
                            .to(ExpenseLists::Table, ExpenseLists::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-list_id-date")
                    .table(Expenses::Table)
                    .col(Expenses::ListId)
                    .col(Expenses::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-list_id-split_policy")
                    .table(Expenses::Table)
                    .col(Expenses::ListId)
                    .col(Expenses::SplitPolicy)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Split items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SplitItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SplitItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SplitItems::ExpenseId).string().not_null())
                    .col(ColumnDef::new(SplitItems::Position).integer().not_null())
                    .col(ColumnDef::new(SplitItems::Participant).string().not_null())
                    .col(ColumnDef::new(SplitItems::Value).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-split_items-expense_id")
                            .from(SplitItems::Table, SplitItems::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-split_items-expense_id")
                    .table(SplitItems::Table)
                    .col(SplitItems::ExpenseId)
                    .col(SplitItems::Position)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Settlements
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Settlements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settlements::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settlements::ListId).string().not_null())
                    .col(
                        ColumnDef::new(Settlements::FromParticipant)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Settlements::ToParticipant)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Settlements::Amount).double().not_null())
                    .col(
                        ColumnDef::new(Settlements::Date)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Settlements::Description).string().not_null())
                    .col(
                        ColumnDef::new(Settlements::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Settlements::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Settlements::ConfirmedBy).string())
                    .col(ColumnDef::new(Settlements::ConfirmedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-settlements-list_id")
                            .from(Settlements::Table, Settlements::ListId)
                            .to(ExpenseLists::Table, ExpenseLists::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-settlements-list_id-status")
                    .table(Settlements::Table)
                    .col(Settlements::ListId)
                    .col(Settlements::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Activity log
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ActivityLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActivityLog::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ActivityLog::ListId).string().not_null())
                    .col(ColumnDef::new(ActivityLog::Action).string().not_null())
                    .col(ColumnDef::new(ActivityLog::Actor).string().not_null())
                    .col(ColumnDef::new(ActivityLog::Subject).string().not_null())
                    .col(
                        ColumnDef::new(ActivityLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-activity_log-list_id")
                            .from(ActivityLog::Table, ActivityLog::ListId)
                            .to(ExpenseLists::Table, ExpenseLists::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-activity_log-list_id-created_at")
                    .table(ActivityLog::Table)
                    .col(ActivityLog::ListId)
                    .col(ActivityLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(ActivityLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Settlements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SplitItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ListMemberships::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseLists::Table).to_owned())
            .await?;
        Ok(())
    }
}
