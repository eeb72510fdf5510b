//! Shared-expense ledger: lists, expenses, settlements and the balance math
//! on top of them.
//!
//! The pure parts ([`compute_balances`], [`simplify_debts`] and the
//! [membership adjuster](membership)) work on in-memory values. [`Engine`]
//! persists everything through sea-orm and runs each mutation in one
//! database transaction.

use std::collections::BTreeMap;

pub use activity_log::{ActivityAction, ActivityEntry};
pub use balances::{compute_adjusted_balances, compute_balances};
pub use debts::{Debt, NOISE_THRESHOLD, format_debt, simplify_debts};
pub use error::EngineError;
pub use expense_lists::ExpenseList;
pub use expenses::{
    Category, Expense, FIXED_TOLERANCE, PERCENTAGE_TOLERANCE, SplitItem, SplitPolicy,
    equal_fixed_items, equal_percentage_items, fixed_amounts_valid, percentages_valid,
};
pub use identity::{IdentityProvider, StaticIdentity};
pub use membership::{apply_participant_added, apply_participant_removed};
pub use ops::{Engine, EngineBuilder, MembershipChange};
pub use participant::Participant;
pub use settlements::{Settlement, SettlementStatus};

mod activity_log;
mod balances;
mod debts;
mod error;
mod expense_lists;
mod expenses;
mod identity;
mod list_memberships;
pub mod membership;
mod ops;
mod participant;
mod settlements;
mod split_items;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;

/// Net amount per participant: positive when owed, negative when owing.
pub type Balances = BTreeMap<Participant, f64>;
