//! Expense primitives.
//!
//! An [`Expense`] is paid by one participant and split among others according
//! to a [`SplitPolicy`]:
//!
//! - `equal` / `dynamic` use [`Expense::split_participants`];
//! - `percentage` / `fixed` use [`Expense::split_items`].
//!
//! `dynamic` expenses may also carry percentage items, kept in sync with the
//! list membership by the [membership adjuster](crate::membership).

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Participant, ResultEngine, split_items,
    util::{normalize_optional_text, parse_uuid},
};

/// Allowed distance between the sum of percentage items and 100.
pub const PERCENTAGE_TOLERANCE: f64 = 0.1;
/// Allowed distance between the sum of fixed items and the expense amount.
pub const FIXED_TOLERANCE: f64 = 0.01;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    /// Split evenly among the selected participants.
    Equal,
    /// Split by custom percentages.
    Percentage,
    /// Split by fixed amounts.
    Fixed,
    /// Like `Equal`, but follows list membership changes.
    #[default]
    Dynamic,
}

impl SplitPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
            Self::Dynamic => "dynamic",
        }
    }

    /// Returns `true` for the policies driven by split items.
    pub fn uses_items(self) -> bool {
        matches!(self, Self::Percentage | Self::Fixed)
    }
}

impl TryFrom<&str> for SplitPolicy {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "equal" => Ok(Self::Equal),
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            "dynamic" => Ok(Self::Dynamic),
            other => Err(EngineError::Validation(format!(
                "invalid split policy: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transportation,
    Housing,
    Utilities,
    Entertainment,
    Shopping,
    Health,
    Travel,
    Education,
    Personal,
    Other,
    #[default]
    Uncategorized,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Self::Food,
        Self::Transportation,
        Self::Housing,
        Self::Utilities,
        Self::Entertainment,
        Self::Shopping,
        Self::Health,
        Self::Travel,
        Self::Education,
        Self::Personal,
        Self::Other,
        Self::Uncategorized,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transportation => "Transportation",
            Self::Housing => "Housing",
            Self::Utilities => "Utilities",
            Self::Entertainment => "Entertainment",
            Self::Shopping => "Shopping",
            Self::Health => "Health",
            Self::Travel => "Travel",
            Self::Education => "Education",
            Self::Personal => "Personal",
            Self::Other => "Other",
            Self::Uncategorized => "Uncategorized",
        }
    }

    /// Case-insensitive lookup; unknown names fall back to `Uncategorized`.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }
}

/// A participant's share of an expense: percentage points or a currency
/// amount, depending on the parent policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitItem {
    pub id: Uuid,
    pub participant: Participant,
    pub value: f64,
}

impl SplitItem {
    pub fn new(participant: Participant, value: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            participant,
            value,
        }
    }
}

/// `true` when the items add up to 100 within [`PERCENTAGE_TOLERANCE`].
pub fn percentages_valid(items: &[SplitItem]) -> bool {
    let total: f64 = items.iter().map(|item| item.value).sum();
    (total - 100.0).abs() < PERCENTAGE_TOLERANCE
}

/// `true` when the items add up to `amount` within [`FIXED_TOLERANCE`].
pub fn fixed_amounts_valid(items: &[SplitItem], amount: f64) -> bool {
    let total: f64 = items.iter().map(|item| item.value).sum();
    (total - amount).abs() < FIXED_TOLERANCE
}

/// Even percentage split among `participants`.
pub fn equal_percentage_items(participants: &[Participant]) -> Vec<SplitItem> {
    if participants.is_empty() {
        return Vec::new();
    }
    let share = 100.0 / participants.len() as f64;
    participants
        .iter()
        .map(|p| SplitItem::new(p.clone(), share))
        .collect()
}

/// Even fixed split of `amount` among `participants`.
pub fn equal_fixed_items(amount: f64, participants: &[Participant]) -> Vec<SplitItem> {
    if participants.is_empty() {
        return Vec::new();
    }
    let share = amount / participants.len() as f64;
    participants
        .iter()
        .map(|p| SplitItem::new(p.clone(), share))
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub description: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub payer: Participant,
    pub policy: SplitPolicy,
    pub split_participants: Vec<Participant>,
    pub split_items: Vec<SplitItem>,
    pub category: Category,
    pub notes: Option<String>,
    pub created_by: Participant,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Creates an expense with no split yet; use [`Expense::with_participants`]
    /// or [`Expense::with_items`] to describe it.
    pub fn new(
        description: &str,
        amount: f64,
        payer: Participant,
        policy: SplitPolicy,
        created_by: Participant,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.trim().to_string(),
            amount,
            date,
            payer,
            policy,
            split_participants: Vec::new(),
            split_items: Vec::new(),
            category: Category::default(),
            notes: None,
            created_by,
            created_at: Utc::now(),
        }
    }

    /// Sets the split participants, dropping duplicates.
    pub fn with_participants(mut self, participants: impl IntoIterator<Item = Participant>) -> Self {
        self.split_participants.clear();
        for participant in participants {
            if !self.split_participants.contains(&participant) {
                self.split_participants.push(participant);
            }
        }
        self
    }

    pub fn with_items(mut self, items: Vec<SplitItem>) -> Self {
        self.split_items = items;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_notes(mut self, notes: Option<&str>) -> Self {
        self.notes = normalize_optional_text(notes);
        self
    }

    /// Predicate form of [`Expense::validate`].
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Checks the invariants an expense must satisfy before it is stored.
    pub fn validate(&self) -> ResultEngine<()> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(EngineError::Validation("amount must be > 0".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(EngineError::Validation(
                "description must not be empty".to_string(),
            ));
        }
        if self.payer.is_empty() {
            return Err(EngineError::Validation("payer must not be empty".to_string()));
        }
        if self
            .split_items
            .iter()
            .any(|item| !item.value.is_finite() || item.value < 0.0)
        {
            return Err(EngineError::Validation(
                "split values must be >= 0".to_string(),
            ));
        }

        match self.policy {
            SplitPolicy::Equal | SplitPolicy::Dynamic => {
                if self.split_participants.is_empty() {
                    return Err(EngineError::Validation(
                        "select at least one participant to split with".to_string(),
                    ));
                }
                if !self.split_items.is_empty() && !percentages_valid(&self.split_items) {
                    return Err(EngineError::Validation(
                        "percentages must sum to 100".to_string(),
                    ));
                }
            }
            SplitPolicy::Percentage => {
                if self.split_items.is_empty() || !percentages_valid(&self.split_items) {
                    return Err(EngineError::Validation(
                        "percentages must sum to 100".to_string(),
                    ));
                }
            }
            SplitPolicy::Fixed => {
                if self.split_items.is_empty()
                    || !fixed_amounts_valid(&self.split_items, self.amount)
                {
                    return Err(EngineError::Validation(
                        "fixed amounts must sum to the expense amount".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Every participant referenced by the expense (payer included).
    pub fn involved(&self) -> impl Iterator<Item = &Participant> {
        std::iter::once(&self.payer)
            .chain(self.split_participants.iter())
            .chain(self.split_items.iter().map(|item| &item.participant))
    }

    /// Builds the row for `list_id`.
    pub(crate) fn active_model(&self, list_id: &str) -> ResultEngine<ActiveModel> {
        let split_participants = serde_json::to_string(&self.split_participants)
            .map_err(|err| EngineError::InvalidData(format!("split participants: {err}")))?;
        Ok(ActiveModel {
            id: ActiveValue::Set(self.id.to_string()),
            list_id: ActiveValue::Set(list_id.to_string()),
            description: ActiveValue::Set(self.description.clone()),
            amount: ActiveValue::Set(self.amount),
            date: ActiveValue::Set(self.date),
            payer: ActiveValue::Set(self.payer.to_string()),
            split_policy: ActiveValue::Set(self.policy.as_str().to_string()),
            split_participants: ActiveValue::Set(split_participants),
            category: ActiveValue::Set(self.category.as_str().to_string()),
            notes: ActiveValue::Set(self.notes.clone()),
            created_by: ActiveValue::Set(self.created_by.to_string()),
            created_at: ActiveValue::Set(self.created_at),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub list_id: String,
    pub description: String,
    pub amount: f64,
    pub date: DateTimeUtc,
    pub payer: String,
    pub split_policy: String,
    /// JSON array of emails.
    pub split_participants: String,
    pub category: String,
    pub notes: Option<String>,
    pub created_by: String,
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
    #[sea_orm(has_many = "super::split_items::Entity")]
    SplitItems,
}

impl Related<super::expense_lists::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseLists.def()
    }
}

impl Related<super::split_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SplitItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Rebuilds an expense from its row and its (position-ordered) split items.
impl TryFrom<(Model, Vec<split_items::Model>)> for Expense {
    type Error = EngineError;

    fn try_from((model, items): (Model, Vec<split_items::Model>)) -> Result<Self, Self::Error> {
        let split_participants: Vec<Participant> =
            serde_json::from_str(&model.split_participants).map_err(|err| {
                EngineError::InvalidData(format!("expense {}: {err}", model.id))
            })?;
        let split_items = items
            .into_iter()
            .map(SplitItem::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            description: model.description,
            amount: model.amount,
            date: model.date,
            payer: Participant::new(&model.payer),
            policy: SplitPolicy::try_from(model.split_policy.as_str())?,
            split_participants,
            split_items,
            category: Category::from_name(&model.category),
            notes: model.notes,
            created_by: Participant::new(&model.created_by),
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(email: &str, value: f64) -> SplitItem {
        SplitItem::new(Participant::new(email), value)
    }

    fn expense(policy: SplitPolicy, amount: f64) -> Expense {
        Expense::new(
            "Dinner",
            amount,
            Participant::new("p1@example.com"),
            policy,
            Participant::new("p1@example.com"),
            Utc::now(),
        )
    }

    #[test]
    fn percentage_split_must_sum_to_100() {
        assert!(percentages_valid(&[item("p1@x.io", 60.0), item("p2@x.io", 40.0)]));
        assert!(!percentages_valid(&[item("p1@x.io", 60.0), item("p2@x.io", 39.0)]));
        // Thirds do not add up to exactly 100.
        assert!(percentages_valid(&equal_percentage_items(&[
            Participant::new("a@x.io"),
            Participant::new("b@x.io"),
            Participant::new("c@x.io"),
        ])));
    }

    #[test]
    fn fixed_split_must_sum_to_amount() {
        assert!(fixed_amounts_valid(&[item("p1@x.io", 60.0), item("p2@x.io", 40.0)], 100.0));
        assert!(!fixed_amounts_valid(&[item("p1@x.io", 60.0), item("p2@x.io", 30.0)], 100.0));
    }

    #[test]
    fn validate_rejects_bad_amounts_and_descriptions() {
        let mut e = expense(SplitPolicy::Equal, 0.0)
            .with_participants([Participant::new("p1@example.com")]);
        assert!(!e.is_valid());
        e.amount = f64::NAN;
        assert!(!e.is_valid());
        e.amount = 10.0;
        assert!(e.is_valid());
        e.description = "   ".to_string();
        assert_eq!(
            e.validate(),
            Err(EngineError::Validation(
                "description must not be empty".to_string()
            ))
        );
    }

    #[test]
    fn validate_checks_the_authoritative_split() {
        let equal = expense(SplitPolicy::Equal, 30.0);
        assert!(!equal.is_valid());

        let percentage = expense(SplitPolicy::Percentage, 30.0)
            .with_items(vec![item("p1@x.io", 50.0), item("p2@x.io", 50.0)]);
        assert!(percentage.is_valid());

        let fixed = expense(SplitPolicy::Fixed, 30.0)
            .with_items(vec![item("p1@x.io", 10.0), item("p2@x.io", 10.0)]);
        assert!(!fixed.is_valid());
    }

    #[test]
    fn with_participants_drops_duplicates() {
        let e = expense(SplitPolicy::Equal, 10.0).with_participants([
            Participant::new("a@x.io"),
            Participant::new("A@x.io "),
            Participant::new("b@x.io"),
        ]);
        assert_eq!(e.split_participants.len(), 2);
    }

    #[test]
    fn policy_and_category_parse() {
        assert_eq!(SplitPolicy::try_from("fixed").unwrap(), SplitPolicy::Fixed);
        assert!(SplitPolicy::try_from("halves").is_err());
        assert_eq!(Category::from_name("travel"), Category::Travel);
        assert_eq!(Category::from_name("groceries"), Category::Uncategorized);
    }

    #[test]
    fn equal_fixed_items_cover_the_amount() {
        let items = equal_fixed_items(
            100.0,
            &[
                Participant::new("a@x.io"),
                Participant::new("b@x.io"),
                Participant::new("c@x.io"),
            ],
        );
        assert!(fixed_amounts_valid(&items, 100.0));
        assert!(equal_fixed_items(100.0, &[]).is_empty());
    }
}
