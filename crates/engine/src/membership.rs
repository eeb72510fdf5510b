//! Keeps `dynamic` expenses in step with the list membership.
//!
//! Both functions leave other policies untouched and report whether the
//! expense changed, so callers only rewrite what moved. Percentage items are
//! always reset to an even split; customized values are not preserved.

use crate::{Expense, Participant, SplitItem, SplitPolicy};

/// Adds `participant` to a dynamic expense's split.
pub fn apply_participant_added(expense: &mut Expense, participant: &Participant) -> bool {
    if expense.policy != SplitPolicy::Dynamic
        || expense.split_participants.contains(participant)
    {
        return false;
    }
    expense.split_participants.push(participant.clone());

    if !expense.split_items.is_empty() {
        if !expense
            .split_items
            .iter()
            .any(|item| &item.participant == participant)
        {
            expense
                .split_items
                .push(SplitItem::new(participant.clone(), 0.0));
        }
        rebalance_items(&mut expense.split_items);
    }
    true
}

/// Removes `participant` from a dynamic expense's split. A removed payer is
/// replaced by `owner`.
pub fn apply_participant_removed(
    expense: &mut Expense,
    participant: &Participant,
    owner: &Participant,
) -> bool {
    if expense.policy != SplitPolicy::Dynamic {
        return false;
    }

    let before = (expense.split_participants.len(), expense.split_items.len());
    expense.split_participants.retain(|p| p != participant);
    expense
        .split_items
        .retain(|item| &item.participant != participant);
    let mut changed = before != (expense.split_participants.len(), expense.split_items.len());

    if changed && !expense.split_items.is_empty() {
        rebalance_items(&mut expense.split_items);
    }
    if &expense.payer == participant && participant != owner {
        expense.payer = owner.clone();
        changed = true;
    }
    changed
}

fn rebalance_items(items: &mut [SplitItem]) {
    let share = 100.0 / items.len() as f64;
    for item in items {
        item.value = share;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn p(email: &str) -> Participant {
        Participant::new(email)
    }

    fn dynamic(payer: &str, members: &[&str]) -> Expense {
        Expense::new("Rent", 100.0, p(payer), SplitPolicy::Dynamic, p(payer), Utc::now())
            .with_participants(members.iter().map(|m| p(m)))
    }

    fn values(expense: &Expense) -> Vec<(String, f64)> {
        expense
            .split_items
            .iter()
            .map(|item| (item.participant.to_string(), item.value))
            .collect()
    }

    #[test]
    fn adding_resets_percentages_evenly() {
        let mut e = dynamic("p1", &["p1"]).with_items(vec![SplitItem::new(p("p1"), 100.0)]);
        assert!(apply_participant_added(&mut e, &p("p2")));
        assert_eq!(e.split_participants, vec![p("p1"), p("p2")]);
        assert_eq!(
            values(&e),
            vec![("p1".to_string(), 50.0), ("p2".to_string(), 50.0)]
        );
    }

    #[test]
    fn adding_an_existing_participant_is_a_no_op() {
        let mut e = dynamic("p1", &["p1", "p2"]);
        assert!(!apply_participant_added(&mut e, &p("p2")));
        assert_eq!(e.split_participants.len(), 2);
    }

    #[test]
    fn other_policies_are_left_alone() {
        let mut e = Expense::new("Taxi", 10.0, p("p1"), SplitPolicy::Equal, p("p1"), Utc::now())
            .with_participants([p("p1")]);
        assert!(!apply_participant_added(&mut e, &p("p2")));
        assert!(!apply_participant_removed(&mut e, &p("p1"), &p("owner")));
        assert_eq!(e.payer, p("p1"));
    }

    #[test]
    fn removing_shrinks_and_redistributes() {
        let mut e = dynamic("p1", &["p1", "p2", "p3"]).with_items(vec![
            SplitItem::new(p("p1"), 20.0),
            SplitItem::new(p("p2"), 30.0),
            SplitItem::new(p("p3"), 50.0),
        ]);
        assert!(apply_participant_removed(&mut e, &p("p3"), &p("p1")));
        assert_eq!(e.split_participants, vec![p("p1"), p("p2")]);
        assert_eq!(
            values(&e),
            vec![("p1".to_string(), 50.0), ("p2".to_string(), 50.0)]
        );
        assert_eq!(e.payer, p("p1"));
    }

    #[test]
    fn removing_the_payer_hands_the_expense_to_the_owner() {
        let mut e = dynamic("p2", &["p1", "p2"]);
        assert!(apply_participant_removed(&mut e, &p("p2"), &p("owner")));
        assert_eq!(e.payer, p("owner"));
        assert_eq!(e.split_participants, vec![p("p1")]);
    }

    #[test]
    fn removing_the_last_participant_leaves_an_empty_split() {
        let mut e = dynamic("owner", &["p1"]);
        assert!(apply_participant_removed(&mut e, &p("p1"), &p("owner")));
        assert!(e.split_participants.is_empty());
        assert!(!apply_participant_removed(&mut e, &p("p1"), &p("owner")));
    }
}
