//! Folds expenses (and confirmed settlements) into net balances.
//!
//! A positive balance means the participant is owed money, a negative one
//! that they owe it.

use crate::{Balances, Expense, Settlement, SettlementStatus, SplitPolicy};

/// Net balance per participant.
///
/// The payer is credited the full amount, then every share is debited
/// according to the split policy. An expense with an empty split only
/// credits its payer.
pub fn compute_balances<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> Balances {
    let mut balances = Balances::new();
    for expense in expenses {
        *balances.entry(expense.payer.clone()).or_insert(0.0) += expense.amount;

        match expense.policy {
            SplitPolicy::Equal | SplitPolicy::Dynamic => {
                if expense.split_participants.is_empty() {
                    continue;
                }
                let share = expense.amount / expense.split_participants.len() as f64;
                for participant in &expense.split_participants {
                    *balances.entry(participant.clone()).or_insert(0.0) -= share;
                }
            }
            SplitPolicy::Percentage => {
                for item in &expense.split_items {
                    *balances.entry(item.participant.clone()).or_insert(0.0) -=
                        expense.amount * item.value / 100.0;
                }
            }
            SplitPolicy::Fixed => {
                for item in &expense.split_items {
                    *balances.entry(item.participant.clone()).or_insert(0.0) -= item.value;
                }
            }
        }
    }
    balances
}

/// [`compute_balances`] plus every confirmed settlement: the payer (`from`)
/// moves up and the recipient (`to`) moves down by the settled amount.
pub fn compute_adjusted_balances<'a>(
    expenses: impl IntoIterator<Item = &'a Expense>,
    settlements: impl IntoIterator<Item = &'a Settlement>,
) -> Balances {
    let mut balances = compute_balances(expenses);
    for settlement in settlements {
        if settlement.status != SettlementStatus::Confirmed {
            continue;
        }
        *balances.entry(settlement.from.clone()).or_insert(0.0) += settlement.amount;
        *balances.entry(settlement.to.clone()).or_insert(0.0) -= settlement.amount;
    }
    balances
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::{Participant, SplitItem};

    fn p(email: &str) -> Participant {
        Participant::new(email)
    }

    fn expense(payer: &str, amount: f64, policy: SplitPolicy) -> Expense {
        Expense::new("Groceries", amount, p(payer), policy, p(payer), Utc::now())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn equal_split_debits_every_participant() {
        let e = expense("a@x.io", 90.0, SplitPolicy::Equal).with_participants([
            p("a@x.io"),
            p("b@x.io"),
            p("c@x.io"),
        ]);
        let balances = compute_balances([&e]);
        assert!(close(balances[&p("a@x.io")], 60.0));
        assert!(close(balances[&p("b@x.io")], -30.0));
        assert!(close(balances[&p("c@x.io")], -30.0));
    }

    #[test]
    fn percentage_and_fixed_splits_use_items() {
        let pct = expense("a@x.io", 200.0, SplitPolicy::Percentage).with_items(vec![
            SplitItem::new(p("a@x.io"), 25.0),
            SplitItem::new(p("b@x.io"), 75.0),
        ]);
        let fixed = expense("b@x.io", 50.0, SplitPolicy::Fixed).with_items(vec![
            SplitItem::new(p("a@x.io"), 20.0),
            SplitItem::new(p("b@x.io"), 30.0),
        ]);
        let balances = compute_balances([&pct, &fixed]);
        // a: +200 - 50 - 20, b: +50 - 150 - 30
        assert!(close(balances[&p("a@x.io")], 130.0));
        assert!(close(balances[&p("b@x.io")], -130.0));
    }

    #[test]
    fn empty_split_only_credits_the_payer() {
        let e = expense("a@x.io", 40.0, SplitPolicy::Dynamic);
        let balances = compute_balances([&e]);
        assert_eq!(balances.len(), 1);
        assert!(close(balances[&p("a@x.io")], 40.0));
    }

    #[test]
    fn confirmed_settlements_zero_the_balances() {
        let e = expense("b@x.io", 20.0, SplitPolicy::Fixed)
            .with_items(vec![SplitItem::new(p("a@x.io"), 20.0)]);
        let list_id = Uuid::new_v4();

        let pending = Settlement::new_pending(list_id, p("a@x.io"), p("b@x.io"), 20.0, None);
        let balances = compute_adjusted_balances([&e], [&pending]);
        assert!(close(balances[&p("a@x.io")], -20.0));
        assert!(close(balances[&p("b@x.io")], 20.0));

        let confirmed = Settlement::new_confirmed(list_id, p("a@x.io"), p("b@x.io"), 20.0, None);
        let balances = compute_adjusted_balances([&e], [&pending, &confirmed]);
        assert!(close(balances[&p("a@x.io")], 0.0));
        assert!(close(balances[&p("b@x.io")], 0.0));
    }

    #[test]
    fn rejected_settlements_are_ignored() {
        let e = expense("b@x.io", 20.0, SplitPolicy::Fixed)
            .with_items(vec![SplitItem::new(p("a@x.io"), 20.0)]);
        let mut rejected =
            Settlement::new_pending(Uuid::new_v4(), p("a@x.io"), p("b@x.io"), 20.0, None);
        rejected.status = SettlementStatus::Rejected;
        assert_eq!(
            compute_adjusted_balances([&e], [&rejected]),
            compute_balances([&e])
        );
    }
}
