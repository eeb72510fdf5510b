use chrono::Utc;
use proptest::prelude::*;

use engine::{
    Balances, Expense, Participant, SplitItem, SplitPolicy, compute_balances, simplify_debts,
};

const PEOPLE: [&str; 5] = [
    "ann@example.com",
    "bob@example.com",
    "cat@example.com",
    "dan@example.com",
    "eve@example.com",
];

fn person() -> impl Strategy<Value = Participant> {
    (0..PEOPLE.len()).prop_map(|i| Participant::new(PEOPLE[i]))
}

fn group() -> impl Strategy<Value = Vec<Participant>> {
    proptest::sample::subsequence(PEOPLE.to_vec(), 1..=PEOPLE.len())
        .prop_map(|emails| emails.into_iter().map(Participant::new).collect())
}

/// Expenses whose split accounts for the full amount.
fn well_formed_expense() -> impl Strategy<Value = Expense> {
    (person(), 1u32..100_000, group(), 0..3usize).prop_map(|(payer, cents, members, kind)| {
        let amount = f64::from(cents) / 100.0;
        let base = |policy| {
            Expense::new("generated", amount, payer.clone(), policy, payer.clone(), Utc::now())
        };
        match kind {
            0 => base(SplitPolicy::Equal).with_participants(members),
            1 => {
                let share = 100.0 / members.len() as f64;
                base(SplitPolicy::Percentage).with_items(
                    members
                        .into_iter()
                        .map(|p| SplitItem::new(p, share))
                        .collect(),
                )
            }
            _ => {
                let share = amount / members.len() as f64;
                base(SplitPolicy::Fixed).with_items(
                    members
                        .into_iter()
                        .map(|p| SplitItem::new(p, share))
                        .collect(),
                )
            }
        }
    })
}

fn balances() -> impl Strategy<Value = Balances> {
    proptest::collection::vec(-100_000i64..100_000, PEOPLE.len()).prop_map(|cents| {
        let mut out: Balances = PEOPLE
            .iter()
            .zip(&cents)
            .map(|(email, c)| (Participant::new(email), *c as f64 / 100.0))
            .collect();
        // The last participant absorbs the remainder so the map nets to zero.
        let sum: i64 = cents[..PEOPLE.len() - 1].iter().sum();
        out.insert(Participant::new(PEOPLE[PEOPLE.len() - 1]), -(sum as f64) / 100.0);
        out
    })
}

proptest! {
    #[test]
    fn balances_sum_to_zero(expenses in proptest::collection::vec(well_formed_expense(), 0..20)) {
        let balances = compute_balances(&expenses);
        let sum: f64 = balances.values().sum();
        prop_assert!(sum.abs() < 1e-6, "sum was {}", sum);
    }

    #[test]
    fn simplified_debts_settle_every_balance(balances in balances()) {
        let debts = simplify_debts(&balances);
        let debtors = balances.values().filter(|b| **b < 0.0).count();
        let creditors = balances.values().filter(|b| **b > 0.0).count();
        prop_assert!(debts.len() <= (debtors + creditors).saturating_sub(1));

        let owed: f64 = balances.values().filter(|b| **b > 0.0).sum();
        let moved: f64 = debts.iter().map(|d| d.amount).sum();
        // Every participant may strand up to a cent per counterparty.
        let slack = 0.01 * balances.len() as f64 + 1e-6;
        prop_assert!((owed - moved).abs() <= slack);

        let mut remaining = balances.clone();
        for debt in &debts {
            prop_assert!(debt.amount > 0.01);
            prop_assert!(balances[&debt.from] < 0.0);
            prop_assert!(balances[&debt.to] > 0.0);
            *remaining.get_mut(&debt.from).unwrap() += debt.amount;
            *remaining.get_mut(&debt.to).unwrap() -= debt.amount;
        }
        for value in remaining.values() {
            prop_assert!(value.abs() <= slack, "left over {}", value);
        }
    }
}
