//! Greedy debt netting.
//!
//! Turns net balances into a short list of payments: the largest debtor pays
//! the largest creditor until one of them is settled, then the next one
//! steps in. Amounts below [`NOISE_THRESHOLD`] are treated as settled.

use serde::{Deserialize, Serialize};

use crate::{Balances, Participant};

pub const NOISE_THRESHOLD: f64 = 0.01;

/// A suggested payment. Derived on demand, never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub from: Participant,
    pub to: Participant,
    pub amount: f64,
}

/// Suggested payments that zero out `balances`.
///
/// Equal amounts are ordered by participant, so the output only depends on
/// the balances themselves.
pub fn simplify_debts(balances: &Balances) -> Vec<Debt> {
    let mut debtors: Vec<(&Participant, f64)> = balances
        .iter()
        .filter(|(_, amount)| **amount < 0.0)
        .map(|(p, amount)| (p, -amount))
        .collect();
    let mut creditors: Vec<(&Participant, f64)> = balances
        .iter()
        .filter(|(_, amount)| **amount > 0.0)
        .map(|(p, amount)| (p, *amount))
        .collect();

    // Stable sort: ties keep the map order.
    debtors.sort_by(|a, b| b.1.total_cmp(&a.1));
    creditors.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut debts = Vec::new();
    let (mut d, mut c) = (0, 0);
    while d < debtors.len() && c < creditors.len() {
        let amount = debtors[d].1.min(creditors[c].1);
        if amount > NOISE_THRESHOLD {
            debts.push(Debt {
                from: debtors[d].0.clone(),
                to: creditors[c].0.clone(),
                amount,
            });
        }

        debtors[d].1 -= amount;
        creditors[c].1 -= amount;
        if debtors[d].1 < NOISE_THRESHOLD {
            d += 1;
        }
        if creditors[c].1 < NOISE_THRESHOLD {
            c += 1;
        }
    }
    debts
}

/// `"<from> pays <amount> to <to>"`, amount with two decimals.
pub fn format_debt(debt: &Debt) -> String {
    format!("{} pays {:.2} to {}", debt.from, debt.amount, debt.to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balances(entries: &[(&str, f64)]) -> Balances {
        entries
            .iter()
            .map(|(email, amount)| (Participant::new(email), *amount))
            .collect()
    }

    fn debt(from: &str, to: &str, amount: f64) -> Debt {
        Debt {
            from: Participant::new(from),
            to: Participant::new(to),
            amount,
        }
    }

    #[test]
    fn one_creditor_two_debtors() {
        let debts = simplify_debts(&balances(&[("a", 100.0), ("b", -50.0), ("c", -50.0)]));
        assert_eq!(debts, vec![debt("b", "a", 50.0), debt("c", "a", 50.0)]);
    }

    #[test]
    fn two_creditors_one_debtor() {
        let debts = simplify_debts(&balances(&[("a", 30.0), ("b", 30.0), ("c", -60.0)]));
        assert_eq!(debts, vec![debt("c", "a", 30.0), debt("c", "b", 30.0)]);
    }

    #[test]
    fn zero_balances_need_no_payments() {
        assert!(simplify_debts(&balances(&[("a", 0.0), ("b", 0.0)])).is_empty());
        assert!(simplify_debts(&Balances::new()).is_empty());
    }

    #[test]
    fn largest_amounts_are_paired_first() {
        let debts = simplify_debts(&balances(&[
            ("a", 10.0),
            ("b", 70.0),
            ("c", -20.0),
            ("d", -60.0),
        ]));
        assert_eq!(
            debts,
            vec![
                debt("d", "b", 60.0),
                debt("c", "b", 10.0),
                debt("c", "a", 10.0)
            ]
        );
    }

    #[test]
    fn sub_cent_remainders_are_dropped() {
        let debts = simplify_debts(&balances(&[("a", 33.333), ("b", -33.33), ("c", -0.003)]));
        assert_eq!(debts.len(), 1);
        assert_eq!(debts[0].from, Participant::new("b"));
    }

    #[test]
    fn format_uses_two_decimals() {
        assert_eq!(
            format_debt(&debt("bob@x.io", "ann@x.io", 12.5)),
            "bob@x.io pays 12.50 to ann@x.io"
        );
    }
}
