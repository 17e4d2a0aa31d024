use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use crate::error::{LedgerError, LedgerResult};
use crate::schemas::{Expense, ExpenseId, GroupId, ParticipantId, Split, MAX_AMOUNT};

/// An expense as submitted, before its splits have been checked against the total.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpenseDraft {
    pub title: String,
    pub amount: Decimal,
    pub paid_by: ParticipantId,
    pub date: NaiveDate,
    pub splits: Vec<Split>,
}

/// Request body for creating or editing an expense. Either explicit `splits`
/// or a list of participants to `split_equally` between.
#[derive(Clone, Debug, Deserialize)]
pub struct ExpenseRequest {
    pub title: String,
    pub amount: Decimal,
    pub paid_by: ParticipantId,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub splits: Vec<Split>,
    #[serde(default)]
    pub split_equally: Vec<ParticipantId>,
}

impl ExpenseRequest {
    pub fn into_draft(self, today: NaiveDate) -> ExpenseDraft {
        let splits = if self.splits.is_empty() {
            equal_splits(self.amount, &self.split_equally)
        } else {
            self.splits
        };
        ExpenseDraft {
            title: self.title,
            amount: self.amount,
            paid_by: self.paid_by,
            date: self.date.unwrap_or(today),
            splits,
        }
    }
}

impl ExpenseDraft {
    /// Validates the draft and returns the splits it should be stored with.
    ///
    /// Splits may differ from the amount by half a cent per split, which is
    /// what rounding each share of an equal split to cents can produce. That
    /// residue is folded into the payer's split (or the largest one when the
    /// payer has no share) so the stored splits add up exactly.
    pub fn balanced_splits(&self) -> LedgerResult<Vec<Split>> {
        if self.title.trim().is_empty() {
            return Err(LedgerError::EmptyField("title"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount {
                field: "amount",
                amount: self.amount,
            });
        }
        if self.amount > MAX_AMOUNT {
            return Err(LedgerError::AmountTooLarge {
                field: "amount",
                amount: self.amount,
            });
        }
        if self.splits.is_empty() {
            return Err(LedgerError::NoSplits);
        }

        let mut seen = HashSet::new();
        for split in &self.splits {
            if split.amount < Decimal::ZERO {
                return Err(LedgerError::NegativeSplit(split.participant_id.clone()));
            }
            if split.amount > MAX_AMOUNT {
                return Err(LedgerError::AmountTooLarge {
                    field: "split",
                    amount: split.amount,
                });
            }
            if !seen.insert(&split.participant_id) {
                return Err(LedgerError::DuplicateSplit(split.participant_id.clone()));
            }
        }

        let actual = self
            .splits
            .iter()
            .try_fold(Decimal::ZERO, |sum, s| sum.checked_add(s.amount))
            .ok_or(LedgerError::AmountOverflow)?;
        let residue = self.amount - actual;
        let tolerance = Decimal::new(5, 3) * Decimal::from(self.splits.len());
        let mismatch = LedgerError::SplitMismatch {
            expected: self.amount,
            actual,
        };
        if residue.abs() > tolerance {
            return Err(mismatch);
        }

        let mut splits = self.splits.clone();
        if !residue.is_zero() {
            let absorber = splits
                .iter()
                .position(|s| s.participant_id == self.paid_by)
                .or_else(|| {
                    splits
                        .iter()
                        .enumerate()
                        .max_by_key(|(_, s)| s.amount)
                        .map(|(i, _)| i)
                })
                .ok_or(LedgerError::NoSplits)?;
            let adjusted = splits[absorber].amount + residue;
            if adjusted < Decimal::ZERO {
                return Err(mismatch);
            }
            splits[absorber].amount = adjusted;
        }
        Ok(splits)
    }

    pub fn into_expense(
        self,
        id: ExpenseId,
        group_id: GroupId,
        created_at: DateTime<Utc>,
    ) -> LedgerResult<Expense> {
        let splits = self.balanced_splits()?;
        Ok(Expense {
            id,
            group_id,
            title: self.title.trim().to_string(),
            amount: self.amount,
            paid_by: self.paid_by,
            date: self.date,
            created_at,
            splits,
        })
    }
}

/// Splits `amount` into cent-exact equal shares. Leftover cents go to the
/// first participants, so the shares always add up to `amount`.
pub fn equal_splits(amount: Decimal, participants: &[ParticipantId]) -> Vec<Split> {
    if participants.is_empty() {
        return Vec::new();
    }
    let count = Decimal::from(participants.len());
    let cent = Decimal::new(1, 2);
    let base = (amount / count).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let mut leftover = amount - base * count;

    let mut splits: Vec<Split> = participants
        .iter()
        .map(|participant_id| {
            let mut share = base;
            if leftover >= cent {
                share += cent;
                leftover -= cent;
            }
            Split {
                participant_id: participant_id.clone(),
                amount: share,
            }
        })
        .collect();
    // sub-cent remainder when the amount itself has more than two decimals
    splits[0].amount += leftover;
    splits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn draft(amount: &str, splits: &[(&str, &str)]) -> ExpenseDraft {
        let e = expense("draft", "alice", amount, splits);
        ExpenseDraft {
            title: "Dinner".to_string(),
            amount: e.amount,
            paid_by: e.paid_by,
            date: e.date,
            splits: e.splits,
        }
    }

    fn ids(names: &[&str]) -> Vec<ParticipantId> {
        names.iter().map(|n| ParticipantId::from(*n)).collect()
    }

    #[test]
    fn balanced_draft_becomes_expense() {
        let expense = draft("300", &[("alice", "100"), ("bob", "100"), ("carol", "100")])
            .into_expense(ExpenseId::from("e1"), group_id(), at(2))
            .unwrap();
        assert_eq!(expense.title, "Dinner");
        assert_eq!(expense.splits.len(), 3);
        assert_eq!(expense.group_id, group_id());
    }

    #[test]
    fn unbalanced_splits_are_rejected() {
        let err = draft("300", &[("alice", "100"), ("bob", "100")])
            .balanced_splits()
            .unwrap_err();
        match err {
            LedgerError::SplitMismatch { expected, actual } => {
                assert_eq!(expected, dec("300"));
                assert_eq!(actual, dec("200"));
            }
            other => panic!("expected split mismatch, got {other:?}"),
        }
    }

    #[test]
    fn rounding_residue_goes_to_payer() {
        let splits = draft("100", &[("bob", "33.33"), ("alice", "33.33"), ("carol", "33.33")])
            .balanced_splits()
            .unwrap();
        assert_eq!(splits[1].amount, dec("33.34"));
        assert_eq!(splits.iter().map(|s| s.amount).sum::<Decimal>(), dec("100"));
    }

    #[test]
    fn rounding_residue_without_payer_share_goes_to_largest() {
        let splits = draft("10", &[("bob", "3.33"), ("carol", "6.66")])
            .balanced_splits()
            .unwrap();
        assert_eq!(splits[0].amount, dec("3.33"));
        assert_eq!(splits[1].amount, dec("6.67"));
    }

    #[test]
    fn residue_beyond_half_cent_per_split_is_rejected() {
        assert!(matches!(
            draft("100", &[("alice", "49.99"), ("bob", "49.99")]).balanced_splits(),
            Err(LedgerError::SplitMismatch { .. })
        ));
    }

    #[test]
    fn amounts_must_be_positive() {
        assert!(matches!(
            draft("0", &[("alice", "0")]).balanced_splits(),
            Err(LedgerError::NonPositiveAmount { field: "amount", .. })
        ));
        assert!(matches!(
            draft("-20", &[("alice", "-20")]).balanced_splits(),
            Err(LedgerError::NonPositiveAmount { .. })
        ));
        assert!(matches!(
            draft("20", &[("alice", "30"), ("bob", "-10")]).balanced_splits(),
            Err(LedgerError::NegativeSplit(_))
        ));
    }

    #[test]
    fn oversized_amounts_are_rejected_without_panicking() {
        let mut huge = draft("1", &[("alice", "1")]);
        huge.amount = Decimal::MAX;
        huge.splits[0].amount = Decimal::MAX;
        huge.splits.push(Split {
            participant_id: ParticipantId::from("bob"),
            amount: Decimal::ONE,
        });
        assert!(matches!(
            huge.balanced_splits(),
            Err(LedgerError::AmountTooLarge { field: "amount", .. })
        ));

        let oversized_split = draft(
            "10",
            &[("alice", "79228162514264337593543950335"), ("bob", "1")],
        );
        assert!(matches!(
            oversized_split.balanced_splits(),
            Err(LedgerError::AmountTooLarge { field: "split", .. })
        ));

        let ceiling = draft("1000000000000000", &[("alice", "1000000000000000")]);
        assert!(ceiling.balanced_splits().is_ok());
        let above = draft("1000000000000000.01", &[("alice", "1000000000000000.01")]);
        assert!(matches!(
            above.balanced_splits(),
            Err(LedgerError::AmountTooLarge { .. })
        ));
    }

    #[test]
    fn structural_problems_are_rejected() {
        assert!(matches!(
            draft("20", &[]).balanced_splits(),
            Err(LedgerError::NoSplits)
        ));
        assert!(matches!(
            draft("20", &[("bob", "10"), ("bob", "10")]).balanced_splits(),
            Err(LedgerError::DuplicateSplit(_))
        ));
        let mut blank = draft("20", &[("bob", "20")]);
        blank.title = "   ".to_string();
        assert!(matches!(
            blank.balanced_splits(),
            Err(LedgerError::EmptyField("title"))
        ));
    }

    #[test]
    fn equal_splits_hand_out_leftover_cents() {
        let splits = equal_splits(dec("100"), &ids(&["alice", "bob", "carol"]));
        let shares: Vec<_> = splits.iter().map(|s| s.amount).collect();
        assert_eq!(shares, vec![dec("33.34"), dec("33.33"), dec("33.33")]);

        let splits = equal_splits(dec("0.05"), &ids(&["alice", "bob", "carol"]));
        let shares: Vec<_> = splits.iter().map(|s| s.amount).collect();
        assert_eq!(shares, vec![dec("0.02"), dec("0.02"), dec("0.01")]);

        let splits = equal_splits(dec("10.005"), &ids(&["alice", "bob"]));
        assert_eq!(splits.iter().map(|s| s.amount).sum::<Decimal>(), dec("10.005"));

        assert!(equal_splits(dec("10"), &[]).is_empty());
    }

    #[test]
    fn request_defaults_to_equal_split_and_today() {
        let request: ExpenseRequest = serde_json::from_value(serde_json::json!({
            "title": "Gas",
            "amount": "90",
            "paid_by": "bob",
            "split_equally": ["alice", "bob", "carol"],
        }))
        .unwrap();
        let draft = request.into_draft(day(9));
        assert_eq!(draft.date, day(9));
        assert_eq!(draft.splits.len(), 3);
        assert!(draft.splits.iter().all(|s| s.amount == dec("30")));
    }
}
