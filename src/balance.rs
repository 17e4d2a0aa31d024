use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::schemas::{Expense, GroupId, Participant, ParticipantId, Settlement};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Balance {
    pub participant_id: ParticipantId,
    pub total_paid: Decimal,
    pub total_owed: Decimal,
    pub net_balance: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    GetsBack,
    Owes,
    Settled,
}

impl Balance {
    pub fn status(&self) -> BalanceStatus {
        if self.net_balance > Decimal::ZERO {
            BalanceStatus::GetsBack
        } else if self.net_balance < Decimal::ZERO {
            BalanceStatus::Owes
        } else {
            BalanceStatus::Settled
        }
    }

    /// Display copy with every amount rounded to cents.
    pub fn rounded(&self) -> Balance {
        Balance {
            participant_id: self.participant_id.clone(),
            total_paid: round_to_cents(self.total_paid),
            total_owed: round_to_cents(self.total_owed),
            net_balance: round_to_cents(self.net_balance),
        }
    }
}

pub fn round_to_cents(n: Decimal) -> Decimal {
    n.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Clone, Copy, Default)]
struct Totals {
    paid: Decimal,
    owed: Decimal,
    received: Decimal,
    sent: Decimal,
}

/// Computes one balance per participant of `group_id`, keeping the order of
/// `participants`. Records from other groups are skipped, and splits or
/// settlements naming someone outside `participants` simply have no row.
pub fn compute_balances(
    group_id: &GroupId,
    participants: &[Participant],
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Vec<Balance> {
    let mut totals: HashMap<&ParticipantId, Totals> = HashMap::new();

    // Sums saturate at Decimal::MAX rather than overflowing, so the engine
    // stays total even for records stored before amounts were capped
    for expense in expenses.iter().filter(|e| &e.group_id == group_id) {
        let payer = totals.entry(&expense.paid_by).or_default();
        payer.paid = payer.paid.saturating_add(expense.amount);
        for split in &expense.splits {
            let debtor = totals.entry(&split.participant_id).or_default();
            debtor.owed = debtor.owed.saturating_add(split.amount);
        }
    }

    for settlement in settlements.iter().filter(|s| &s.group_id == group_id) {
        let payee = totals.entry(&settlement.to_participant).or_default();
        payee.received = payee.received.saturating_add(settlement.amount);
        let payer = totals.entry(&settlement.from_participant).or_default();
        payer.sent = payer.sent.saturating_add(settlement.amount);
    }

    participants
        .iter()
        .filter(|p| &p.group_id == group_id)
        .map(|participant| {
            let t = totals.get(&participant.id).copied().unwrap_or_default();
            Balance {
                participant_id: participant.id.clone(),
                total_paid: t.paid,
                total_owed: t.owed,
                net_balance: t
                    .paid
                    .saturating_sub(t.owed)
                    .saturating_add(t.received)
                    .saturating_sub(t.sent),
            }
        })
        .collect()
}
