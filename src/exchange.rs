use crate::balance::{round_to_cents, Balance};
use crate::schemas::{Expense, GroupId, ParticipantId, Settlement};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::mem::swap;

/// How many debtors the first-creditor heuristic makes suggestions for.
pub const FIRST_CREDITOR_LIMIT: usize = 3;

#[derive(Clone, Debug)]
struct PersonalBalance {
    id: ParticipantId,
    balance: Decimal,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
struct ParticipantPair {
    first: ParticipantId,
    second: ParticipantId,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Exchange {
    pub payer: ParticipantId,
    pub receiver: ParticipantId,
    pub amount: Decimal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Minimal,
    FirstCreditor,
}

// Drops fractions of a cent, rounding toward zero
fn truncate_to_cents(n: Decimal) -> Decimal {
    n.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Every debtor, up to `limit` of them, pays the first creditor as much as
/// either side allows. Other creditors are never matched. Balances are taken
/// in whole cents, so anyone within a cent of zero is left out.
pub fn first_creditor_exchanges(balances: &[Balance], limit: usize) -> Vec<Exchange> {
    let Some((creditor, credit)) = balances
        .iter()
        .map(|b| (b, truncate_to_cents(b.net_balance)))
        .find(|(_, net)| *net > Decimal::ZERO)
    else {
        return Vec::new();
    };

    balances
        .iter()
        .map(|b| (b, truncate_to_cents(b.net_balance)))
        .filter(|(_, net)| *net < Decimal::ZERO)
        .take(limit)
        .map(|(debtor, debt)| Exchange {
            payer: debtor.participant_id.clone(),
            receiver: creditor.participant_id.clone(),
            amount: debt.abs().min(credit),
        })
        .collect()
}

// The exchanges that will be made if no simplification happens: every split
// is owed straight to whoever paid the expense, net of settlements.
pub fn pairwise_exchanges(
    group_id: &GroupId,
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Vec<Exchange> {
    let mut debts: HashMap<ParticipantPair, Decimal> = HashMap::new();

    for expense in expenses.iter().filter(|e| &e.group_id == group_id) {
        for split in &expense.splits {
            if split.participant_id != expense.paid_by {
                add_debt(&mut debts, &split.participant_id, &expense.paid_by, split.amount);
            }
        }
    }
    for settlement in settlements.iter().filter(|s| &s.group_id == group_id) {
        add_debt(
            &mut debts,
            &settlement.from_participant,
            &settlement.to_participant,
            -settlement.amount,
        );
    }

    let mut exchanges = Vec::new();
    for (pair, balance) in debts {
        let balance = round_to_cents(balance);
        if balance.is_zero() {
            continue;
        }
        let mut payer = pair.first;
        let mut receiver = pair.second;
        // A negative balance means the debt runs the other way
        if balance < Decimal::ZERO {
            swap(&mut payer, &mut receiver);
        }
        exchanges.push(Exchange {
            payer,
            receiver,
            amount: balance.abs(),
        });
    }
    exchanges.sort_by(|a, b| (&a.payer, &a.receiver).cmp(&(&b.payer, &b.receiver)));
    exchanges
}

fn add_debt(
    debts: &mut HashMap<ParticipantPair, Decimal>,
    debtor: &ParticipantId,
    creditor: &ParticipantId,
    amount: Decimal,
) {
    // We use alphabetical order to ensure both directions of a pair end up
    // in the same entry; a positive value means `first` owes `second`
    let (pair, amount) = if debtor <= creditor {
        (
            ParticipantPair {
                first: debtor.clone(),
                second: creditor.clone(),
            },
            amount,
        )
    } else {
        (
            ParticipantPair {
                first: creditor.clone(),
                second: debtor.clone(),
            },
            -amount,
        )
    };
    let debt = debts.entry(pair).or_default();
    *debt = debt.saturating_add(amount);
}

/// Repeatedly matches the largest debtor with the largest creditor. Balances
/// are taken at cent precision; a leftover under one cent is dropped.
pub fn greedy_exchanges(balances: &[Balance]) -> Vec<Exchange> {
    let mut payers = Vec::new();
    let mut receivers = Vec::new();

    for b in balances {
        let balance = round_to_cents(b.net_balance);
        let person = PersonalBalance {
            id: b.participant_id.clone(),
            balance: balance.abs(),
        };
        if balance < Decimal::ZERO {
            payers.push(person);
        } else if balance > Decimal::ZERO {
            receivers.push(person);
        }
    }

    let mut exchanges = Vec::new();
    loop {
        payers.sort_by_key(|p| p.balance);
        receivers.sort_by_key(|r| r.balance);
        let (Some(payer), Some(receiver)) = (payers.last_mut(), receivers.last_mut()) else {
            break;
        };

        let amount = payer.balance.min(receiver.balance);
        exchanges.push(Exchange {
            payer: payer.id.clone(),
            receiver: receiver.id.clone(),
            amount,
        });
        payer.balance -= amount;
        receiver.balance -= amount;

        let payer_done = payer.balance.is_zero();
        let receiver_done = receiver.balance.is_zero();
        if payer_done {
            payers.pop();
        }
        if receiver_done {
            receivers.pop();
        }
    }
    exchanges
}

pub fn minimal_exchanges(
    group_id: &GroupId,
    balances: &[Balance],
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Vec<Exchange> {
    let simplified = greedy_exchanges(balances);
    let naive = pairwise_exchanges(group_id, expenses, settlements);

    // The simplification should never end up more complicated than paying
    // every expense back directly
    if naive.len() < simplified.len() {
        naive
    } else {
        simplified
    }
}
