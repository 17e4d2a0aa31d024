//! One group's expenses, participants and settlements, owned together.
//!
//! A `GroupLedger` is loaded per request from the store, checked and mutated
//! here, and the changed entity is handed back so the caller can persist it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::balance::{compute_balances, Balance, BalanceStatus};
use crate::error::{LedgerError, LedgerResult};
use crate::exchange::{first_creditor_exchanges, minimal_exchanges, Exchange, Strategy};
use crate::expense::ExpenseDraft;
use crate::schemas::{
    Expense, ExpenseId, Group, GroupId, Participant, ParticipantId, Settlement, SettlementId,
};
use crate::settlement::SettlementDraft;

const UNKNOWN_NAME: &str = "Unknown";

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GroupUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BalanceRow {
    #[serde(flatten)]
    pub balance: Balance,
    pub participant_name: String,
    pub status: BalanceStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SuggestedExchange {
    #[serde(flatten)]
    pub exchange: Exchange,
    pub payer_name: String,
    pub receiver_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupLedger {
    group: Group,
    participants: Vec<Participant>,
    expenses: Vec<Expense>,
    settlements: Vec<Settlement>,
}

impl GroupLedger {
    pub fn create(
        id: GroupId,
        name: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        let group = Group {
            id,
            name: required(name, "name")?,
            description: optional(description),
            created_at: now,
        };
        Ok(Self::from_parts(group, Vec::new(), Vec::new(), Vec::new()))
    }

    pub fn from_parts(
        group: Group,
        participants: Vec<Participant>,
        expenses: Vec<Expense>,
        settlements: Vec<Settlement>,
    ) -> Self {
        let mut ledger = Self {
            group,
            participants,
            expenses,
            settlements,
        };
        ledger.participants.sort_by_key(|p| p.created_at);
        ledger.sort_expenses();
        ledger.sort_settlements();
        ledger
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn settlements(&self) -> &[Settlement] {
        &self.settlements
    }

    pub fn update_group(&mut self, update: &GroupUpdate) -> LedgerResult<&Group> {
        if let Some(name) = &update.name {
            self.group.name = required(name, "name")?;
        }
        if let Some(description) = &update.description {
            self.group.description = optional(Some(description.clone()));
        }
        Ok(&self.group)
    }

    pub fn add_participant(
        &mut self,
        name: &str,
        email: Option<String>,
        now: DateTime<Utc>,
    ) -> LedgerResult<Participant> {
        let participant = Participant {
            id: ParticipantId::generate(),
            group_id: self.group.id.clone(),
            name: required(name, "name")?,
            email: optional(email),
            created_at: now,
        };
        self.participants.push(participant.clone());
        Ok(participant)
    }

    pub fn edit_participant(
        &mut self,
        id: &ParticipantId,
        name: &str,
        email: Option<String>,
    ) -> LedgerResult<Participant> {
        let name = required(name, "name")?;
        let participant = self
            .participants
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| LedgerError::not_found("participant", id))?;
        participant.name = name;
        participant.email = optional(email);
        Ok(participant.clone())
    }

    /// Fails with `ParticipantInUse` while any expense or settlement still
    /// names the participant.
    pub fn remove_participant(&mut self, id: &ParticipantId) -> LedgerResult<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| LedgerError::not_found("participant", id))?;

        let in_expenses = self.expenses.iter().any(|e| {
            &e.paid_by == id || e.splits.iter().any(|s| &s.participant_id == id)
        });
        let in_settlements = self
            .settlements
            .iter()
            .any(|s| &s.from_participant == id || &s.to_participant == id);
        if in_expenses || in_settlements {
            return Err(LedgerError::ParticipantInUse(id.clone()));
        }

        Ok(self.participants.remove(index))
    }

    pub fn add_expense(
        &mut self,
        draft: ExpenseDraft,
        now: DateTime<Utc>,
    ) -> LedgerResult<Expense> {
        self.check_expense_members(&draft)?;
        let expense = draft.into_expense(ExpenseId::generate(), self.group.id.clone(), now)?;
        self.expenses.push(expense.clone());
        self.sort_expenses();
        Ok(expense)
    }

    /// Replaces everything but the id and creation time of an expense.
    pub fn update_expense(&mut self, id: &ExpenseId, draft: ExpenseDraft) -> LedgerResult<Expense> {
        let index = self
            .expenses
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| LedgerError::not_found("expense", id))?;
        self.check_expense_members(&draft)?;

        let created_at = self.expenses[index].created_at;
        let updated = draft.into_expense(id.clone(), self.group.id.clone(), created_at)?;
        self.expenses[index] = updated.clone();
        self.sort_expenses();
        Ok(updated)
    }

    pub fn remove_expense(&mut self, id: &ExpenseId) -> LedgerResult<Expense> {
        let index = self
            .expenses
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| LedgerError::not_found("expense", id))?;
        Ok(self.expenses.remove(index))
    }

    pub fn record_settlement(
        &mut self,
        draft: SettlementDraft,
        now: DateTime<Utc>,
    ) -> LedgerResult<Settlement> {
        self.check_member(&draft.from_participant)?;
        self.check_member(&draft.to_participant)?;
        let settlement =
            draft.into_settlement(SettlementId::generate(), self.group.id.clone(), now)?;
        self.settlements.push(settlement.clone());
        self.sort_settlements();
        Ok(settlement)
    }

    pub fn balances(&self) -> Vec<Balance> {
        compute_balances(
            &self.group.id,
            &self.participants,
            &self.expenses,
            &self.settlements,
        )
    }

    /// Balances rounded to cents, with names attached for display.
    pub fn balance_sheet(&self) -> Vec<BalanceRow> {
        self.balances()
            .iter()
            .map(|balance| {
                let balance = balance.rounded();
                BalanceRow {
                    participant_name: self.display_name(&balance.participant_id).to_string(),
                    status: balance.status(),
                    balance,
                }
            })
            .collect()
    }

    pub fn suggest(&self, strategy: Strategy, limit: usize) -> Vec<SuggestedExchange> {
        let balances = self.balances();
        let exchanges = match strategy {
            Strategy::FirstCreditor => first_creditor_exchanges(&balances, limit),
            Strategy::Minimal => minimal_exchanges(
                &self.group.id,
                &balances,
                &self.expenses,
                &self.settlements,
            ),
        };
        exchanges
            .into_iter()
            .map(|exchange| SuggestedExchange {
                payer_name: self.display_name(&exchange.payer).to_string(),
                receiver_name: self.display_name(&exchange.receiver).to_string(),
                exchange,
            })
            .collect()
    }

    pub fn display_name(&self, id: &ParticipantId) -> &str {
        self.participants
            .iter()
            .find(|p| &p.id == id)
            .map(|p| p.name.as_str())
            .unwrap_or(UNKNOWN_NAME)
    }

    fn check_member(&self, id: &ParticipantId) -> LedgerResult<()> {
        if self.participants.iter().any(|p| &p.id == id) {
            Ok(())
        } else {
            Err(LedgerError::UnknownParticipant(id.clone()))
        }
    }

    fn check_expense_members(&self, draft: &ExpenseDraft) -> LedgerResult<()> {
        self.check_member(&draft.paid_by)?;
        draft
            .splits
            .iter()
            .try_for_each(|split| self.check_member(&split.participant_id))
    }

    fn sort_expenses(&mut self) {
        self.expenses
            .sort_by(|a, b| (b.date, b.created_at).cmp(&(a.date, a.created_at)));
    }

    fn sort_settlements(&mut self) {
        self.settlements
            .sort_by(|a, b| b.settled_at.cmp(&a.settled_at));
    }
}

fn required(value: &str, field: &'static str) -> LedgerResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(LedgerError::EmptyField(field))
    } else {
        Ok(value.to_string())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
