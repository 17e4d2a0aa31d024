use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{LedgerError, LedgerResult};
use crate::schemas::{GroupId, ParticipantId, Settlement, SettlementId, MAX_AMOUNT};

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SettlementDraft {
    pub from_participant: ParticipantId,
    pub to_participant: ParticipantId,
    pub amount: Decimal,
    #[serde(default)]
    pub note: Option<String>,
}

impl SettlementDraft {
    pub fn into_settlement(
        self,
        id: SettlementId,
        group_id: GroupId,
        settled_at: DateTime<Utc>,
    ) -> LedgerResult<Settlement> {
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
        if self.from_participant == self.to_participant {
            return Err(LedgerError::SelfSettlement);
        }
        let note = self
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(Settlement {
            id,
            group_id,
            from_participant: self.from_participant,
            to_participant: self.to_participant,
            amount: self.amount,
            note,
            settled_at,
        })
    }
}
