//! Fixtures shared by the unit tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::schemas::{
    Expense, ExpenseId, Group, GroupId, Participant, ParticipantId, Settlement, SettlementId, Split,
};

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn group_id() -> GroupId {
    GroupId::from("trip")
}

pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()
}

pub fn day(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

pub fn group() -> Group {
    Group {
        id: group_id(),
        name: "Trip".to_string(),
        description: None,
        created_at: at(1),
    }
}

pub fn participant(id: &str, name: &str) -> Participant {
    Participant {
        id: ParticipantId::from(id),
        group_id: group_id(),
        name: name.to_string(),
        email: None,
        created_at: at(1),
    }
}

pub fn trio() -> Vec<Participant> {
    vec![
        participant("alice", "Alice"),
        participant("bob", "Bob"),
        participant("carol", "Carol"),
    ]
}

pub fn expense(id: &str, payer: &str, amount: &str, splits: &[(&str, &str)]) -> Expense {
    Expense {
        id: ExpenseId::from(id),
        group_id: group_id(),
        title: id.to_string(),
        amount: dec(amount),
        paid_by: ParticipantId::from(payer),
        date: day(2),
        created_at: at(2),
        splits: splits
            .iter()
            .map(|(who, share)| Split {
                participant_id: ParticipantId::from(*who),
                amount: dec(share),
            })
            .collect(),
    }
}

pub fn dinner() -> Expense {
    expense(
        "dinner",
        "alice",
        "300",
        &[("alice", "100"), ("bob", "100"), ("carol", "100")],
    )
}

pub fn settlement(id: &str, from: &str, to: &str, amount: &str) -> Settlement {
    Settlement {
        id: SettlementId::from(id),
        group_id: group_id(),
        from_participant: ParticipantId::from(from),
        to_participant: ParticipantId::from(to),
        amount: dec(amount),
        note: None,
        settled_at: at(3),
    }
}
