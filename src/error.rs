use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

use crate::schemas::{ParticipantId, MAX_AMOUNT};

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{field} must be positive, got {amount}")]
    NonPositiveAmount { field: &'static str, amount: Decimal },

    #[error("{field} {amount} exceeds the maximum of {max}", max = MAX_AMOUNT)]
    AmountTooLarge { field: &'static str, amount: Decimal },

    #[error("amounts are too large to add up")]
    AmountOverflow,

    #[error("split for participant {0} is negative")]
    NegativeSplit(ParticipantId),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("an expense needs at least one split")]
    NoSplits,

    #[error("participant {0} appears more than once in the splits")]
    DuplicateSplit(ParticipantId),

    #[error("splits add up to {actual} but the expense amount is {expected}")]
    SplitMismatch { expected: Decimal, actual: Decimal },

    #[error("a participant cannot settle with themselves")]
    SelfSettlement,

    #[error("participant {0} does not belong to this group")]
    UnknownParticipant(ParticipantId),

    #[error("participant {0} is still referenced by expenses or settlements")]
    ParticipantInUse(ParticipantId),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(#[from] mongodb::error::Error),
}

impl LedgerError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl ResponseError for LedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::Conflict(_) | LedgerError::ParticipantInUse(_) => StatusCode::CONFLICT,
            LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(status).json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_unprocessable_entity() {
        let err = LedgerError::SplitMismatch {
            expected: Decimal::from(300),
            actual: Decimal::from(200),
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.to_string(),
            "splits add up to 200 but the expense amount is 300"
        );
        assert_eq!(
            LedgerError::SelfSettlement.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn oversized_amounts_map_to_unprocessable_entity() {
        let err = LedgerError::AmountTooLarge {
            field: "amount",
            amount: Decimal::MAX,
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().ends_with("exceeds the maximum of 1000000000000000"));
        assert_eq!(
            LedgerError::AmountOverflow.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn lookup_errors_map_to_their_statuses() {
        assert_eq!(
            LedgerError::not_found("group", "trip").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LedgerError::ParticipantInUse(ParticipantId::from("bob")).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            LedgerError::Conflict("group trip already exists".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn error_body_carries_message() {
        let response = LedgerError::not_found("expense", "dinner").error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
