use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use serde::de::DeserializeOwned;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::GroupLedger;
use crate::schemas::{Expense, ExpenseId, Group, GroupId, Participant, ParticipantId, Settlement};

const GROUPS: &str = "Groups";
const PARTICIPANTS: &str = "Participants";
const EXPENSES: &str = "Expenses";
const SETTLEMENTS: &str = "Settlements";

/// MongoDB access for groups and everything that hangs off them. Splits are
/// embedded in their expense document.
#[derive(Clone, Debug)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> LedgerResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self::new(&client, database))
    }

    pub fn new(client: &Client, database: &str) -> Self {
        Self {
            database: client.database(database),
        }
    }

    fn groups(&self) -> Collection<Group> {
        self.database.collection(GROUPS)
    }

    fn participants(&self) -> Collection<Participant> {
        self.database.collection(PARTICIPANTS)
    }

    fn expenses(&self) -> Collection<Expense> {
        self.database.collection(EXPENSES)
    }

    fn settlements(&self) -> Collection<Settlement> {
        self.database.collection(SETTLEMENTS)
    }

    pub async fn ping(&self) -> LedgerResult<()> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    pub async fn ensure_indexes(&self) -> LedgerResult<()> {
        let unique_id = || {
            IndexModel::builder()
                .keys(doc! { "id": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };
        let by_group = || IndexModel::builder().keys(doc! { "group_id": 1 }).build();

        self.groups().create_index(unique_id(), None).await?;
        self.participants().create_index(unique_id(), None).await?;
        self.participants().create_index(by_group(), None).await?;
        self.expenses().create_index(unique_id(), None).await?;
        self.expenses().create_index(by_group(), None).await?;
        self.settlements().create_index(unique_id(), None).await?;
        self.settlements().create_index(by_group(), None).await?;
        tracing::debug!("indexes in place");
        Ok(())
    }

    pub async fn create_group(&self, group: &Group) -> LedgerResult<()> {
        let groups = self.groups();
        if groups.find_one(by_id(group.id.as_str()), None).await?.is_some() {
            return Err(LedgerError::Conflict(format!(
                "group {} already exists",
                group.id
            )));
        }
        groups.insert_one(group, None).await?;
        Ok(())
    }

    pub async fn replace_group(&self, group: &Group) -> LedgerResult<()> {
        let result = self
            .groups()
            .replace_one(by_id(group.id.as_str()), group, None)
            .await?;
        if result.matched_count == 0 {
            return Err(LedgerError::not_found("group", &group.id));
        }
        Ok(())
    }

    /// Loads the group with all of its participants, expenses and settlements.
    pub async fn load_ledger(&self, id: &GroupId) -> LedgerResult<GroupLedger> {
        let group = self
            .groups()
            .find_one(by_id(id.as_str()), None)
            .await?
            .ok_or_else(|| LedgerError::not_found("group", id))?;

        let participants = collect(&self.participants(), id).await?;
        let expenses = collect(&self.expenses(), id).await?;
        let settlements = collect(&self.settlements(), id).await?;
        tracing::debug!(
            group = %id,
            participants = participants.len(),
            expenses = expenses.len(),
            settlements = settlements.len(),
            "ledger loaded"
        );

        Ok(GroupLedger::from_parts(
            group,
            participants,
            expenses,
            settlements,
        ))
    }

    pub async fn insert_participant(&self, participant: &Participant) -> LedgerResult<()> {
        self.participants().insert_one(participant, None).await?;
        Ok(())
    }

    pub async fn replace_participant(&self, participant: &Participant) -> LedgerResult<()> {
        let result = self
            .participants()
            .replace_one(by_id(participant.id.as_str()), participant, None)
            .await?;
        if result.matched_count == 0 {
            return Err(LedgerError::not_found("participant", &participant.id));
        }
        Ok(())
    }

    pub async fn delete_participant(&self, id: &ParticipantId) -> LedgerResult<()> {
        let result = self.participants().delete_one(by_id(id.as_str()), None).await?;
        if result.deleted_count == 0 {
            return Err(LedgerError::not_found("participant", id));
        }
        Ok(())
    }

    pub async fn insert_expense(&self, expense: &Expense) -> LedgerResult<()> {
        self.expenses().insert_one(expense, None).await?;
        Ok(())
    }

    pub async fn replace_expense(&self, expense: &Expense) -> LedgerResult<()> {
        let result = self
            .expenses()
            .replace_one(by_id(expense.id.as_str()), expense, None)
            .await?;
        if result.matched_count == 0 {
            return Err(LedgerError::not_found("expense", &expense.id));
        }
        Ok(())
    }

    pub async fn delete_expense(&self, id: &ExpenseId) -> LedgerResult<()> {
        let result = self.expenses().delete_one(by_id(id.as_str()), None).await?;
        if result.deleted_count == 0 {
            return Err(LedgerError::not_found("expense", id));
        }
        Ok(())
    }

    pub async fn insert_settlement(&self, settlement: &Settlement) -> LedgerResult<()> {
        self.settlements().insert_one(settlement, None).await?;
        Ok(())
    }
}

fn by_id(id: &str) -> Document {
    doc! { "id": id }
}

async fn collect<T>(collection: &Collection<T>, group_id: &GroupId) -> LedgerResult<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let cursor = collection
        .find(doc! { "group_id": group_id.as_str() }, None)
        .await?;
    Ok(cursor.try_collect().await?)
}
