use actix_web::error::InternalError;
use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::LedgerError;
use crate::exchange::{Strategy, FIRST_CREDITOR_LIMIT};
use crate::expense::ExpenseRequest;
use crate::ledger::{GroupLedger, GroupUpdate};
use crate::schemas::{ExpenseId, GroupId, ParticipantId};
use crate::settlement::SettlementDraft;
use crate::store::MongoStore;

type HandlerResult = Result<HttpResponse, LedgerError>;

#[derive(Deserialize)]
struct NewGroup {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct ParticipantJson {
    name: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct ExchangeQuery {
    #[serde(default)]
    strategy: Strategy,
    limit: Option<usize>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(health)
        .service(create_group)
        .service(get_group)
        .service(update_group)
        .service(add_participant)
        .service(edit_participant)
        .service(remove_participant)
        .service(add_expense)
        .service(update_expense)
        .service(delete_expense)
        .service(add_settlement)
        .service(get_balance)
        .service(get_exchanges);
}

/// Malformed bodies get the same `{ "error": ... }` shape as domain errors.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let body = json!({ "error": err.to_string() });
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

#[get("/health")]
async fn health(store: web::Data<MongoStore>) -> HandlerResult {
    store.ping().await?;
    Ok(HttpResponse::Ok().body("ok"))
}

#[put("/groups/{id}")]
async fn create_group(
    store: web::Data<MongoStore>,
    id: web::Path<String>,
    json: web::Json<NewGroup>,
) -> HandlerResult {
    let NewGroup { name, description } = json.into_inner();
    let ledger = GroupLedger::create(GroupId::from(id.into_inner()), &name, description, Utc::now())?;
    store.create_group(ledger.group()).await?;
    info!(group = %ledger.group().id, "group created");
    Ok(HttpResponse::Created().json(ledger.group()))
}

#[get("/groups/{id}")]
async fn get_group(store: web::Data<MongoStore>, id: web::Path<String>) -> HandlerResult {
    let ledger = store.load_ledger(&GroupId::from(id.into_inner())).await?;
    Ok(HttpResponse::Ok().json(ledger))
}

#[patch("/groups/{id}")]
async fn update_group(
    store: web::Data<MongoStore>,
    id: web::Path<String>,
    json: web::Json<GroupUpdate>,
) -> HandlerResult {
    let mut ledger = store.load_ledger(&GroupId::from(id.into_inner())).await?;
    let group = ledger.update_group(&json)?;
    store.replace_group(group).await?;
    info!(group = %group.id, "group updated");
    Ok(HttpResponse::Ok().json(group))
}

#[post("/groups/{id}/participants")]
async fn add_participant(
    store: web::Data<MongoStore>,
    id: web::Path<String>,
    json: web::Json<ParticipantJson>,
) -> HandlerResult {
    let ParticipantJson { name, email } = json.into_inner();
    let mut ledger = store.load_ledger(&GroupId::from(id.into_inner())).await?;
    let participant = ledger.add_participant(&name, email, Utc::now())?;
    store.insert_participant(&participant).await?;
    info!(group = %participant.group_id, participant = %participant.id, "participant added");
    Ok(HttpResponse::Created().json(participant))
}

#[put("/groups/{id}/participants/{participant_id}")]
async fn edit_participant(
    store: web::Data<MongoStore>,
    path: web::Path<(String, String)>,
    json: web::Json<ParticipantJson>,
) -> HandlerResult {
    let (group_id, participant_id) = path.into_inner();
    let ParticipantJson { name, email } = json.into_inner();
    let mut ledger = store.load_ledger(&GroupId::from(group_id)).await?;
    let participant = ledger.edit_participant(&ParticipantId::from(participant_id), &name, email)?;
    store.replace_participant(&participant).await?;
    Ok(HttpResponse::Ok().json(participant))
}

#[delete("/groups/{id}/participants/{participant_id}")]
async fn remove_participant(
    store: web::Data<MongoStore>,
    path: web::Path<(String, String)>,
) -> HandlerResult {
    let (group_id, participant_id) = path.into_inner();
    let mut ledger = store.load_ledger(&GroupId::from(group_id)).await?;
    let participant = ledger.remove_participant(&ParticipantId::from(participant_id))?;
    store.delete_participant(&participant.id).await?;
    info!(group = %participant.group_id, participant = %participant.id, "participant removed");
    Ok(HttpResponse::NoContent().finish())
}

#[post("/groups/{id}/expenses")]
async fn add_expense(
    store: web::Data<MongoStore>,
    id: web::Path<String>,
    json: web::Json<ExpenseRequest>,
) -> HandlerResult {
    let mut ledger = store.load_ledger(&GroupId::from(id.into_inner())).await?;
    let now = Utc::now();
    let expense = ledger.add_expense(json.into_inner().into_draft(now.date_naive()), now)?;
    store.insert_expense(&expense).await?;
    info!(
        group = %expense.group_id,
        expense = %expense.id,
        amount = %expense.amount,
        "expense added"
    );
    Ok(HttpResponse::Created().json(expense))
}

#[put("/groups/{id}/expenses/{expense_id}")]
async fn update_expense(
    store: web::Data<MongoStore>,
    path: web::Path<(String, String)>,
    json: web::Json<ExpenseRequest>,
) -> HandlerResult {
    let (group_id, expense_id) = path.into_inner();
    let mut ledger = store.load_ledger(&GroupId::from(group_id)).await?;
    let draft = json.into_inner().into_draft(Utc::now().date_naive());
    let expense = ledger.update_expense(&ExpenseId::from(expense_id), draft)?;
    store.replace_expense(&expense).await?;
    info!(group = %expense.group_id, expense = %expense.id, "expense updated");
    Ok(HttpResponse::Ok().json(expense))
}

#[delete("/groups/{id}/expenses/{expense_id}")]
async fn delete_expense(
    store: web::Data<MongoStore>,
    path: web::Path<(String, String)>,
) -> HandlerResult {
    let (group_id, expense_id) = path.into_inner();
    let mut ledger = store.load_ledger(&GroupId::from(group_id)).await?;
    let expense = ledger.remove_expense(&ExpenseId::from(expense_id))?;
    store.delete_expense(&expense.id).await?;
    info!(group = %expense.group_id, expense = %expense.id, "expense deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[post("/groups/{id}/settlements")]
async fn add_settlement(
    store: web::Data<MongoStore>,
    id: web::Path<String>,
    json: web::Json<SettlementDraft>,
) -> HandlerResult {
    let mut ledger = store.load_ledger(&GroupId::from(id.into_inner())).await?;
    let settlement = ledger.record_settlement(json.into_inner(), Utc::now())?;
    store.insert_settlement(&settlement).await?;
    info!(
        group = %settlement.group_id,
        from = %settlement.from_participant,
        to = %settlement.to_participant,
        amount = %settlement.amount,
        "settlement recorded"
    );
    Ok(HttpResponse::Created().json(settlement))
}

#[get("/groups/{id}/balance")]
async fn get_balance(store: web::Data<MongoStore>, id: web::Path<String>) -> HandlerResult {
    let ledger = store.load_ledger(&GroupId::from(id.into_inner())).await?;
    Ok(HttpResponse::Ok().json(ledger.balance_sheet()))
}

#[get("/groups/{id}/exchanges")]
async fn get_exchanges(
    store: web::Data<MongoStore>,
    id: web::Path<String>,
    query: web::Query<ExchangeQuery>,
) -> HandlerResult {
    let ledger = store.load_ledger(&GroupId::from(id.into_inner())).await?;
    let limit = query.limit.unwrap_or(FIRST_CREDITOR_LIMIT);
    Ok(HttpResponse::Ok().json(ledger.suggest(query.strategy, limit)))
}
