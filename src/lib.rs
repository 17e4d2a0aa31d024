pub mod balance;
pub mod config;
pub mod error;
pub mod exchange;
pub mod expense;
pub mod ledger;
pub mod routes;
pub mod schemas;
pub mod settlement;
pub mod store;
pub mod telemetry;
#[cfg(test)]
mod testing;
