use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;

use splitledger::config::Config;
use splitledger::store::MongoStore;
use splitledger::{routes, telemetry};

fn cors(allowed_origin: Option<&str>) -> Cors {
    match allowed_origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allow_any_method()
            .allow_any_header()
            .max_age(3600),
        None => Cors::permissive(),
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = Config::from_env().map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    if let Err(err) = telemetry::init(config.log_format) {
        eprintln!("logging was not initialized: {err}");
    }

    tracing::info!(database = %config.database_name, "connecting to MongoDB");
    let store = MongoStore::connect(&config.mongodb_uri, &config.database_name)
        .await
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    if let Err(err) = store.ensure_indexes().await {
        tracing::warn!(error = %err, "could not create indexes");
    }
    tracing::info!("connected");

    let allowed_origin = config.cors_allowed_origin.clone();
    tracing::info!(address = %config.bind_address, port = config.port, "listening");
    HttpServer::new(move || {
        App::new()
            .wrap(cors(allowed_origin.as_deref()))
            .wrap(Logger::default())
            .app_data(web::Data::new(store.clone()))
            .configure(routes::configure)
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await
}
