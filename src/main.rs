mod options;

use crate::options::{RelayCommands, RelayOptions};
use actix_web::Scope;
use actix_web::{web, App, HttpServer};
use gasless_relay_lib::config::Config;
use gasless_relay_lib::db::create_sqlite_connection;
use gasless_relay_lib::db::ops::get_order;
use gasless_relay_lib::relay::{recover_orders, RelayService};
use gasless_relay_lib::runtime::start_relay_engine;
use gasless_relay_lib::server::*;
use gasless_relay_lib::setup::ChainRegistry;
use gasless_relay_lib::signer::{load_private_key, PrivateKeySigner, Signer};
use gasless_relay_lib::{err_custom_create, err_from, error::RelayError};
use std::env;
use std::sync::Arc;
use structopt::StructOpt;
use tokio_util::sync::CancellationToken;
use web3::types::U256;

async fn main_internal() -> Result<(), RelayError> {
    dotenv::dotenv().ok();
    env::set_var(
        "RUST_LOG",
        env::var("RUST_LOG").unwrap_or("info,sqlx::query=warn,web3=warn".to_string()),
    );

    env_logger::init();
    let cli: RelayOptions = RelayOptions::from_args();

    let config = Config::load(cli.config.display().to_string()).await?;
    let db_filename = env::var("DB_SQLITE_FILENAME")
        .map_err(|_| err_custom_create!("Specify DB_SQLITE_FILENAME env variable"))?;

    let private_key = env::var("RELAYER_PRIVATE_KEY")
        .map_err(|_| err_custom_create!("Specify RELAYER_PRIVATE_KEY env variable"))?;
    let signer = Arc::new(PrivateKeySigner::new(load_private_key(&private_key)?));
    log::info!("Relayer account: {:#x}", signer.address());

    match cli.commands {
        RelayCommands::Run { run_options } => {
            log::info!("connecting to sqlite file db: {}", db_filename);
            let conn = create_sqlite_connection(Some(&db_filename), None, false, true).await?;

            let sp = start_relay_engine(signer, &db_filename, config, Some(conn.clone()), None)
                .await?;

            let server_data = web::Data::new(Box::new(ServerData {
                db_connection: conn,
                producer: sp.producer.clone(),
            }));

            let server = HttpServer::new(move || {
                let cors = actix_cors::Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600);

                let scope = runtime_web_scope(Scope::new(""), server_data.clone());

                App::new().wrap(cors).service(scope)
            })
            .workers(run_options.http_threads as usize)
            .bind((run_options.http_addr.as_str(), run_options.http_port))
            .map_err(err_from!())?
            .run();

            log::info!(
                "http server starting on {}:{}",
                run_options.http_addr,
                run_options.http_port
            );

            server.await.map_err(err_from!())?;
            log::info!("http server stopped, shutting down relay engine");
            sp.shutdown().await;
        }
        RelayCommands::Recover => {
            let conn = create_sqlite_connection(Some(&db_filename), None, false, true).await?;
            let service = RelayService::new(
                conn,
                Arc::new(ChainRegistry::connect(&config)?),
                signer,
                CancellationToken::new(),
            );
            let count = recover_orders(&service).await?;
            log::info!("Recovered {} orders", count);
        }
        RelayCommands::Status { order_id } => {
            let conn = create_sqlite_connection(Some(&db_filename), None, true, false).await?;
            let order = get_order(&conn, &order_id)
                .await
                .map_err(err_from!())?
                .ok_or_else(|| err_custom_create!("Order {} not found", order_id))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&order).map_err(|err| err_custom_create!(
                    "Something went wrong when serializing to json {err}"
                ))?
            );
        }
        RelayCommands::SendNative {
            send_native_options,
        } => {
            let amount = U256::from_dec_str(&send_native_options.amount).map_err(|err| {
                err_custom_create!("Invalid amount {}: {:?}", send_native_options.amount, err)
            })?;
            let conn = create_sqlite_connection(Some(&db_filename), None, false, true).await?;
            let service = RelayService::new(
                conn,
                Arc::new(ChainRegistry::connect(&config)?),
                signer,
                CancellationToken::new(),
            );
            let receipt = service
                .send_native(
                    &send_native_options.chain_name,
                    send_native_options.recipient,
                    amount,
                )
                .await?;
            log::info!(
                "Native transfer {:#x} mined in block {:?}",
                receipt.tx_hash,
                receipt.block_number
            );
        }
    }

    Ok(())
}

#[actix_web::main]
async fn main() -> Result<(), RelayError> {
    match main_internal().await {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("Error: {e}");
            Err(e)
        }
    }
}
