use std::error::Error;
use std::sync::Arc;

use warp::Filter;

use futures::future::FutureExt;
use log::{info, initialize_logger};
use tokio::sync::mpsc;
use zguba::config::get_variable;
use zguba::db::PgDb;
use zguba::environment::Environment;
use zguba::routes;
use zguba::urls::Urls;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let main_port: u16 = get_variable("ZGUBA_PORT")
        .parse()
        .expect("parse ZGUBA_PORT as u16");
    let admin_port: u16 = get_variable("ZGUBA_ADMIN_PORT")
        .parse()
        .expect("parse ZGUBA_ADMIN_PORT as u16");

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port);
    let logger = Arc::new(logger);

    info!(logger, "Creating database pool...");
    let connection_string = get_variable("ZGUBA_DB_CONNECTION_STRING");
    let pool = sqlx::Pool::connect(&connection_string)
        .await
        .expect("create database pool from ZGUBA_DB_CONNECTION_STRING");
    let db = Arc::new(PgDb::new(pool));

    let urls = Arc::new(Urls::new(get_variable("ZGUBA_BASE_URL")));

    let environment = Environment::new(logger.clone(), db, urls);

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            let termination_sender = termination_sender.clone();
            termination_sender.send(()).await.unwrap();
        }
        .boxed()
    });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            let terminate = terminate.clone();

            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();

        let logger2 = logger.clone();

        let root_route = routes::make_root_route(environment.clone());
        let list_route = routes::make_list_route(environment.clone());
        let create_route = routes::make_create_route(environment.clone());
        let categories_route = routes::make_categories_route(environment.clone());
        let retrieve_route = routes::make_retrieve_route(environment.clone());
        let update_route = routes::make_update_route(environment.clone());
        let delete_route = routes::make_delete_route(environment.clone());
        let odata_metadata_route = routes::make_odata_metadata_route(environment.clone());
        let odata_route = routes::make_odata_route(environment.clone());
        let metadata_route = routes::make_metadata_route(environment.clone());
        let dcat_route = routes::make_dcat_route(environment.clone());
        let distribution_route = routes::make_distribution_route(environment.clone());
        let stats_route = routes::make_stats_route(environment.clone());

        // The categories listing must be matched before the single-item
        // routes, and the OData metadata document before the OData listing.
        let routes = root_route
            .or(list_route)
            .or(create_route)
            .or(categories_route)
            .or(retrieve_route)
            .or(update_route)
            .or(delete_route)
            .or(odata_metadata_route)
            .or(odata_route)
            .or(dcat_route)
            .or(distribution_route)
            .or(metadata_route)
            .or(stats_route)
            .recover(move |r| routes::format_rejection(logger2.clone(), r));

        let (_, main_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            });

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let routes = routes::admin::make_healthz_route(environment.clone()).or(
            routes::admin::make_termination_route(environment.clone(), terminate),
        );

        let (_, admin_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async {
                should_terminate.await;
            });

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
