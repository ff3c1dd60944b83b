use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;

use swapdesk::auth::AuthMiddleware;
use swapdesk::config::Config;
use swapdesk::idp::{GoogleIdentityProvider, IdpRegistry};
use swapdesk::routes::{self, health};
use swapdesk::sweep;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    let mut registry = IdpRegistry::new();
    registry.register(Arc::new(GoogleIdentityProvider::new(pool.clone())));

    // Time-based sweep moving overdue open proposals to expired
    tokio::spawn(sweep::run(pool.clone(), config.expiry_sweep_interval_secs));

    log::info!("Starting swapdesk server at {}", config.server_url());
    let bind_addr = (config.server_host.clone(), config.server_port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(registry.clone()))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .wrap(AuthMiddleware)
            .service(health::health)
            .configure(routes::config)
    })
    .bind(bind_addr)?
    .run()
    .await
}
