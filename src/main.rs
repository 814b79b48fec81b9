use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use astra::Server;
use tracing_subscriber::{fmt, EnvFilter};

use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::db::connection::{init_db, Database};
use crate::notify::{DealMailer, MockMailer, NotificationDispatcher, ResendMailer};
use crate::router::{handle, AppContext};
use crate::scheduler::Scheduler;
use crate::source::FlashfoodClient;

mod broadcast;
mod config;
mod db;
mod domain;
mod errors;
mod notify;
mod reconcile;
mod router;
mod scheduler;
mod source;
mod templates;

#[cfg(test)]
mod tests;

fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    // 1️⃣ Load and validate configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Configuration invalid: {e}");
            std::process::exit(1);
        }
    };

    // 2️⃣ Initialize database from schema.sql
    let db = Database::new(config.database_path.clone());
    if let Err(e) = init_db(&db, "sql/schema.sql") {
        eprintln!("❌ Database initialization failed: {e}");
        std::process::exit(1);
    }

    // 3️⃣ Build the pipeline components
    let client = match FlashfoodClient::new(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Source client initialization failed: {e}");
            std::process::exit(1);
        }
    };

    let mailer: Box<dyn DealMailer> = match &config.resend_api_key {
        Some(key) => Box::new(ResendMailer::new(
            key.clone(),
            config.email_from.clone(),
            config.email_sender_name.clone(),
        )),
        None => Box::new(MockMailer),
    };
    let dispatcher = NotificationDispatcher::new(mailer, config.max_deals_per_email);

    let broadcaster = Arc::new(Broadcaster::new());

    let scheduler = Scheduler::new(
        db.clone(),
        client,
        dispatcher,
        broadcaster.clone(),
        Duration::from_secs(config.poll_interval_secs),
    );
    scheduler.start();

    // 4️⃣ Start the server
    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("❌ Invalid bind address {:?}: {e}", config.bind_addr);
            std::process::exit(1);
        }
    };
    println!("Starting server at http://{addr}");

    let server = Server::bind(&addr).max_workers(8);

    let ctx = AppContext {
        db,
        scheduler: scheduler.clone(),
        broadcaster,
    };

    let result = server.serve(move |req, _info| match handle(req, &ctx) {
        Ok(resp) => resp,
        Err(err) => templates::error_response(err),
    });

    if let Err(e) = result {
        eprintln!("Server ended with error: {e}");
    }

    scheduler.stop();
    println!("Server shut down cleanly.");
}
