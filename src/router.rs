use std::sync::Arc;

use astra::Request;
use tracing::info;

use crate::broadcast::Broadcaster;
use crate::db::connection::Database;
use crate::db::{cycles, products, stores};
use crate::errors::{ResultResp, ServerError};
use crate::scheduler::Scheduler;
use crate::templates;

/// Everything the operational surface needs, built once in `main` and
/// shared across astra's worker threads.
pub struct AppContext {
    pub db: Database,
    pub scheduler: Scheduler,
    pub broadcaster: Arc<Broadcaster>,
}

pub fn handle(req: Request, ctx: &AppContext) -> ResultResp {
    let method = req.method().as_str();
    let path = req.uri().path();

    match (method, path) {
        ("GET", "/") => {
            let (store_count, available_deals, runs) = ctx.db.with_conn(|conn| {
                Ok((
                    stores::count_stores(conn)?,
                    products::count_available(conn)?,
                    cycles::recent_runs(conn, 20)?,
                ))
            })?;

            templates::html_response(templates::status_page(
                ctx.scheduler.is_running(),
                store_count,
                available_deals,
                ctx.broadcaster.connected(),
                &runs,
            ))
        }

        // Manual trigger: run one ingestion cycle now. Partial failures
        // show up as reduced counts, not as an error.
        ("POST", "/refresh") => {
            info!("manual refresh triggered");
            let summary = ctx.scheduler.run_once();

            let mut body =
                serde_json::to_value(&summary).map_err(|_| ServerError::InternalError)?;
            body["success"] = serde_json::Value::Bool(true);

            templates::json_response(body.to_string())
        }

        ("GET", "/health") => templates::text_response("ok"),

        _ => Err(ServerError::NotFound),
    }
}
