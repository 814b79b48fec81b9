use astra::{Body, Response, ResponseBuilder};
use maud::{html, Markup, DOCTYPE};

use crate::config::TRACKED_LOCALITIES;
use crate::db::cycles::IngestRun;
use crate::errors::{ResultResp, ServerError};

/// Operator status page: scheduler state, tracked localities and the most
/// recent ingestion cycles.
pub fn status_page(
    scheduler_running: bool,
    store_count: i64,
    available_deals: i64,
    stream_clients: usize,
    runs: &[IngestRun],
) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Dealwatch" }
                style { "body { font-family: sans-serif; max-width: 56rem; margin: 2rem auto; } table { border-collapse: collapse; width: 100%; } td, th { border: 1px solid #ddd; padding: 6px 10px; text-align: left; }" }
            }
            body {
                h1 { "Dealwatch" }

                p {
                    "Scheduler: "
                    @if scheduler_running { strong { "running" } } @else { strong { "stopped" } }
                    " · " (store_count) " stores · "
                    (available_deals) " deals available · "
                    (stream_clients) " live clients"
                }

                h2 { "Tracked localities" }
                ul {
                    @for locality in TRACKED_LOCALITIES {
                        li { (locality.name) " (" (locality.key) ")" }
                    }
                }

                h2 { "Recent cycles" }
                @if runs.is_empty() {
                    p { "No cycles recorded yet." }
                } @else {
                    table {
                        tr {
                            th { "Started" }
                            th { "Finished" }
                            th { "Stores" }
                            th { "New" }
                            th { "Changed" }
                            th { "Notified" }
                            th { "OK" }
                        }
                        @for run in runs {
                            tr {
                                td { (run.started_at.format("%Y-%m-%d %H:%M:%S")) }
                                td {
                                    @if let Some(finished) = run.finished_at {
                                        (finished.format("%H:%M:%S"))
                                    } @else { "-" }
                                }
                                td { (run.stores_seen.unwrap_or(0)) }
                                td { (run.new_deals.unwrap_or(0)) }
                                td { (run.changed_deals.unwrap_or(0)) }
                                td { (run.notified.unwrap_or(0)) }
                                td {
                                    @if run.success { "yes" }
                                    @else { (run.error_message.as_deref().unwrap_or("no")) }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn html_response(markup: Markup) -> ResultResp {
    ResponseBuilder::new()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(Body::from(markup.into_string()))
        .map_err(|_| ServerError::InternalError)
}

pub fn json_response(body: String) -> ResultResp {
    ResponseBuilder::new()
        .status(200)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .map_err(|_| ServerError::InternalError)
}

pub fn text_response(body: &str) -> ResultResp {
    ResponseBuilder::new()
        .status(200)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Body::from(body.to_string()))
        .map_err(|_| ServerError::InternalError)
}

/// Convert a ServerError into a proper HTML response
pub fn error_response(err: ServerError) -> Response {
    let status = match &err {
        ServerError::NotFound => 404,
        ServerError::BadRequest(_) => 400,
        _ => 500,
    };

    let body = format!("<h1>Error {status}</h1><p>{err}</p>");

    ResponseBuilder::new()
        .status(status)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::from("Internal Server Error")))
}
