use std::net::IpAddr;

use anyhow::Result;
use chrono::NaiveDate;
use rocket::{
    http::Status, options, post, response::content::RawJson, routes, Build, Config, Rocket, State,
};
use serde::Deserialize;

use crate::classifier::{GeminiRelay, RelayError, UpstreamResponse};
use crate::config::Clock;

mod cors;

pub use cors::Cors;

pub struct RelayState {
    relay: GeminiRelay,
    clock: Clock,
}

impl RelayState {
    pub fn new(relay: GeminiRelay, clock: Clock) -> Self {
        Self { relay, clock }
    }
}

#[derive(Deserialize, Debug)]
struct RelayRequest {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    today: Option<NaiveDate>,
}

pub fn build(state: RelayState, address: IpAddr, port: u16) -> Rocket<Build> {
    rocket::custom(Config {
        log_level: rocket::config::LogLevel::Critical,
        address,
        port,
        ..Default::default()
    })
    .manage(state)
    .attach(Cors)
    .mount("/", routes![relay_text, preflight])
}

/// Serves the relay until the process is stopped.
pub async fn serve(state: RelayState, address: IpAddr, port: u16) -> Result<()> {
    let server = build(state, address, port).ignite().await?;
    log::info!("Relay listening on http://{address}:{port}/api/gemini");
    server.launch().await?;
    Ok(())
}

#[post("/api/gemini", data = "<body>")]
async fn relay_text(body: String, state: &State<RelayState>) -> (Status, RawJson<String>) {
    match forward(state, &body).await {
        Ok(response) => (Status::new(response.status), RawJson(response.body)),
        Err(err) => {
            log::warn!("Relay request failed: {err}");
            let body = serde_json::json!({ "error": err.message() }).to_string();
            (Status::new(err.status()), RawJson(body))
        }
    }
}

#[options("/api/gemini")]
fn preflight() -> Status {
    Status::NoContent
}

async fn forward(state: &RelayState, body: &str) -> Result<UpstreamResponse, RelayError> {
    // Credential first, so a misconfigured relay fails the same way for every request
    state.relay.api_key()?;
    let request: RelayRequest = serde_json::from_str(body).map_err(|err| {
        RelayError::Validation(format!("Could not parse request body: {err}"))
    })?;
    let text = request.text.unwrap_or_default();
    let today = request.today.unwrap_or_else(|| state.clock.today());
    state.relay.forward(&text, today).await
}
