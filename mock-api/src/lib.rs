//! An in-memory stand-in for the laboratory REST backend.
//!
//! It serves the same paths below `/ws/rest/v1` as the real server, keeps
//! everything in a [`store::MockStore`], and records what clients send so
//! tests can check the wire format.

pub mod routes;
pub mod store;
pub mod telemetry;
pub mod time;

use actix_cors::Cors;
use actix_web::dev::{Server, Service};
use actix_web::http::header::{ACCEPT, CACHE_CONTROL, HeaderName, PRAGMA};
use actix_web::{App, HttpServer, web};
use anyhow::Context;
use std::net::TcpListener;

use crate::store::{MockStore, RecordedRequest};

/// Prefix stripped from recorded paths, so they compare equal to cache keys.
const RECORDED_PREFIX: &str = "/ws/rest/v1/";

/// Build the server, but not await it.
///
/// Returns the port that the server has bound to by modifying the config.
pub fn build(
    config: &mut Config,
    store: web::Data<MockStore>,
) -> std::io::Result<Server> {
    let allowed_origins = config.allowed_origins.clone();

    // OS assigns the port if binding to 0
    let listener = TcpListener::bind(format!("{}:{}", config.ip, config.port))?;
    config.port = listener.local_addr()?.port();
    tracing::info!(ip = %config.ip, port = config.port, "mock API listening");

    let server = HttpServer::new(move || {
        let cors = if allowed_origins.iter().any(|origin| origin == "*") {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .supports_credentials()
        } else {
            allowed_origins.iter().fold(
                Cors::default()
                    .allow_any_method()
                    .allow_any_header()
                    .supports_credentials(),
                |cors, origin| cors.allowed_origin(origin),
            )
        };

        let recorder = store.clone();
        App::new()
            .wrap(cors)
            .wrap_fn(move |req, srv| {
                let header = |name: HeaderName| {
                    req.headers()
                        .get(name)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_string)
                };
                recorder.record_request(RecordedRequest {
                    method: req.method().to_string(),
                    path: req
                        .path()
                        .strip_prefix(RECORDED_PREFIX)
                        .unwrap_or(req.path())
                        .to_string(),
                    query: req.query_string().to_string(),
                    cache_control: header(CACHE_CONTROL),
                    pragma: header(PRAGMA),
                    accept: header(ACCEPT),
                });
                srv.call(req)
            })
            .service(routes::api_services())
            .app_data(store.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}

pub struct Config {
    /// set to "0.0.0.0" for public access, "127.0.0.1" for local dev
    pub ip: String,
    /// set to 0 to get an os-assigned port
    pub port: u16,
    /// Allowed CORS origins. "*" allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".into(),
            port: 0,
            allowed_origins: vec!["*".into()],
        }
    }
}

impl Config {
    /// Read `IP_ADDRESS`, `PORT` and `ALLOWED_ORIGINS`, falling back to a
    /// local server on port 8000 that accepts any origin.
    pub fn from_env() -> anyhow::Result<Self> {
        use std::env::var;

        let ip = var("IP_ADDRESS").unwrap_or_else(|_| "127.0.0.1".into());
        let port = match var("PORT") {
            Ok(port) => port
                .parse()
                .with_context(|| format!("Invalid PORT '{port}'"))?,
            Err(_) => 8000,
        };
        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            ip,
            port,
            allowed_origins,
        })
    }
}
