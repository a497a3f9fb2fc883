//! In-memory state behind the mock laboratory API.
//!
//! ## Layout
//! - **One lock**: all collections live in a single [`State`] behind a
//!   mutex. Handlers take the lock, do their work synchronously, and release
//!   it before responding.
//! - **External entities**: concepts, locations, patients and providers
//!   belong to the wider hospital system. The mock only knows their uuid and
//!   display name, registered up front by seed data.
//! - **Recordings**: every request line, every JSON write body and every
//!   batch job cancellation is kept so tests can assert on exactly what the
//!   client put on the wire.

pub mod batch_jobs;
pub mod configuration;
pub mod orders;

use payloads::{
    BatchJobId, EntityRef,
    responses::{
        ApprovalConfig, ApprovalFlow, BatchJob, GlobalProperty,
        ReferrerLocation, StorageUnit, TestConfig, TestRequest, Worksheet,
    },
};
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::time::TimeSource;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Unknown {kind}: {uuid}")]
    UnknownReference { kind: &'static str, uuid: String },
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
}

/// The request line and cache headers of a received request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub cache_control: Option<String>,
    pub pragma: Option<String>,
    pub accept: Option<String>,
}

/// A batch job cancellation, with the reason from each place it can travel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    pub ids: Vec<BatchJobId>,
    pub query_reason: Option<String>,
    pub body_reason: Option<String>,
}

/// Kinds of entity owned by the wider hospital system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    Concept,
    Location,
    Patient,
    Provider,
}

impl ExternalKind {
    fn label(self) -> &'static str {
        match self {
            Self::Concept => "test concept",
            Self::Location => "location",
            Self::Patient => "patient",
            Self::Provider => "provider",
        }
    }
}

#[derive(Default)]
pub struct State {
    pub approval_configs: Vec<ApprovalConfig>,
    pub approval_flows: Vec<ApprovalFlow>,
    pub test_configs: Vec<TestConfig>,
    pub referrer_locations: Vec<ReferrerLocation>,
    pub storage_units: Vec<StorageUnit>,
    pub test_requests: Vec<TestRequest>,
    pub worksheets: Vec<Worksheet>,
    pub batch_jobs: Vec<BatchJob>,
    pub global_properties: Vec<GlobalProperty>,
    external: BTreeMap<(u8, String), String>,
    requests: Vec<RecordedRequest>,
    bodies: Vec<(String, serde_json::Value)>,
    cancellations: Vec<Cancellation>,
    sequence: u32,
}

impl State {
    pub fn register(
        &mut self,
        kind: ExternalKind,
        uuid: impl Into<String>,
        display: impl Into<String>,
    ) {
        self.external
            .insert((kind as u8, uuid.into()), display.into());
    }

    /// Resolve an external uuid into a reference carrying its display name.
    pub fn resolve(
        &self,
        kind: ExternalKind,
        uuid: &str,
    ) -> Result<EntityRef, StoreError> {
        self.external
            .get(&(kind as u8, uuid.to_string()))
            .map(|display| EntityRef::new(uuid, display.clone()))
            .ok_or_else(|| StoreError::UnknownReference {
                kind: kind.label(),
                uuid: uuid.to_string(),
            })
    }

    fn next_number(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{prefix}-{:05}", self.sequence)
    }
}

pub struct MockStore {
    state: Mutex<State>,
    pub time: TimeSource,
}

impl MockStore {
    pub fn new(time: TimeSource) -> Self {
        Self {
            state: Mutex::new(State::default()),
            time,
        }
    }

    /// A panicking handler must not take the whole mock down with it.
    pub fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_request(&self, request: RecordedRequest) {
        self.lock().requests.push(request);
    }

    pub fn record_body(&self, path: &str, body: &serde_json::Value) {
        self.lock().bodies.push((path.to_string(), body.clone()));
    }

    pub fn record_cancellation(&self, cancellation: Cancellation) {
        self.lock().cancellations.push(cancellation);
    }

    pub fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn recorded_bodies(&self) -> Vec<(String, serde_json::Value)> {
        self.lock().bodies.clone()
    }

    pub fn cancellations(&self) -> Vec<Cancellation> {
        self.lock().cancellations.clone()
    }

    /// Number of GET requests whose path and query equal `target`.
    pub fn count_gets(&self, target: &str) -> usize {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == "GET" && r.path == path && r.query == query)
            .count()
    }

    pub fn clear_recordings(&self) {
        let mut state = self.lock();
        state.requests.clear();
        state.bodies.clear();
        state.cancellations.clear();
    }
}

/// Parse a boolean cell of an import file.
fn parse_flag(cell: &str) -> Option<bool> {
    match cell.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" | "" => Some(false),
        _ => None,
    }
}

/// Split an import file into rows of trimmed cells, skipping blank lines and
/// optionally the header. Rows carry their 1-based line number.
fn csv_rows(content: &str, has_header: bool) -> Vec<(usize, Vec<String>)> {
    content
        .lines()
        .enumerate()
        .skip(usize::from(has_header))
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let cells = line.split(',').map(|c| c.trim().to_string()).collect();
            (index + 1, cells)
        })
        .collect()
}
