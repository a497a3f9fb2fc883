pub mod mock;

use actix_web::web;
use jiff::{Timestamp, civil::date};
use mock_api::{
    Config,
    store::{ExternalKind, MockStore},
    telemetry,
    time::TimeSource,
};
use payloads::{
    ApprovalConfigId, ApprovalFlowId, TestRequestItemId,
    requests::{self, FileImport},
    responses::{self, BatchJobType, UrgencyType, WorksheetStatus},
};
use reqwest::StatusCode;
use tracing_log::LogTracer;
use tracing_subscriber::util::SubscriberInitExt;

/// Clock start for tests.
pub const TEST_START: &str = "2025-01-01T00:00:00Z";

// Entities owned by the wider hospital system, registered in every app.
pub const PATIENT_JANE: &str = "patient-jane-doe";
pub const PATIENT_JOHN: &str = "patient-john-roe";
pub const LOCATION_OUTPATIENTS: &str = "location-outpatients";
pub const LOCATION_MAIN_LAB: &str = "location-main-lab";
pub const CONCEPT_CBC: &str = "concept-full-blood-count";
pub const CONCEPT_LFT: &str = "concept-liver-function";
pub const CONCEPT_MALARIA: &str = "concept-malaria-smear";
pub const PROVIDER_TECH: &str = "provider-lab-tech";

pub struct TestApp {
    #[allow(unused)]
    pub port: u16,
    pub client: payloads::APIClient,
    pub store: web::Data<MockStore>,
}

/// Functions to populate test data
///
/// Using anyhow::Result lets us get a backtrace from when the error was fist
/// converted to anyhow::Result. Run with RUST_BACKTRACE=1 to view.
impl TestApp {
    pub fn time(&self) -> &TimeSource {
        &self.store.time
    }

    pub fn set_global_property(&self, property: &str, value: &str) {
        self.store.lock().set_global_property(property, value);
    }

    pub async fn create_approval_config(
        &self,
        title: &str,
    ) -> anyhow::Result<responses::ApprovalConfig> {
        Ok(self
            .client
            .create_approval_config(&approval_config_details(title))
            .await?)
    }

    /// A flow whose levels are the given configs, in order.
    pub async fn create_approval_flow(
        &self,
        system_name: &str,
        levels: &[ApprovalConfigId],
    ) -> anyhow::Result<responses::ApprovalFlow> {
        Ok(self
            .client
            .create_approval_flow(&approval_flow_details(system_name, levels))
            .await?)
    }

    pub async fn create_test_config(
        &self,
        concept: &str,
        approval_flow: Option<ApprovalFlowId>,
    ) -> anyhow::Result<responses::TestConfig> {
        Ok(self
            .client
            .create_test_config(&test_config_details(concept, approval_flow))
            .await?)
    }

    pub async fn create_referrer_location(
        &self,
        name: &str,
    ) -> anyhow::Result<responses::ReferrerLocation> {
        Ok(self
            .client
            .create_referrer_location(&referrer_location_details(name))
            .await?)
    }

    pub async fn create_storage_unit(
        &self,
        name: &str,
    ) -> anyhow::Result<responses::StorageUnit> {
        Ok(self
            .client
            .create_storage_unit(&storage_unit_details(name))
            .await?)
    }

    pub async fn create_test_request(
        &self,
        patient: &str,
        tests: &[&str],
    ) -> anyhow::Result<responses::TestRequest> {
        Ok(self
            .client
            .create_test_request(&test_request_details(patient, tests))
            .await?)
    }

    pub async fn create_worksheet(
        &self,
        items: &[TestRequestItemId],
    ) -> anyhow::Result<responses::Worksheet> {
        Ok(self
            .client
            .create_worksheet(&worksheet_details(items))
            .await?)
    }

    pub async fn create_report(
        &self,
        description: &str,
    ) -> anyhow::Result<responses::BatchJob> {
        Ok(self
            .client
            .create_batch_job(&batch_job_details(description))
            .await?)
    }

    /// Step every active batch job, as the backend's job runner would.
    pub fn advance_batch_jobs(&self) -> usize {
        let now = self.store.time.now();
        self.store.lock().advance_batch_jobs(now)
    }
}

/// Register the patients, locations, test concepts and providers that the
/// fixtures refer to.
pub fn register_external_entities(store: &MockStore) {
    let mut state = store.lock();
    for (kind, uuid, display) in [
        (ExternalKind::Patient, PATIENT_JANE, "Jane Doe"),
        (ExternalKind::Patient, PATIENT_JOHN, "John Roe"),
        (ExternalKind::Location, LOCATION_OUTPATIENTS, "Outpatients"),
        (ExternalKind::Location, LOCATION_MAIN_LAB, "Main Laboratory"),
        (ExternalKind::Concept, CONCEPT_CBC, "Full Blood Count"),
        (ExternalKind::Concept, CONCEPT_LFT, "Liver Function Tests"),
        (ExternalKind::Concept, CONCEPT_MALARIA, "Malaria Smear"),
        (ExternalKind::Provider, PROVIDER_TECH, "Lab Technician"),
    ] {
        state.register(kind, uuid, display);
    }
}

pub fn approval_config_details(title: &str) -> requests::UpsertApprovalConfig {
    requests::UpsertApprovalConfig {
        approval_title: title.to_string(),
        approval_required: format!("{title} approval required"),
        description: None,
    }
}

pub fn approval_flow_details(
    system_name: &str,
    levels: &[ApprovalConfigId],
) -> requests::UpsertApprovalFlow {
    let level = |i: usize| levels.get(i).copied();
    requests::UpsertApprovalFlow {
        name: format!("{system_name} flow"),
        system_name: system_name.to_string(),
        description: Some("Results need sign-off before release".into()),
        level_one: level(0),
        level_two: level(1),
        level_three: level(2),
        level_four: level(3),
        level_one_allow_owner: true,
        level_two_allow_owner: false,
        level_three_allow_owner: false,
        level_four_allow_owner: false,
    }
}

pub fn test_config_details(
    concept: &str,
    approval_flow: Option<ApprovalFlowId>,
) -> requests::UpsertTestConfig {
    requests::UpsertTestConfig {
        test: concept.to_string(),
        test_short_name: None,
        approval_flow,
        require_approval: approval_flow.is_some(),
        enabled: true,
    }
}

pub fn referrer_location_details(name: &str) -> requests::UpsertReferrerLocation {
    requests::UpsertReferrerLocation {
        name: name.to_string(),
        acronym: None,
        referrer_in: true,
        referrer_out: false,
        enabled: true,
    }
}

pub fn storage_unit_details(name: &str) -> requests::UpsertStorageUnit {
    requests::UpsertStorageUnit {
        unit_name: name.to_string(),
        description: None,
        location: Some(LOCATION_MAIN_LAB.to_string()),
        active: true,
    }
}

pub fn test_request_details(
    patient: &str,
    tests: &[&str],
) -> requests::CreateTestRequest {
    requests::CreateTestRequest {
        patient: patient.to_string(),
        at_location: LOCATION_OUTPATIENTS.to_string(),
        urgency: UrgencyType::Routine,
        request_date: date(2025, 1, 1),
        clinical_note: None,
        tests: tests.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn worksheet_details(items: &[TestRequestItemId]) -> requests::UpsertWorksheet {
    requests::UpsertWorksheet {
        worksheet_date: date(2025, 1, 2),
        test: None,
        responsible_person: Some(PROVIDER_TECH.to_string()),
        remarks: None,
        status: WorksheetStatus::Pending,
        test_request_items: items.to_vec(),
    }
}

pub fn batch_job_details(description: &str) -> requests::CreateBatchJob {
    requests::CreateBatchJob {
        batch_job_type: BatchJobType::Report,
        description: description.to_string(),
        parameters: Some("report=worksheet-summary".into()),
        expiration: None,
    }
}

/// A CSV upload with a header row.
pub fn csv_upload(name: &str, rows: &[&str]) -> FileImport {
    FileImport::csv(name, rows.join("\n"), true)
}

pub async fn spawn_app_on_port(port: u16, time: TimeSource) -> TestApp {
    let config = Config {
        port,
        ..Config::default()
    };
    spawn_app_with_config(config, time).await
}

pub async fn spawn_app_with_config(
    mut config: Config,
    time: TimeSource,
) -> TestApp {
    let subscriber = telemetry::get_subscriber("error".into());
    let _ = LogTracer::init();
    let _ = subscriber.try_init();

    let store = web::Data::new(MockStore::new(time));
    register_external_entities(&store);

    let server = mock_api::build(&mut config, store.clone())
        .expect("Failed to bind mock API");
    tokio::spawn(server);

    TestApp {
        port: config.port,
        client: payloads::APIClient::new(format!(
            "http://127.0.0.1:{}",
            config.port
        )),
        store,
    }
}

/// Spawn the mock API on an OS-assigned port with a fixed clock.
pub async fn spawn_app() -> TestApp {
    let start: Timestamp = TEST_START.parse().expect("valid start time");
    spawn_app_on_port(0, TimeSource::fixed(start)).await
}

pub fn assert_status_code<T>(
    result: Result<T, payloads::ClientError>,
    expected: StatusCode,
) {
    match result {
        Err(payloads::ClientError::APIError(code, _)) => {
            assert_eq!(code, expected)
        }
        _ => panic!("Expected APIError"),
    };
}
