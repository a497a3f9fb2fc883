//! Development dataset for the mock laboratory API
//!
//! Used by dev-server so the UI has something realistic to show, and by
//! integration tests that want a populated backend:
//! - a two-level approval flow and test configurations using it
//! - referrer locations and storage units
//! - test requests, one of them already on a worksheet with partial results
//! - reports in several batch job states
//! - `labmanagement.*` global properties

use crate::{
    CONCEPT_CBC, CONCEPT_LFT, CONCEPT_MALARIA, PATIENT_JANE, PATIENT_JOHN,
    TestApp, csv_upload,
};
use anyhow::Result;
use payloads::{requests::FileImport, responses};

pub struct DevDataset {
    pub approval_flow: responses::ApprovalFlow,
    pub test_configs: Vec<responses::TestConfig>,
    pub pending_request: responses::TestRequest,
    pub worksheet_request: responses::TestRequest,
    pub worksheet: responses::Worksheet,
    pub reports: Vec<responses::BatchJob>,
}

impl DevDataset {
    pub async fn create(app: &TestApp) -> Result<Self> {
        tracing::info!("Creating approval configuration");
        let supervisor = app.create_approval_config("Supervisor").await?;
        let pathologist = app.create_approval_config("Pathologist").await?;
        let approval_flow = app
            .create_approval_flow(
                "HAEMATOLOGY",
                &[supervisor.uuid, pathologist.uuid],
            )
            .await?;

        tracing::info!("Configuring tests");
        let test_configs = vec![
            app.create_test_config(CONCEPT_CBC, Some(approval_flow.uuid))
                .await?,
            app.create_test_config(CONCEPT_LFT, None).await?,
        ];
        let malaria = format!("{CONCEPT_MALARIA},MPS,false,true");
        let import = app
            .client
            .import_test_configs(&csv_upload(
                "tests.csv",
                &["test,shortName,requireApproval,enabled", malaria.as_str()],
            ))
            .await?;
        tracing::info!(?import, "imported test configurations");

        tracing::info!("Creating locations and storage");
        app.create_referrer_location("District Hospital").await?;
        app.create_referrer_location("Community Clinic").await?;
        app.create_storage_unit("Fridge A").await?;
        app.create_storage_unit("Freezer -80").await?;

        tracing::info!("Creating test requests and a worksheet");
        let pending_request = app
            .create_test_request(PATIENT_JANE, &[CONCEPT_CBC, CONCEPT_MALARIA])
            .await?;
        let worksheet_request = app
            .create_test_request(PATIENT_JOHN, &[CONCEPT_CBC, CONCEPT_LFT])
            .await?;
        let items: Vec<_> =
            worksheet_request.tests.iter().map(|item| item.uuid).collect();
        let worksheet = app.create_worksheet(&items).await?;
        let first_order = &worksheet_request.tests[0].order_number;
        app.client
            .import_worksheet_results(
                &FileImport::csv(
                    "results.csv",
                    format!("orderNumber,result\n{first_order},13.2"),
                    true,
                )
                .for_worksheet(worksheet.uuid),
            )
            .await?;
        let worksheet = app.client.get_worksheet(&worksheet.uuid).await?;

        tracing::info!("Creating reports");
        let mut reports = Vec::new();
        for description in [
            "Monthly test volume",
            "Turnaround times",
            "Pending worksheets",
        ] {
            reports.push(app.create_report(description).await?);
            // Older reports have moved further along.
            app.advance_batch_jobs();
        }

        for (property, value) in [
            ("labmanagement.defaultPageSize", "10"),
            ("labmanagement.pageSizes", "10,20,50"),
            ("labmanagement.batchJobPollIntervalMs", "3000"),
            ("labmanagement.enableWorksheetImport", "true"),
        ] {
            app.set_global_property(property, value);
        }

        Ok(Self {
            approval_flow,
            test_configs,
            pending_request,
            worksheet_request,
            worksheet,
            reports,
        })
    }
}
