use payloads::{
    StatusCode,
    filters::TestConfigFilter,
    requests::FileImport,
    responses::{
        ImportOutcome, TestRequestStatus, WorksheetItemStatus, WorksheetStatus,
    },
};
use test_helpers::{
    CONCEPT_CBC, CONCEPT_LFT, CONCEPT_MALARIA, PATIENT_JANE, assert_status_code,
    csv_upload, spawn_app,
};

#[tokio::test]
async fn test_config_import_reports_rejected_rows() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_test_config(CONCEPT_LFT, None).await?;

    let rows = [
        "test,shortName,requireApproval,enabled".to_string(),
        format!("{CONCEPT_CBC},CBC,false,true"),
        format!("{CONCEPT_LFT},LFT,false,false"),
        "concept-unknown,UNK,false,true".to_string(),
        format!("{CONCEPT_MALARIA},MPS,maybe,true"),
    ];
    let rows: Vec<_> = rows.iter().map(String::as_str).collect();
    let result = app
        .client
        .import_test_configs(&csv_upload("tests.csv", &rows))
        .await?;

    let ImportOutcome::Failed {
        created,
        updated,
        errors,
        error_file_uuid,
    } = result.into_outcome()
    else {
        panic!("expected a failed import");
    };
    assert_eq!((created, updated), (1, 1));
    assert_eq!(errors.len(), 2);
    assert!(errors[0].starts_with("row 4"), "{errors:?}");
    assert_eq!(errors[1], "row 5: invalid flag value");
    assert!(error_file_uuid.is_some());

    // Good rows were still written.
    let configs = app
        .client
        .list_test_configs(&TestConfigFilter {
            active: Some(true),
            ..Default::default()
        })
        .await?;
    assert_eq!(configs.results.len(), 1);
    assert_eq!(configs.results[0].test_short_name.as_deref(), Some("CBC"));

    Ok(())
}

#[tokio::test]
async fn clean_imports_succeed() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let result = app
        .client
        .import_test_configs(&FileImport::csv(
            "tests.csv",
            format!("{CONCEPT_CBC},CBC,false,true\n{CONCEPT_LFT},,false,true"),
            false,
        ))
        .await?;
    assert_eq!(
        result.into_outcome(),
        ImportOutcome::Imported {
            created: 2,
            updated: 0
        }
    );
    Ok(())
}

#[tokio::test]
async fn worksheet_results_complete_the_worksheet() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let request = app
        .create_test_request(PATIENT_JANE, &[CONCEPT_CBC, CONCEPT_LFT])
        .await?;
    let items: Vec<_> = request.tests.iter().map(|item| item.uuid).collect();
    let worksheet = app.create_worksheet(&items).await?;
    let cbc = &request.tests[0].order_number;
    let lft = &request.tests[1].order_number;

    let first_result = format!("{cbc},13.2");
    let partial = app
        .client
        .import_worksheet_results(
            &csv_upload(
                "results.csv",
                &["orderNumber,result", first_result.as_str()],
            )
            .for_worksheet(worksheet.uuid),
        )
        .await?;
    assert_eq!(
        partial.into_outcome(),
        ImportOutcome::Imported {
            created: 1,
            updated: 0
        }
    );
    let sheet = app.client.get_worksheet(&worksheet.uuid).await?;
    assert_eq!(sheet.status, WorksheetStatus::Pending);
    assert_eq!(
        sheet.worksheet_items[0].status,
        WorksheetItemStatus::ResultEntered
    );
    assert_eq!(sheet.worksheet_items[0].result.as_deref(), Some("13.2"));

    let (corrected, second_result) =
        (format!("{cbc},13.4"), format!("{lft},normal"));
    let rest = app
        .client
        .import_worksheet_results(
            &csv_upload(
                "results.csv",
                &[
                    "orderNumber,result",
                    corrected.as_str(),
                    second_result.as_str(),
                    "LRQ-99999-1,1.0",
                ],
            )
            .for_worksheet(worksheet.uuid),
        )
        .await?;
    let ImportOutcome::Failed {
        created,
        updated,
        errors,
        ..
    } = rest.into_outcome()
    else {
        panic!("expected the unknown order number to be rejected");
    };
    assert_eq!((created, updated), (1, 1));
    assert_eq!(errors, ["row 4: LRQ-99999-1 is not on this worksheet"]);

    let sheet = app.client.get_worksheet(&worksheet.uuid).await?;
    assert_eq!(sheet.status, WorksheetStatus::Completed);
    let request = app.client.get_test_request(&request.uuid).await?;
    assert_eq!(request.status, TestRequestStatus::Completed);
    assert!(
        request
            .tests
            .iter()
            .all(|item| item.status == TestRequestStatus::Completed)
    );

    Ok(())
}

#[tokio::test]
async fn worksheet_imports_need_a_known_worksheet() -> anyhow::Result<()> {
    let app = spawn_app().await;
    assert_status_code(
        app.client
            .import_worksheet_results(&csv_upload(
                "results.csv",
                &["orderNumber,result"],
            ))
            .await,
        StatusCode::BAD_REQUEST,
    );
    assert_status_code(
        app.client
            .import_worksheet_results(
                &csv_upload("results.csv", &["orderNumber,result"])
                    .for_worksheet(payloads::WorksheetId(uuid::Uuid::new_v4())),
            )
            .await,
        StatusCode::NOT_FOUND,
    );
    Ok(())
}
