use jiff::civil::date;
use payloads::{
    FilterCriteria, StatusCode,
    filters::{StorageUnitFilter, TestRequestFilter, WorksheetFilter},
    responses::{TestRequestStatus, WorksheetStatus},
};
use test_helpers::{
    CONCEPT_CBC, CONCEPT_LFT, CONCEPT_MALARIA, LOCATION_MAIN_LAB, PATIENT_JANE,
    PATIENT_JOHN, assert_status_code, referrer_location_details, spawn_app,
    test_request_details, worksheet_details,
};

#[tokio::test]
async fn test_requests_are_numbered_with_one_order_per_test()
-> anyhow::Result<()> {
    let app = spawn_app().await;
    let request = app
        .create_test_request(PATIENT_JANE, &[CONCEPT_CBC, CONCEPT_LFT])
        .await?;

    assert_eq!(request.request_no, "LRQ-00001");
    assert_eq!(request.status, TestRequestStatus::Pending);
    assert_eq!(request.patient.label(), "Jane Doe");
    let orders: Vec<_> =
        request.tests.iter().map(|t| t.order_number.as_str()).collect();
    assert_eq!(orders, ["LRQ-00001-1", "LRQ-00001-2"]);
    assert_eq!(request.tests[1].test.label(), "Liver Function Tests");

    assert_eq!(app.client.get_test_request(&request.uuid).await?, request);

    assert_status_code(
        app.client
            .create_test_request(&test_request_details(PATIENT_JANE, &[]))
            .await,
        StatusCode::BAD_REQUEST,
    );
    assert_status_code(
        app.client
            .create_test_request(&test_request_details(
                "patient-unknown",
                &[CONCEPT_CBC],
            ))
            .await,
        StatusCode::BAD_REQUEST,
    );

    Ok(())
}

#[tokio::test]
async fn test_request_lists_page_and_filter() -> anyhow::Result<()> {
    let app = spawn_app().await;
    for _ in 0..3 {
        app.create_test_request(PATIENT_JANE, &[CONCEPT_CBC]).await?;
    }
    let mut later = test_request_details(PATIENT_JOHN, &[CONCEPT_MALARIA]);
    later.request_date = date(2025, 2, 1);
    app.client.create_test_request(&later).await?;

    let page = app
        .client
        .list_test_requests(&TestRequestFilter {
            criteria: FilterCriteria::page(2, 2).with_total_count(),
            ..Default::default()
        })
        .await?;
    assert_eq!(page.total_count, Some(4));
    assert_eq!(page.results.len(), 2);
    // Nested items stay out of lists unless asked for.
    assert!(page.results.iter().all(|r| r.tests.is_empty()));

    let johns = app
        .client
        .list_test_requests(&TestRequestFilter {
            patient: Some(PATIENT_JOHN.into()),
            include_items: Some(true),
            ..Default::default()
        })
        .await?;
    assert_eq!(johns.results.len(), 1);
    assert_eq!(johns.results[0].tests.len(), 1);
    assert_eq!(johns.total_count, None);

    let february = app
        .client
        .list_test_requests(&TestRequestFilter {
            min_request_date: Some(date(2025, 1, 15)),
            ..Default::default()
        })
        .await?;
    assert_eq!(february.results.len(), 1);

    let searched = app
        .client
        .list_test_requests(&TestRequestFilter {
            criteria: FilterCriteria::default().with_q("john"),
            ..Default::default()
        })
        .await?;
    assert_eq!(searched.results.len(), 1);

    Ok(())
}

#[tokio::test]
async fn worksheets_move_items_along() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let request = app
        .create_test_request(PATIENT_JANE, &[CONCEPT_CBC, CONCEPT_LFT])
        .await?;
    let cbc = request.tests[0].uuid;
    let lft = request.tests[1].uuid;

    let worksheet = app.create_worksheet(&[cbc, lft]).await?;
    assert!(worksheet.worksheet_no.starts_with("WKS-"));
    assert_eq!(worksheet.worksheet_items.len(), 2);
    assert_eq!(
        worksheet.responsible_person.as_ref().map(|p| p.label()),
        Some("Lab Technician")
    );
    let request = app.client.get_test_request(&request.uuid).await?;
    assert_eq!(request.status, TestRequestStatus::InProgress);

    // An item can only be on one worksheet.
    assert_status_code(
        app.client.create_worksheet(&worksheet_details(&[cbc])).await,
        StatusCode::CONFLICT,
    );

    // Dropping an item returns it to the pending pool.
    let updated = app
        .client
        .update_worksheet(&worksheet.uuid, &worksheet_details(&[cbc]))
        .await?;
    assert_eq!(updated.worksheet_no, worksheet.worksheet_no);
    assert_eq!(updated.worksheet_items.len(), 1);
    let request = app.client.get_test_request(&request.uuid).await?;
    assert_eq!(request.tests[1].status, TestRequestStatus::Pending);

    let second = app.create_worksheet(&[lft]).await?;
    assert_ne!(second.worksheet_no, worksheet.worksheet_no);

    let pending = app
        .client
        .list_worksheets(&WorksheetFilter {
            status: vec![WorksheetStatus::Pending],
            ..Default::default()
        })
        .await?;
    assert_eq!(pending.results.len(), 2);
    assert!(pending.results.iter().all(|w| w.worksheet_items.is_empty()));

    Ok(())
}

#[tokio::test]
async fn referrer_locations_can_be_renamed() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let location = app.create_referrer_location("District Hospital").await?;
    assert!(location.referrer_in);

    let mut details = referrer_location_details("District General Hospital");
    details.acronym = Some("DGH".into());
    let renamed = app
        .client
        .update_referrer_location(&location.uuid, &details)
        .await?;
    assert_eq!(renamed.name, "District General Hospital");

    let found = app
        .client
        .list_referrer_locations(&payloads::filters::ReferrerLocationFilter {
            criteria: FilterCriteria::default().with_q("dgh"),
            ..Default::default()
        })
        .await?;
    assert_eq!(found.results, vec![renamed]);

    assert_status_code(
        app.client
            .create_referrer_location(&referrer_location_details(" "))
            .await,
        StatusCode::BAD_REQUEST,
    );

    Ok(())
}

#[tokio::test]
async fn storage_units_are_scoped_to_locations() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let fridge = app.create_storage_unit("Fridge A").await?;
    app.create_storage_unit("Freezer -80").await?;
    assert_eq!(
        fridge.location.as_ref().map(|l| l.uuid.as_str()),
        Some(LOCATION_MAIN_LAB)
    );

    let in_lab = app
        .client
        .list_storage_units(&StorageUnitFilter {
            location: Some(LOCATION_MAIN_LAB.into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(in_lab.results.len(), 2);

    app.client.delete_storage_unit(&fridge.uuid).await?;
    assert_status_code(
        app.client.get_storage_unit(&fridge.uuid).await,
        StatusCode::NOT_FOUND,
    );
    let remaining = app.client.list_storage_units(&Default::default()).await?;
    assert_eq!(remaining.results.len(), 1);

    Ok(())
}
