use payloads::{
    CacheKey, FilterCriteria, PageResult, Representation, Sort,
    filters::TestRequestFilter,
    forms::ApprovalFlowForm,
    paths,
    responses::{TestRequest, TestRequestStatus},
};
use std::collections::BTreeSet;
use test_helpers::{CONCEPT_CBC, PATIENT_JANE, spawn_app};

#[tokio::test]
async fn every_request_bypasses_http_caches() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let config = app.create_approval_config("Supervisor").await?;
    app.client.get_approval_config(&config.uuid).await?;
    app.client
        .list_approval_configs(&Default::default())
        .await?;
    app.client.delete_approval_config(&config.uuid).await?;

    let requests = app.store.recorded_requests();
    assert_eq!(requests.len(), 4);
    for request in requests {
        assert_eq!(request.cache_control.as_deref(), Some("no-cache"));
        assert_eq!(request.pragma.as_deref(), Some("no-cache"));
        assert_eq!(request.accept.as_deref(), Some("application/json"));
    }

    Ok(())
}

#[tokio::test]
async fn list_filters_serialize_in_declared_order() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let filter = TestRequestFilter {
        criteria: FilterCriteria::page(0, 5)
            .with_q("jane doe")
            .with_total_count()
            .with_sort(Sort::desc("dateCreated")),
        status: vec![TestRequestStatus::Pending, TestRequestStatus::InProgress],
        patient: Some(PATIENT_JANE.into()),
        ..Default::default()
    };
    app.client.list_test_requests(&filter).await?;

    let request = app
        .store
        .recorded_requests()
        .pop()
        .expect("request recorded");
    assert_eq!(request.path, paths::TEST_REQUEST);
    assert_eq!(
        request.query,
        "startIndex=0&limit=5&q=jane%20doe&totalCount=true&sort=-dateCreated\
         &status=PENDING%2CIN_PROGRESS&patient=patient-jane-doe"
    );

    Ok(())
}

#[tokio::test]
async fn cache_keys_are_request_targets() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_test_request(PATIENT_JANE, &[CONCEPT_CBC]).await?;
    let criteria = FilterCriteria::page(0, 10).with_v(Representation::Full);
    let key = CacheKey::new(paths::TEST_REQUEST, &criteria);

    let page: PageResult<TestRequest> = app.client.fetch_key(&key).await?;
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].tests.len(), 1);
    assert_eq!(app.store.count_gets(key.as_str()), 1);

    Ok(())
}

#[tokio::test]
async fn write_bodies_carry_only_writable_fields() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let config = app.create_approval_config("Supervisor").await?;

    // Screen state such as saving flags and messages stays in the form.
    let mut form = ApprovalFlowForm {
        name: "Chemistry".into(),
        system_name: "CHEMISTRY".into(),
        is_saving: true,
        ..Default::default()
    };
    form.add_level();
    form.levels[0].config = Some(config.uuid);
    let request = form.to_request().expect("valid form");
    app.client.create_approval_flow(&request).await?;

    let (path, body) = app
        .store
        .recorded_bodies()
        .pop()
        .expect("body recorded");
    assert_eq!(path, paths::APPROVAL_FLOW);
    let keys: BTreeSet<_> = body
        .as_object()
        .expect("JSON object")
        .keys()
        .map(String::as_str)
        .collect();
    let expected = BTreeSet::from([
        "name",
        "systemName",
        "description",
        "levelOne",
        "levelTwo",
        "levelThree",
        "levelFour",
        "levelOneAllowOwner",
        "levelTwoAllowOwner",
        "levelThreeAllowOwner",
        "levelFourAllowOwner",
    ]);
    assert_eq!(keys, expected);

    Ok(())
}
