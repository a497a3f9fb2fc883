use payloads::{
    FilterCriteria, StatusCode,
    filters::{ApprovalConfigFilter, TestConfigFilter},
    requests::UpsertApprovalConfig,
};
use test_helpers::{
    CONCEPT_CBC, CONCEPT_LFT, approval_config_details, approval_flow_details,
    assert_status_code, spawn_app,
};

#[tokio::test]
async fn create_read_update_delete_approval_config() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let created = app.create_approval_config("Supervisor").await?;
    assert_eq!(created.approval_title, "Supervisor");
    assert!(!created.voided);

    let updated = app
        .client
        .update_approval_config(
            &created.uuid,
            &UpsertApprovalConfig {
                approval_title: "Senior supervisor".into(),
                approval_required: "Senior sign-off required".into(),
                description: Some("Second line".into()),
            },
        )
        .await?;
    assert_eq!(updated.uuid, created.uuid);
    assert_eq!(updated.approval_title, "Senior supervisor");
    assert_eq!(
        app.client.get_approval_config(&created.uuid).await?,
        updated
    );

    app.client.delete_approval_config(&created.uuid).await?;
    let listed = app.client.list_approval_configs(&Default::default()).await?;
    assert!(listed.results.is_empty());
    let with_voided = app
        .client
        .list_approval_configs(&ApprovalConfigFilter {
            include_voided: Some(true),
            ..Default::default()
        })
        .await?;
    assert_eq!(with_voided.results.len(), 1);
    assert!(with_voided.results[0].voided);

    Ok(())
}

#[tokio::test]
async fn duplicate_titles_conflict() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_approval_config("Supervisor").await?;
    assert_status_code(
        app.client
            .create_approval_config(&approval_config_details("supervisor"))
            .await,
        StatusCode::CONFLICT,
    );
    Ok(())
}

#[tokio::test]
async fn approval_flow_levels_resolve_to_configs() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let supervisor = app.create_approval_config("Supervisor").await?;
    let pathologist = app.create_approval_config("Pathologist").await?;
    let flow = app
        .create_approval_flow("HAEM", &[supervisor.uuid, pathologist.uuid])
        .await?;

    let levels = flow.levels();
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0].config.label(), "Supervisor");
    assert!(levels[0].allow_owner);
    assert_eq!(levels[1].config.uuid, pathologist.uuid.to_string());

    // A config used by a flow cannot be voided.
    assert_status_code(
        app.client.delete_approval_config(&supervisor.uuid).await,
        StatusCode::CONFLICT,
    );

    app.client.delete_approval_flow(&flow.uuid).await?;
    assert!(app.client.get_approval_flow(&flow.uuid).await?.voided);
    app.client.delete_approval_config(&supervisor.uuid).await?;

    Ok(())
}

#[tokio::test]
async fn invalid_approval_flows_are_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let supervisor = app.create_approval_config("Supervisor").await?;

    let mut gap = approval_flow_details("GAP", &[supervisor.uuid]);
    gap.level_three = gap.level_one.take();
    let result = app.client.create_approval_flow(&gap).await;
    let error = result.as_ref().map(|_| ()).unwrap_err().to_string();
    assert!(error.contains("Level 1 must be set"), "{error}");
    assert_status_code(result, StatusCode::BAD_REQUEST);

    app.create_approval_flow("TAKEN", &[supervisor.uuid]).await?;
    assert_status_code(
        app.client
            .create_approval_flow(&approval_flow_details(
                "TAKEN",
                &[supervisor.uuid],
            ))
            .await,
        StatusCode::CONFLICT,
    );

    Ok(())
}

#[tokio::test]
async fn test_configs_filter_by_test_and_state() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let supervisor = app.create_approval_config("Supervisor").await?;
    let flow = app.create_approval_flow("HAEM", &[supervisor.uuid]).await?;
    let cbc = app.create_test_config(CONCEPT_CBC, Some(flow.uuid)).await?;
    assert!(cbc.require_approval);
    assert_eq!(cbc.test.label(), "Full Blood Count");
    assert_eq!(
        cbc.approval_flow.as_ref().map(|f| f.label()),
        Some("HAEM flow")
    );

    let mut lft = test_helpers::test_config_details(CONCEPT_LFT, None);
    lft.enabled = false;
    app.client.create_test_config(&lft).await?;

    let only_cbc = app
        .client
        .list_test_configs(&TestConfigFilter {
            tests: vec![CONCEPT_CBC.into()],
            ..Default::default()
        })
        .await?;
    assert_eq!(only_cbc.results, vec![cbc.clone()]);

    let active = app
        .client
        .list_test_configs(&TestConfigFilter {
            criteria: FilterCriteria::default().with_total_count(),
            active: Some(true),
            ..Default::default()
        })
        .await?;
    assert_eq!(active.total_count, Some(1));

    // One configuration per test.
    assert_status_code(
        app.client
            .create_test_config(&test_helpers::test_config_details(
                CONCEPT_CBC,
                None,
            ))
            .await,
        StatusCode::CONFLICT,
    );

    Ok(())
}

#[tokio::test]
async fn unknown_test_concepts_are_bad_requests() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let result = app
        .client
        .create_test_config(&test_helpers::test_config_details(
            "concept-unknown",
            None,
        ))
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);
    Ok(())
}
