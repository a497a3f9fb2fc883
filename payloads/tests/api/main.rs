mod approval;
mod batch_job;
mod import;
mod orders;
mod wire;

use payloads::FilterCriteria;
use test_helpers::spawn_app;

#[tokio::test]
async fn global_properties_are_listed_by_prefix() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.set_global_property("labmanagement.defaultPageSize", "20");
    app.set_global_property("other.module.enabled", "true");

    let page = app.client.list_global_properties("labmanagement.").await?;
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].property, "labmanagement.defaultPageSize");
    assert_eq!(page.results[0].value.as_deref(), Some("20"));

    let everything = app
        .client
        .list::<payloads::responses::GlobalProperty>(
            payloads::paths::SYSTEM_SETTING,
            &FilterCriteria::default(),
        )
        .await?;
    assert_eq!(everything.results.len(), 2);

    Ok(())
}
