use jiff::ToSpan;
use payloads::{
    StatusCode,
    filters::BatchJobFilter,
    responses::{BatchJobStatus, BatchJobType},
};
use test_helpers::{assert_status_code, batch_job_details, spawn_app};

#[tokio::test]
async fn reports_run_then_complete() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let report = app.create_report("Monthly test volume").await?;
    assert_eq!(report.status, BatchJobStatus::Pending);
    assert_eq!(report.batch_job_type, BatchJobType::Report);

    app.time().advance(5.seconds());
    assert_eq!(app.advance_batch_jobs(), 1);
    let running = app.client.get_batch_job(&report.uuid).await?;
    assert_eq!(running.status, BatchJobStatus::Running);
    assert_eq!(running.started_date, Some(app.time().now()));

    app.advance_batch_jobs();
    let done = app.client.get_batch_job(&report.uuid).await?;
    assert_eq!(done.status, BatchJobStatus::Completed);
    assert_eq!(done.records_processed, Some(100));
    assert!(!done.status.is_active());

    // Nothing left to move.
    assert_eq!(app.advance_batch_jobs(), 0);

    Ok(())
}

#[tokio::test]
async fn batch_jobs_list_newest_first() -> anyhow::Result<()> {
    let app = spawn_app().await;
    for description in ["First", "Second", "Third"] {
        app.create_report(description).await?;
        app.time().advance(1.minute());
    }
    app.advance_batch_jobs();

    let jobs = app.client.list_batch_jobs(&Default::default()).await?;
    let descriptions: Vec<_> =
        jobs.results.iter().map(|j| j.description.as_str()).collect();
    assert_eq!(descriptions, ["Third", "Second", "First"]);

    let running = app
        .client
        .list_batch_jobs(&BatchJobFilter {
            status: vec![BatchJobStatus::Running],
            batch_job_type: Some(BatchJobType::Report),
            ..Default::default()
        })
        .await?;
    assert_eq!(running.results.len(), 3);

    let exports = app
        .client
        .list_batch_jobs(&BatchJobFilter {
            batch_job_type: Some(BatchJobType::Export),
            ..Default::default()
        })
        .await?;
    assert!(exports.results.is_empty());

    Ok(())
}

#[tokio::test]
async fn cancel_reason_travels_in_query_and_body() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let first = app.create_report("First").await?;
    let second = app.create_report("Second").await?;

    app.client
        .cancel_batch_jobs(&[first.uuid, second.uuid], "Requested twice")
        .await?;

    let cancellations = app.store.cancellations();
    assert_eq!(cancellations.len(), 1);
    let cancellation = &cancellations[0];
    assert_eq!(cancellation.ids, vec![first.uuid, second.uuid]);
    assert_eq!(cancellation.query_reason.as_deref(), Some("Requested twice"));
    assert_eq!(cancellation.body_reason.as_deref(), Some("Requested twice"));

    for id in [first.uuid, second.uuid] {
        let job = app.client.get_batch_job(&id).await?;
        assert_eq!(job.status, BatchJobStatus::Cancelled);
        assert_eq!(job.cancel_reason.as_deref(), Some("Requested twice"));
    }

    Ok(())
}

#[tokio::test]
async fn cancelling_nothing_sends_nothing() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.client.cancel_batch_jobs(&[], "No jobs").await?;
    assert!(app.store.recorded_requests().is_empty());
    assert!(app.store.cancellations().is_empty());
    Ok(())
}

#[tokio::test]
async fn finished_jobs_cannot_be_cancelled() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let finished = app.create_report("Finished").await?;
    app.advance_batch_jobs();
    app.advance_batch_jobs();
    let pending = app.create_report("Pending").await?;

    assert_status_code(
        app.client
            .cancel_batch_jobs(&[pending.uuid, finished.uuid], "Too late")
            .await,
        StatusCode::CONFLICT,
    );
    // Nothing was cancelled.
    let pending = app.client.get_batch_job(&pending.uuid).await?;
    assert_eq!(pending.status, BatchJobStatus::Pending);

    assert_status_code(
        app.client.cancel_batch_jobs(&[pending.uuid], "  ").await,
        StatusCode::BAD_REQUEST,
    );

    Ok(())
}

#[tokio::test]
async fn overdue_jobs_expire() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let mut details = batch_job_details("Short lived");
    details.expiration = Some(app.time().now() + 1.hour());
    let job = app.client.create_batch_job(&details).await?;

    app.time().advance(2.hours());
    app.advance_batch_jobs();
    let job = app.client.get_batch_job(&job.uuid).await?;
    assert_eq!(job.status, BatchJobStatus::Expired);

    let mut stale = batch_job_details("Already expired");
    stale.expiration = Some(app.time().now() - 1.minute());
    assert_status_code(
        app.client.create_batch_job(&stale).await,
        StatusCode::BAD_REQUEST,
    );

    Ok(())
}
