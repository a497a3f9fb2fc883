use jiff::Timestamp;
use payloads::{
    BatchJobId,
    requests::CreateBatchJob,
    responses::{BatchJob, BatchJobStatus},
};
use uuid::Uuid;

use super::{State, StoreError};

impl State {
    pub fn get_batch_job(&self, id: &BatchJobId) -> Result<BatchJob, StoreError> {
        self.batch_jobs
            .iter()
            .find(|j| &j.uuid == id)
            .cloned()
            .ok_or(StoreError::NotFound("Batch job"))
    }

    pub fn create_batch_job(
        &mut self,
        details: CreateBatchJob,
        now: Timestamp,
    ) -> Result<BatchJob, StoreError> {
        if details.description.trim().is_empty() {
            return Err(StoreError::Invalid("Description is required".into()));
        }
        if details.expiration.is_some_and(|expiration| expiration <= now) {
            return Err(StoreError::Invalid(
                "Expiration must be in the future".into(),
            ));
        }
        let job = BatchJob {
            uuid: BatchJobId(Uuid::new_v4()),
            batch_job_type: details.batch_job_type,
            status: BatchJobStatus::Pending,
            description: details.description,
            parameters: details.parameters,
            records_processed: None,
            exit_message: None,
            cancel_reason: None,
            date_created: now,
            started_date: None,
            completed_date: None,
            expiration: details.expiration,
        };
        self.batch_jobs.push(job.clone());
        Ok(job)
    }

    /// Cancel every job in `ids`. Either all of them are cancelled or none.
    pub fn cancel_batch_jobs(
        &mut self,
        ids: &[BatchJobId],
        reason: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(StoreError::Invalid(
                "A cancellation reason is required".into(),
            ));
        }
        if ids.is_empty() {
            return Err(StoreError::Invalid("No batch jobs to cancel".into()));
        }
        for id in ids {
            let job = self.get_batch_job(id)?;
            if !job.status.is_cancellable() {
                return Err(StoreError::Conflict(format!(
                    "Batch job {id} is {} and cannot be cancelled",
                    job.status.as_str()
                )));
            }
        }
        for job in self.batch_jobs.iter_mut().filter(|j| ids.contains(&j.uuid)) {
            job.status = BatchJobStatus::Cancelled;
            job.cancel_reason = Some(reason.to_string());
            job.completed_date = Some(now);
        }
        Ok(())
    }

    /// Move active jobs one step along: pending jobs start, running jobs
    /// complete, and jobs past their expiration expire. Returns how many jobs
    /// changed.
    pub fn advance_batch_jobs(&mut self, now: Timestamp) -> usize {
        let mut changed = 0;
        for job in self.batch_jobs.iter_mut().filter(|j| j.status.is_active()) {
            changed += 1;
            if job.expiration.is_some_and(|expiration| expiration <= now) {
                job.status = BatchJobStatus::Expired;
                job.completed_date = Some(now);
                continue;
            }
            match job.status {
                BatchJobStatus::Pending => {
                    job.status = BatchJobStatus::Running;
                    job.started_date = Some(now);
                    job.records_processed = Some(0);
                }
                _ => {
                    job.status = BatchJobStatus::Completed;
                    job.completed_date = Some(now);
                    job.records_processed =
                        Some(job.records_processed.unwrap_or_default() + 100);
                    job.exit_message = Some("Completed successfully".into());
                }
            }
        }
        if changed > 0 {
            tracing::debug!(changed, "advanced batch jobs");
        }
        changed
    }
}
