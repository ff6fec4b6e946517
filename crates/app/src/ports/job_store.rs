//! Job store port: durable persistence for scheduled jobs.

use std::future::Future;

use gridcharge_domain::error::GridChargeError;
use gridcharge_domain::id::JobId;
use gridcharge_domain::job::Job;

/// Repository for persisting and querying [`Job`]s, keyed by id.
///
/// Implementations must survive process restarts.
pub trait JobStore {
    /// Insert or replace a job.
    fn put(&self, job: Job) -> impl Future<Output = Result<(), GridChargeError>> + Send;

    /// Get a job by its unique identifier.
    fn get(&self, id: JobId) -> impl Future<Output = Result<Option<Job>, GridChargeError>> + Send;

    /// Get all jobs, in no particular order.
    fn list(&self) -> impl Future<Output = Result<Vec<Job>, GridChargeError>> + Send;

    /// Delete a job. Returns whether a job with `id` existed.
    fn delete(&self, id: JobId) -> impl Future<Output = Result<bool, GridChargeError>> + Send;
}
