//! Router test harness with in-memory ports.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use gridcharge_app::automation_engine::AutomationEngine;
use gridcharge_app::command_executor::{CommandExecutor, ExecutorOptions, WritePolicy};
use gridcharge_app::ports::{DeviceClient, DeviceConnector, JobStore};
use gridcharge_app::scheduler::SchedulerOptions;
use gridcharge_domain::error::{DeviceError, GridChargeError};
use gridcharge_domain::id::JobId;
use gridcharge_domain::job::Job;
use gridcharge_domain::profile::DeviceProfile;

use crate::state::AppState;

#[derive(Default)]
struct DeviceState {
    refuse: bool,
    registers: HashMap<u16, u16>,
    writes: Vec<(u16, u16)>,
}

#[derive(Clone, Default)]
pub struct StubDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl StubDevice {
    pub fn writes(&self) -> Vec<(u16, u16)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn refuse_connections(&self) {
        self.state.lock().unwrap().refuse = true;
    }

    pub fn set_register(&self, register: u16, value: u16) {
        self.state
            .lock()
            .unwrap()
            .registers
            .insert(register, value);
    }
}

impl DeviceConnector for StubDevice {
    type Client = StubDevice;

    async fn connect(&self) -> Result<StubDevice, DeviceError> {
        if self.state.lock().unwrap().refuse {
            return Err(DeviceError::Connect {
                target: "stub:502".to_string(),
                source: "connection refused".into(),
            });
        }
        Ok(self.clone())
    }
}

impl DeviceClient for StubDevice {
    async fn read_register(&mut self, register: u16) -> Result<u16, DeviceError> {
        self.state
            .lock()
            .unwrap()
            .registers
            .get(&register)
            .copied()
            .ok_or_else(|| DeviceError::Protocol {
                register,
                reason: "illegal data address".to_string(),
            })
    }

    async fn write_register(&mut self, register: u16, value: u16) -> Result<(), DeviceError> {
        let mut state = self.state.lock().unwrap();
        state.writes.push((register, value));
        state.registers.insert(register, value);
        Ok(())
    }

    async fn close(self) {}
}

#[derive(Default)]
pub struct StubJobStore {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl JobStore for StubJobStore {
    async fn put(&self, job: Job) -> Result<(), GridChargeError> {
        self.jobs.lock().unwrap().insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, GridChargeError> {
        Ok(self.jobs.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Job>, GridChargeError> {
        Ok(self.jobs.lock().unwrap().values().cloned().collect())
    }

    async fn delete(&self, id: JobId) -> Result<bool, GridChargeError> {
        Ok(self.jobs.lock().unwrap().remove(&id).is_some())
    }
}

pub struct Harness {
    pub device: StubDevice,
    router: Router,
}

impl Default for Harness {
    fn default() -> Self {
        Self::with_options(ExecutorOptions::default())
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_fast() -> Self {
        Self::with_options(ExecutorOptions {
            policy: WritePolicy::FailFast,
            ..ExecutorOptions::default()
        })
    }

    fn with_options(options: ExecutorOptions) -> Self {
        let device = StubDevice::default();
        let executor = CommandExecutor::new(device.clone(), DeviceProfile::GENERIC, options);
        let engine = AutomationEngine::new(
            StubJobStore::default(),
            executor,
            SchedulerOptions::default(),
        );
        let router = crate::router::build(AppState::new(Arc::new(engine)));
        Self { device, router }
    }

    /// Send `request` and decode the body as JSON (`Null` when it is not).
    pub async fn call(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
