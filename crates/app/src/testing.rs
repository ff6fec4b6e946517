//! In-memory fakes of the ports, shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gridcharge_domain::error::{DeviceError, GridChargeError};
use gridcharge_domain::id::JobId;
use gridcharge_domain::job::Job;

use crate::ports::{DeviceClient, DeviceConnector, JobStore};

/// Everything the fake device observed, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Connect,
    Read(u16),
    Write(u16, u16),
    Close,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<Call>,
    refuse_connect: bool,
    /// Remaining failures per register.
    failing_writes: HashMap<u16, u32>,
    registers: HashMap<u16, u16>,
}

/// Recording inverter. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct FakeDevice {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDevice {
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Only the write calls, as `(register, value)` pairs.
    pub fn writes(&self) -> Vec<(u16, u16)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Write(register, value) => Some((register, value)),
                _ => None,
            })
            .collect()
    }

    pub fn refuse_connections(&self) {
        self.state.lock().unwrap().refuse_connect = true;
    }

    /// Make the next `times` writes to `register` fail.
    pub fn fail_writes(&self, register: u16, times: u32) {
        self.state
            .lock()
            .unwrap()
            .failing_writes
            .insert(register, times);
    }

    pub fn set_register(&self, register: u16, value: u16) {
        self.state
            .lock()
            .unwrap()
            .registers
            .insert(register, value);
    }
}

impl DeviceConnector for FakeDevice {
    type Client = FakeClient;

    async fn connect(&self) -> Result<FakeClient, DeviceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Connect);
        if state.refuse_connect {
            return Err(DeviceError::Connect {
                target: "fake:502".to_string(),
                source: "connection refused".into(),
            });
        }
        Ok(FakeClient {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct FakeClient {
    state: Arc<Mutex<FakeState>>,
}

impl DeviceClient for FakeClient {
    async fn read_register(&mut self, register: u16) -> Result<u16, DeviceError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Read(register));
        state
            .registers
            .get(&register)
            .copied()
            .ok_or_else(|| DeviceError::Protocol {
                register,
                reason: "illegal data address".to_string(),
            })
    }

    async fn write_register(&mut self, register: u16, value: u16) -> Result<(), DeviceError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Write(register, value));
        if let Some(remaining) = state.failing_writes.get_mut(&register)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(DeviceError::Protocol {
                register,
                reason: "slave device failure".to_string(),
            });
        }
        state.registers.insert(register, value);
        Ok(())
    }

    async fn close(self) {
        self.state.lock().unwrap().calls.push(Call::Close);
    }
}

/// Job store backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
    fail: Arc<Mutex<bool>>,
}

impl InMemoryJobStore {
    /// Make every subsequent call fail with a storage error.
    pub fn break_storage(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    fn check(&self) -> Result<(), GridChargeError> {
        if *self.fail.lock().unwrap() {
            return Err(GridChargeError::Storage("disk full".into()));
        }
        Ok(())
    }
}

impl JobStore for InMemoryJobStore {
    async fn put(&self, job: Job) -> Result<(), GridChargeError> {
        self.check()?;
        self.jobs.lock().unwrap().insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, GridChargeError> {
        self.check()?;
        Ok(self.jobs.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Job>, GridChargeError> {
        self.check()?;
        Ok(self.jobs.lock().unwrap().values().cloned().collect())
    }

    async fn delete(&self, id: JobId) -> Result<bool, GridChargeError> {
        self.check()?;
        Ok(self.jobs.lock().unwrap().remove(&id).is_some())
    }
}
