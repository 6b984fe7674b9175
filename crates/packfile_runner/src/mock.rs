//! Mock executor for testing.
//!
//! Records every call in order and can be told to fail specific
//! operations, so compiler behavior can be verified without nomad-pack.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::{RegistrySpec, ReleaseInvocation};
use crate::error::{RunnerError, RunnerResult};
use crate::executor::PackExecutor;

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedCall {
    pub method: String,
    pub registry: Option<RegistrySpec>,
    pub invocation: Option<ReleaseInvocation>,
}

#[derive(Debug, Clone)]
struct SimulatedFailure {
    method: String,
    /// Calls to `method` that succeed before the failure
    successes: usize,
    message: String,
}

/// Mock executor for testing.
#[derive(Clone, Default)]
pub struct MockExecutor {
    /// Captured calls for verification.
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Failures to simulate.
    failures: Arc<RwLock<Vec<SimulatedFailure>>>,
}

impl MockExecutor {
    /// Create a new mock executor where every call succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call to `method` ("add_registry", "plan", "render" or "run").
    pub fn simulate_failure(self, method: impl Into<String>, message: impl Into<String>) -> Self {
        self.simulate_failure_after(method, 0, message)
    }

    /// Let `successes` calls to `method` succeed, then fail the rest.
    pub fn simulate_failure_after(
        self,
        method: impl Into<String>,
        successes: usize,
        message: impl Into<String>,
    ) -> Self {
        self.failures.write().push(SimulatedFailure {
            method: method.into(),
            successes,
            message: message.into(),
        });
        self
    }

    /// Clear all captured calls.
    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Check if a specific method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.captured_calls
            .read()
            .iter()
            .any(|c| c.method == method)
    }

    /// Get calls to a specific method.
    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// Get the method names in call order.
    pub fn methods(&self) -> Vec<String> {
        self.captured_calls
            .read()
            .iter()
            .map(|c| c.method.clone())
            .collect()
    }

    /// Record a call and decide whether it fails.
    fn record_call(&self, call: CapturedCall) -> RunnerResult<()> {
        let previous = self
            .captured_calls
            .read()
            .iter()
            .filter(|c| c.method == call.method)
            .count();
        let method = call.method.clone();
        self.captured_calls.write().push(call);

        let failures = self.failures.read();
        match failures
            .iter()
            .find(|f| f.method == method && previous >= f.successes)
        {
            Some(failure) => Err(RunnerError::ExecutionFailed(failure.message.clone())),
            None => Ok(()),
        }
    }

    fn record_release(&self, method: &str, invocation: &ReleaseInvocation) -> RunnerResult<()> {
        self.record_call(CapturedCall {
            method: method.to_string(),
            registry: None,
            invocation: Some(invocation.clone()),
        })
    }
}

#[async_trait]
impl PackExecutor for MockExecutor {
    async fn add_registry(&self, registry: &RegistrySpec) -> RunnerResult<()> {
        self.record_call(CapturedCall {
            method: "add_registry".to_string(),
            registry: Some(registry.clone()),
            invocation: None,
        })
    }

    async fn plan(&self, invocation: &ReleaseInvocation) -> RunnerResult<()> {
        self.record_release("plan", invocation)
    }

    async fn render(&self, invocation: &ReleaseInvocation) -> RunnerResult<()> {
        self.record_release("render", invocation)
    }

    async fn run(&self, invocation: &ReleaseInvocation) -> RunnerResult<()> {
        self.record_release("run", invocation)
    }
}
