//! Nullable dispatcher that records outbound calls instead of making them.

use agora_governance::{DispatchError, Dispatcher};
use agora_types::Principal;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A call the governor attempted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchedCall {
    pub target: Principal,
    pub method: String,
    pub args: Vec<u8>,
}

/// Records every call. Succeeds with an empty reply unless failures were
/// queued with [`NullDispatcher::fail_next`].
#[derive(Debug, Default)]
pub struct NullDispatcher {
    calls: Mutex<Vec<DispatchedCall>>,
    failures: Mutex<VecDeque<String>>,
}

impl NullDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail as unreachable with `reason`.
    pub fn fail_next(&self, reason: impl Into<String>) {
        self.failures.lock().unwrap().push_back(reason.into());
    }

    pub fn calls(&self) -> Vec<DispatchedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Dispatcher for NullDispatcher {
    async fn call(
        &self,
        target: &Principal,
        method: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, DispatchError> {
        self.calls.lock().unwrap().push(DispatchedCall {
            target: *target,
            method: method.to_string(),
            args: args.to_vec(),
        });
        match self.failures.lock().unwrap().pop_front() {
            Some(reason) => Err(DispatchError::Unreachable(reason)),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_and_queued_failures() {
        let dispatcher = NullDispatcher::new();
        let target = Principal::new([4; 32]);
        dispatcher.fail_next("down");

        assert!(dispatcher.call(&target, "greet", &[1]).await.is_err());
        assert!(dispatcher.call(&target, "greet", &[2]).await.is_ok());
        assert_eq!(dispatcher.call_count(), 2);
        assert_eq!(dispatcher.calls()[1].args, vec![2]);
    }
}
