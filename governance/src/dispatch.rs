//! Execution dispatch.
//!
//! Executing a proposal performs exactly one call. Calls addressed to the
//! governor itself are resolved locally: `updateSystemParams` is decoded and
//! handed back together with an [`ExecutionGrant`], the only value that
//! unlocks [`crate::ParamsRegistry::apply`]. Every other target goes through
//! the external [`Dispatcher`]. Nothing here retries.

use crate::error::DispatchError;
use crate::proposal::ProposalPayload;
use agora_types::{Principal, SystemParamsUpdate};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Method name of the governor's own parameter update entry point.
pub const UPDATE_SYSTEM_PARAMS_METHOD: &str = "updateSystemParams";

/// Outbound single-shot call to an external service.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Call `method` on `target` with opaque `args`, returning the raw reply.
    async fn call(
        &self,
        target: &Principal,
        method: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, DispatchError>;
}

/// Proof that a proposal's execution is writing to the parameter registry.
///
/// Not `Clone`, and only constructible inside this crate.
#[derive(Debug)]
pub struct ExecutionGrant {
    proposal_id: u64,
}

impl ExecutionGrant {
    pub(crate) fn for_proposal(proposal_id: u64) -> Self {
        Self { proposal_id }
    }

    pub fn proposal_id(&self) -> u64 {
        self.proposal_id
    }
}

/// Where a payload goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// Self-targeted parameter update.
    Registry(SystemParamsUpdate),
    /// Any other service.
    External,
}

/// Result of a successful dispatch, applied by the engine on commit.
#[derive(Debug)]
pub enum Effect {
    ParamsUpdate {
        update: SystemParamsUpdate,
        grant: ExecutionGrant,
    },
    External {
        reply: Vec<u8>,
    },
}

/// Classify `payload` relative to the governor's own principal.
pub fn route(payload: &ProposalPayload, governor_id: &Principal) -> Result<Route, DispatchError> {
    if payload.target != *governor_id {
        return Ok(Route::External);
    }
    if payload.method != UPDATE_SYSTEM_PARAMS_METHOD {
        return Err(DispatchError::UnsupportedMethod(payload.method.clone()));
    }
    decode_params_update(&payload.args).map(Route::Registry)
}

/// Argument encoding for `updateSystemParams` payloads.
pub fn encode_params_update(update: &SystemParamsUpdate) -> Result<Vec<u8>, DispatchError> {
    bincode::serialize(update).map_err(|e| DispatchError::InvalidArguments(e.to_string()))
}

pub fn decode_params_update(args: &[u8]) -> Result<SystemParamsUpdate, DispatchError> {
    bincode::deserialize(args).map_err(|e| DispatchError::InvalidArguments(e.to_string()))
}

/// The one path from an executing proposal to its side effect.
#[derive(Clone)]
pub struct ExecutionDispatcher {
    governor_id: Principal,
    external: Arc<dyn Dispatcher>,
}

impl ExecutionDispatcher {
    pub fn new(governor_id: Principal, external: Arc<dyn Dispatcher>) -> Self {
        Self {
            governor_id,
            external,
        }
    }

    pub fn governor_id(&self) -> &Principal {
        &self.governor_id
    }

    pub async fn dispatch(
        &self,
        proposal_id: u64,
        payload: &ProposalPayload,
    ) -> Result<Effect, DispatchError> {
        match route(payload, &self.governor_id)? {
            Route::Registry(update) => {
                debug!(proposal_id, "resolving self-targeted parameter update");
                Ok(Effect::ParamsUpdate {
                    update,
                    grant: ExecutionGrant::for_proposal(proposal_id),
                })
            }
            Route::External => {
                debug!(
                    proposal_id,
                    target = %payload.target,
                    method = %payload.method,
                    "dispatching external call"
                );
                let reply = self
                    .external
                    .call(&payload.target, &payload.method, &payload.args)
                    .await?;
                Ok(Effect::External { reply })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        calls: Mutex<Vec<(Principal, String)>>,
    }

    #[async_trait]
    impl Dispatcher for Recorder {
        async fn call(
            &self,
            target: &Principal,
            method: &str,
            _args: &[u8],
        ) -> Result<Vec<u8>, DispatchError> {
            self.calls.lock().unwrap().push((*target, method.to_string()));
            Ok(b"ok".to_vec())
        }
    }

    fn governor() -> Principal {
        Principal::new([0xaa; 32])
    }

    fn payload(target: Principal, method: &str, args: Vec<u8>) -> ProposalPayload {
        ProposalPayload {
            target,
            method: method.into(),
            args,
        }
    }

    #[test]
    fn self_targeted_update_routes_to_registry() {
        let update = SystemParamsUpdate {
            proposal_threshold: Some(5),
            ..Default::default()
        };
        let args = encode_params_update(&update).unwrap();
        let route = route(&payload(governor(), UPDATE_SYSTEM_PARAMS_METHOD, args), &governor());
        assert_eq!(route.unwrap(), Route::Registry(update));
    }

    #[test]
    fn unknown_self_method_is_rejected() {
        let err = route(&payload(governor(), "transfer", vec![]), &governor()).unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedMethod(m) if m == "transfer"));
    }

    #[test]
    fn garbage_update_args_are_rejected() {
        let err = route(
            &payload(governor(), UPDATE_SYSTEM_PARAMS_METHOD, vec![0xff; 3]),
            &governor(),
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn external_payload_calls_dispatcher_once() {
        let recorder = Arc::new(Recorder {
            calls: Mutex::new(Vec::new()),
        });
        let dispatcher = ExecutionDispatcher::new(governor(), recorder.clone());
        let target = Principal::new([3; 32]);
        let effect = dispatcher
            .dispatch(4, &payload(target, "greet", vec![1]))
            .await
            .unwrap();
        assert!(matches!(effect, Effect::External { reply } if reply == b"ok"));
        assert_eq!(
            recorder.calls.lock().unwrap().as_slice(),
            &[(target, "greet".to_string())]
        );
    }

    #[tokio::test]
    async fn registry_route_mints_grant_for_the_proposal() {
        let recorder = Arc::new(Recorder {
            calls: Mutex::new(Vec::new()),
        });
        let dispatcher = ExecutionDispatcher::new(governor(), recorder.clone());
        let args = encode_params_update(&SystemParamsUpdate::default()).unwrap();
        let effect = dispatcher
            .dispatch(9, &payload(governor(), UPDATE_SYSTEM_PARAMS_METHOD, args))
            .await
            .unwrap();
        match effect {
            Effect::ParamsUpdate { grant, .. } => assert_eq!(grant.proposal_id(), 9),
            other => panic!("unexpected effect {other:?}"),
        }
        assert!(recorder.calls.lock().unwrap().is_empty());
    }
}
