//! Failure isolation for registrants.
//!
//! A handler, filter, transform or enricher that returns `Err` or panics must
//! not take the pipeline down with it. The guard turns both into a logged
//! `None` so the caller treats that registrant as a no-op.

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use crate::types::Result;

/// Pipeline stage a registrant belongs to, used as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Handler,
    Filter,
    Transform,
    Enricher,
    Command,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Handler => "handler",
            Stage::Filter => "filter",
            Stage::Transform => "transform",
            Stage::Enricher => "enricher",
            Stage::Command => "command",
        };
        f.write_str(s)
    }
}

/// Run one registrant future, containing errors and panics raised while it
/// is polled.
pub async fn guard<F, T>(stage: Stage, event_name: &str, operation: F) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(operation).catch_unwind().await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            tracing::error!(
                event_name = %event_name,
                stage = %stage,
                error = %err,
                "registrant_failed"
            );
            None
        }
        Err(payload) => {
            tracing::error!(
                event_name = %event_name,
                stage = %stage,
                panic = %panic_message(payload.as_ref()),
                "registrant_panicked"
            );
            None
        }
    }
}

/// Extract the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic (no message)".to_string()
    }
}
