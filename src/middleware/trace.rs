use std::time::Instant;

use tracing::{info, warn};

use crate::chain::Next;
use crate::event::Context;
use crate::handler::Outcome;
use crate::request::Request;

/// Logs method, path, status, and latency of every request passing through.
pub async fn trace(req: Request, ctx: Context, next: Next) -> Outcome {
    let method = req.method().clone();
    let path = req.path().to_owned();
    let start = Instant::now();

    let outcome = next.run(req).await;
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match &outcome {
        Ok(Some(res)) => info!(
            request_id = %ctx.request_id, %method, %path, status = res.status_code(), latency_ms,
            "request"
        ),
        Ok(None) => warn!(request_id = %ctx.request_id, %method, %path, latency_ms, "no response"),
        Err(fault) => warn!(
            request_id = %ctx.request_id, %method, %path, latency_ms, error = %fault,
            "request failed"
        ),
    }
    outcome
}
