//! Inbox worker: dispatches verified activities to their processors.

use apalis::prelude::*;
use ghostpub_federation::activities::InboxActivity;
use ghostpub_federation::processor::Processors;
use tracing::{error, warn};

use crate::jobs::InboxJob;

/// Context for the inbox worker.
#[derive(Clone)]
pub struct InboxContext {
    pub processors: Processors,
}

impl InboxContext {
    /// Create a new inbox context.
    #[must_use]
    pub const fn new(processors: Processors) -> Self {
        Self { processors }
    }
}

/// Worker function for handling inbound activities.
///
/// # Errors
/// Returns an error when handling failed transiently, so the message is
/// redelivered.
pub async fn inbox_worker(job: InboxJob, ctx: Data<InboxContext>) -> Result<(), Error> {
    run_inbox(job, &ctx).await
}

/// Handle one job; shared by the worker and the Pub/Sub push endpoint.
///
/// # Errors
/// Returns an error when handling failed transiently, so the message is
/// redelivered.
pub async fn run_inbox(job: InboxJob, ctx: &InboxContext) -> Result<(), Error> {
    let activity: InboxActivity = match serde_json::from_value(job.activity.clone()) {
        Ok(activity) => activity,
        Err(e) => {
            // Unparsable payloads will never parse; ack them away.
            warn!(error = %e, "Dropping unparsable inbox job");
            return Ok(());
        }
    };

    match ctx.processors.dispatch(&activity).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(
                activity_type = activity.activity_type(),
                error = %e,
                "Inbox handling failed, redelivering"
            );
            Err(Error::Failed(
                Box::<dyn std::error::Error + Send + Sync>::from(e.to_string()).into(),
            ))
        }
    }
}
