// File: simucast-core/src/tasks/reporting.rs
//
// Fire-and-forget delivery to the reporting endpoints. A failed send is
// logged and dropped; the next heartbeat or event supersedes it, and
// nothing here may stall or kill the session loop.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::error;
use uuid::Uuid;

use simucast_common::models::interaction::InteractionEvent;
use simucast_common::models::progress::{AnalyticsEvent, ProgressReport};
use simucast_common::traits::{AnalyticsSink, InteractionSink, ProgressSink};

pub fn spawn_progress_send(
    sink: Arc<dyn ProgressSink>,
    token: String,
    report: ProgressReport,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = sink.report(&token, &report).await {
            error!(
                "(Reporting) progress send failed at {:.1}s: {:?}",
                report.position, e
            );
        }
    })
}

pub fn spawn_analytics_send(
    sink: Arc<dyn AnalyticsSink>,
    token: String,
    event: AnalyticsEvent,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = sink.track(&token, &event).await {
            error!(
                "(Reporting) analytics send '{}' failed: {:?}",
                event.event_name(),
                e
            );
        }
    })
}

pub fn spawn_interaction_send(
    sink: Arc<dyn InteractionSink>,
    token: String,
    interaction_id: Uuid,
    event: InteractionEvent,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = sink.submit(&token, interaction_id, &event).await {
            error!(
                "(Reporting) interaction event '{}' for {} failed: {:?}",
                event.event_name(),
                interaction_id,
                e
            );
        }
    })
}
