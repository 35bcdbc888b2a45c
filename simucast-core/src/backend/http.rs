// File: simucast-core/src/backend/http.rs
//
// HTTP client for the hosted collaborator endpoints. One client instance
// serves every seam; all calls carry the viewer's access token in the
// path and speak camelCase JSON.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use simucast_common::error::{AccessError, Error};
use simucast_common::models::chat::ChatMessage;
use simucast_common::models::interaction::InteractionEvent;
use simucast_common::models::progress::{AnalyticsEvent, ProgressReport};
use simucast_common::models::results::AggregateResults;
use simucast_common::models::session::{AccessDecision, SessionAccess};
use simucast_common::traits::{
    AccessGate, AnalyticsSink, InteractionSink, ProgressSink, ReplayChatSource, ResultsSource,
};

const USER_AGENT: &str = concat!("simucast/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 15;

pub struct HttpCollaborators {
    client: Client,
    base_url: String,
}

impl HttpCollaborators {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(HttpCollaborators {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Wire shape of the access endpoint's decision envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAccessResponse {
    status: String,
    #[serde(default)]
    session: Option<SessionAccess>,
    #[serde(default)]
    starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn decision_from_raw(raw: RawAccessResponse) -> Result<AccessDecision, Error> {
    match raw.status.as_str() {
        "GRANTED" => raw
            .session
            .map(|access| AccessDecision::Granted(Box::new(access)))
            .ok_or_else(|| Error::Session("granted access without a session payload".to_string())),
        "WAITING" => raw
            .starts_at
            .map(|starts_at| AccessDecision::Waiting { starts_at })
            .ok_or_else(|| Error::Session("waiting decision without a start time".to_string())),
        "DENIED" => {
            let code = raw.error_code.unwrap_or_default();
            Ok(AccessDecision::Denied(AccessError::from_code(
                &code,
                raw.message.as_deref(),
            )))
        }
        other => Err(Error::Parse(format!("unknown access status '{}'", other))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatWindowResponse {
    messages: Vec<ChatMessage>,
}

#[async_trait]
impl AccessGate for HttpCollaborators {
    async fn request_access(&self, token: &str) -> Result<AccessDecision, Error> {
        let url = self.endpoint("sessions/access");
        debug!("(HttpCollaborators) requesting access via {}", url);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "token": token }))
            .send()
            .await?;
        let raw: RawAccessResponse = resp.error_for_status()?.json().await?;
        decision_from_raw(raw)
    }
}

#[async_trait]
impl ProgressSink for HttpCollaborators {
    async fn report(&self, token: &str, report: &ProgressReport) -> Result<(), Error> {
        let url = self.endpoint(&format!("sessions/{}/progress", token));
        self.client
            .post(&url)
            .json(report)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl AnalyticsSink for HttpCollaborators {
    async fn track(&self, token: &str, event: &AnalyticsEvent) -> Result<(), Error> {
        let url = self.endpoint(&format!("sessions/{}/analytics", token));
        self.client
            .post(&url)
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl InteractionSink for HttpCollaborators {
    async fn submit(
        &self,
        token: &str,
        interaction_id: Uuid,
        event: &InteractionEvent,
    ) -> Result<(), Error> {
        let url = self.endpoint(&format!(
            "sessions/{}/interactions/{}/events",
            token, interaction_id
        ));
        self.client
            .post(&url)
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl ResultsSource for HttpCollaborators {
    async fn fetch_results(
        &self,
        token: &str,
        interaction_id: Uuid,
    ) -> Result<AggregateResults, Error> {
        let url = self.endpoint(&format!(
            "sessions/{}/interactions/{}/results",
            token, interaction_id
        ));
        let results = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(results)
    }
}

#[async_trait]
impl ReplayChatSource for HttpCollaborators {
    async fn fetch_window(
        &self,
        token: &str,
        from: u32,
        to: u32,
    ) -> Result<Vec<ChatMessage>, Error> {
        let url = self.endpoint(&format!("sessions/{}/chat", token));
        let resp: ChatWindowResponse = self
            .client
            .get(&url)
            .query(&[("from", from), ("to", to)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::from_value;

    #[test]
    fn test_granted_envelope_maps_to_session_payload() {
        let raw: RawAccessResponse = from_value(json!({
            "status": "GRANTED",
            "session": {
                "webinar": {
                    "webinarId": "1f0a0000-0000-0000-0000-000000000001",
                    "title": "Scaling 101",
                    "videoDuration": 1800.0
                },
                "playback": {
                    "sessionType": "SCHEDULED",
                    "mode": "simulated_live",
                    "allowSeeking": false,
                    "sessionStart": "2026-08-25T15:00:00Z",
                    "startPosition": 0.0
                },
                "interactions": [],
                "chat": { "enabled": true, "displayName": "Sam" }
            }
        }))
        .unwrap();

        match decision_from_raw(raw).unwrap() {
            AccessDecision::Granted(access) => {
                assert_eq!(access.webinar.title, "Scaling 101");
                assert!(!access.playback.allow_seeking);
                assert!(access.end_screen.is_none());
            }
            other => panic!("expected granted, got {:?}", other),
        }
    }

    #[test]
    fn test_waiting_envelope_carries_start_time() {
        let raw: RawAccessResponse = from_value(json!({
            "status": "WAITING",
            "startsAt": "2026-08-25T15:00:00Z"
        }))
        .unwrap();

        match decision_from_raw(raw).unwrap() {
            AccessDecision::Waiting { starts_at } => {
                assert_eq!(starts_at.to_rfc3339(), "2026-08-25T15:00:00+00:00");
            }
            other => panic!("expected waiting, got {:?}", other),
        }
    }

    #[test]
    fn test_denied_envelope_maps_error_codes() {
        let raw: RawAccessResponse = from_value(json!({
            "status": "DENIED",
            "errorCode": "replay_expired"
        }))
        .unwrap();
        match decision_from_raw(raw).unwrap() {
            AccessDecision::Denied(err) => {
                assert_eq!(err, AccessError::ReplayExpired);
                assert!(!err.retryable());
            }
            other => panic!("expected denied, got {:?}", other),
        }

        let raw: RawAccessResponse = from_value(json!({
            "status": "DENIED",
            "errorCode": "session_ended"
        }))
        .unwrap();
        match decision_from_raw(raw).unwrap() {
            AccessDecision::Denied(err) => {
                assert_eq!(err, AccessError::SessionEnded);
                assert!(err.retryable(), "an ended session may come back as a replay");
            }
            other => panic!("expected denied, got {:?}", other),
        }

        let raw: RawAccessResponse = from_value(json!({
            "status": "DENIED",
            "errorCode": "unknown_registrant",
            "message": "no registration found for this email"
        }))
        .unwrap();
        match decision_from_raw(raw).unwrap() {
            AccessDecision::Denied(AccessError::Denied(detail)) => {
                assert_eq!(detail, "no registration found for this email");
            }
            other => panic!("expected generic denial, got {:?}", other),
        }
    }

    #[test]
    fn test_granted_without_session_is_an_error() {
        let raw: RawAccessResponse = from_value(json!({ "status": "GRANTED" })).unwrap();
        assert!(decision_from_raw(raw).is_err());
    }
}
