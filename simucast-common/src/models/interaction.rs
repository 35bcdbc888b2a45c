// File: simucast-common/src/models/interaction.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// What an interaction is, together with its kind-specific configuration.
/// On the wire this is adjacently tagged: `"type": "POLL"` next to a
/// `"config"` object.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "config", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionKind {
    Poll(PollConfig),
    Quiz(QuizConfig),
    Cta(CtaConfig),
    Feedback(FeedbackConfig),
    Question(QuestionConfig),
    Tip(TipConfig),
    Download(DownloadConfig),
    Pause(PauseConfig),
    SpecialOffer(SpecialOfferConfig),
    ContactForm(ContactFormConfig),
}

impl InteractionKind {
    /// Wire name of the kind, as used by the interaction-response endpoint.
    pub fn type_name(&self) -> &'static str {
        match self {
            InteractionKind::Poll(_) => "POLL",
            InteractionKind::Quiz(_) => "QUIZ",
            InteractionKind::Cta(_) => "CTA",
            InteractionKind::Feedback(_) => "FEEDBACK",
            InteractionKind::Question(_) => "QUESTION",
            InteractionKind::Tip(_) => "TIP",
            InteractionKind::Download(_) => "DOWNLOAD",
            InteractionKind::Pause(_) => "PAUSE",
            InteractionKind::SpecialOffer(_) => "SPECIAL_OFFER",
            InteractionKind::ContactForm(_) => "CONTACT_FORM",
        }
    }

    /// Kinds whose answers feed a shared tally that viewers can watch.
    pub fn aggregates_results(&self) -> bool {
        matches!(self, InteractionKind::Poll(_) | InteractionKind::Quiz(_))
    }

    /// Kinds that halt playback while their overlay is up.
    pub fn pauses_playback(&self) -> bool {
        matches!(self, InteractionKind::Pause(_))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PollConfig {
    pub options: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuizConfig {
    pub options: Vec<String>,
    /// Which option is right, when the webinar owner marked one.
    #[serde(default)]
    pub correct_index: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CtaConfig {
    pub button_label: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackConfig {
    pub prompt: String,
    #[serde(default = "FeedbackConfig::default_max_rating")]
    pub max_rating: u8,
}

impl FeedbackConfig {
    fn default_max_rating() -> u8 {
        5
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        FeedbackConfig { prompt: String::new(), max_rating: 5 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuestionConfig {
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TipConfig {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DownloadConfig {
    pub file_url: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PauseConfig {
    /// Shown on the overlay while playback is held.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SpecialOfferConfig {
    pub headline: String,
    pub url: String,
    #[serde(default)]
    pub expires_after_secs: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContactFormConfig {
    /// Field names the form collects, in display order.
    pub fields: Vec<String>,
}

/// One timed interaction from the webinar definition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InteractionDefinition {
    pub id: Uuid,
    pub title: String,
    #[serde(flatten)]
    pub kind: InteractionKind,
    /// Seconds from session start at which the overlay appears.
    pub trigger_time: u32,
    /// Length of the active window; engine default applies when absent.
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

impl InteractionDefinition {
    pub fn window_seconds(&self, default_duration: u32) -> u32 {
        self.duration_seconds.unwrap_or(default_duration)
    }

    /// Timeline second at which the active window closes.
    pub fn expires_at(&self, default_duration: u32) -> u32 {
        self.trigger_time
            .saturating_add(self.window_seconds(default_duration))
    }
}

/// Where an interaction stands on this viewer's timeline.
///
/// `Pending` covers both "not yet triggered" and "window passed without a
/// response"; only dismiss and answer are terminal states the viewer put
/// it in.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum InteractionPhase {
    Pending,
    Active,
    Dismissed,
    Answered,
}

/// A recorded answer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredInteraction {
    pub interaction_id: Uuid,
    pub response: Value,
    pub answered_at: DateTime<Utc>,
}

/// A triggered interaction as it appears in the combined feed: the
/// definition plus everything this viewer did with it.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredInteraction {
    pub definition: InteractionDefinition,
    pub phase: InteractionPhase,
    /// Observed second at which it first triggered. Can run later than the
    /// nominal offset when the viewer joined mid-session.
    pub triggered_at_second: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
}

/// Viewer actions reported to the interaction-response endpoint.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "eventType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionEvent {
    Viewed,
    Dismissed,
    Answered { response: Value },
}

impl InteractionEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            InteractionEvent::Viewed => "VIEWED",
            InteractionEvent::Dismissed => "DISMISSED",
            InteractionEvent::Answered { .. } => "ANSWERED",
        }
    }
}
