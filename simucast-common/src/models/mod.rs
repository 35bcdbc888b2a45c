// File: simucast-common/src/models/mod.rs
pub mod chat;
pub mod feed;
pub mod interaction;
pub mod progress;
pub mod results;
pub mod session;

pub use chat::ChatMessage;
pub use feed::{FeedFilter, FeedItem};
pub use interaction::{
    AnsweredInteraction, InteractionDefinition, InteractionEvent, InteractionKind,
    InteractionPhase, TriggeredInteraction,
};
pub use progress::{AnalyticsEvent, ProgressEventType, ProgressReport, SessionSummary};
pub use results::{AggregateResults, OptionTally};
pub use session::{
    AccessDecision, ChatSettings, EndScreen, PlaybackMode, PlaybackPlan, PlaybackSession,
    SessionAccess, SessionType, WebinarInfo,
};
