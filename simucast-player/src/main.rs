// simucast-player/src/main.rs
//
// Headless viewer for demos and soak runs. Wires a full session against
// the in-memory backend and channel hub, drives the scripted media clock
// in real time, and plays back every engine event as a log line. The
// viewer behaves like a cooperative human: it chats, answers polls, and
// dismisses blocking overlays after a short pause.

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

use simucast_common::models::chat::ChatMessage;
use simucast_common::models::interaction::{
    InteractionDefinition, InteractionKind, PauseConfig, PollConfig, TipConfig,
};
use simucast_common::models::session::{
    AccessDecision, ChatSettings, EndScreen, PlaybackMode, PlaybackPlan, SessionAccess,
    SessionType, WebinarInfo,
};
use simucast_common::traits::AccessGate;
use simucast_core::backend::{MemoryAccessGate, MemoryBackend};
use simucast_core::channel::{InMemoryChannel, InMemoryChannelHub};
use simucast_core::playback::scripted_media;
use simucast_core::session::ViewerSession;
use simucast_core::{EngineConfig, SessionEvent};

#[derive(Parser, Debug, Clone)]
#[command(name = "simucast-player")]
#[command(author, version, about = "Headless simucast viewer for demos and soak runs")]
struct Args {
    /// Viewer access token (any string will do against the demo backend)
    #[arg(long, default_value = "demo-token")]
    token: String,

    /// Length of the scripted recording, in seconds
    #[arg(long, default_value = "90.0")]
    duration: f64,

    /// Seconds since the scheduled start. Positive joins late onto the
    /// live edge; negative holds the viewer in the waiting room first.
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    start_offset: i64,

    /// Playback seconds advanced per wall-clock second
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Name this viewer's chat messages are published under
    #[arg(long, default_value = "demo-viewer")]
    display_name: String,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("simucast_core=info".parse().unwrap_or_default())
        .add_directive("simucast_player=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

fn demo_access(args: &Args) -> SessionAccess {
    SessionAccess {
        webinar: WebinarInfo {
            webinar_id: Uuid::new_v4(),
            title: "Simucast demo briefing".to_string(),
            video_duration: args.duration,
        },
        playback: PlaybackPlan {
            session_type: SessionType::Scheduled,
            mode: PlaybackMode::SimulatedLive,
            allow_seeking: false,
            session_start: Some(
                chrono::Utc::now() - chrono::Duration::seconds(args.start_offset),
            ),
            start_position: 0.0,
            last_position: None,
        },
        interactions: vec![
            InteractionDefinition {
                id: Uuid::new_v4(),
                title: "Quick tip".to_string(),
                kind: InteractionKind::Tip(TipConfig {
                    text: "Questions go in the chat".to_string(),
                }),
                trigger_time: 8,
                duration_seconds: Some(15),
            },
            InteractionDefinition {
                id: Uuid::new_v4(),
                title: "Which runtime do you deploy on?".to_string(),
                kind: InteractionKind::Poll(PollConfig {
                    options: vec![
                        "Kubernetes".to_string(),
                        "Bare VMs".to_string(),
                        "Serverless".to_string(),
                    ],
                }),
                trigger_time: 20,
                duration_seconds: Some(30),
            },
            InteractionDefinition {
                id: Uuid::new_v4(),
                title: "Stretch break".to_string(),
                kind: InteractionKind::Pause(PauseConfig {
                    message: Some("Back in a moment".to_string()),
                }),
                trigger_time: 40,
                duration_seconds: Some(20),
            },
        ],
        chat: ChatSettings {
            enabled: true,
            display_name: Some(args.display_name.clone()),
        },
        end_screen: Some(EndScreen {
            headline: "Thanks for attending".to_string(),
            button_label: Some("Get the slides".to_string()),
            url: Some("https://example.com/slides".to_string()),
        }),
    }
}

fn demo_transcript() -> Vec<ChatMessage> {
    vec![
        ChatMessage::simulated("t-01", "Host", "Welcome! We start in a moment.", 2),
        ChatMessage::simulated("t-02", "Host", "Links from the session land here.", 12),
        ChatMessage::simulated("t-03", "Maya", "Audio is great, thanks.", 18),
        ChatMessage::simulated("t-04", "Host", "Poll is up, vote away.", 22),
        ChatMessage::simulated("t-05", "Jonas", "Voted!", 27),
    ]
}

const AUDIENCE_LINES: [(&str, &str); 4] = [
    ("Priya", "hello from the night shift"),
    ("Sam", "will the slides be shared afterwards?"),
    ("Maya", "this matches what we see in prod"),
    ("Jonas", "good question above"),
];

/// Simulates the rest of the room: a scripted line lands in the hub every
/// few seconds until the session shuts down.
fn spawn_audience_task(
    hub: Arc<InMemoryChannelHub>,
    webinar_id: Uuid,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut n = 0usize;
        let mut interval = tokio::time::interval(Duration::from_secs(7));
        loop {
            tokio::select! {
                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    let (sender, text) = AUDIENCE_LINES[n % AUDIENCE_LINES.len()];
                    n += 1;
                    hub.broadcast(webinar_id, ChatMessage::live(format!("aud-{n}"), sender, text))
                        .await;
                }
            }
        }
    })
}

fn handle_session_event(session: &Arc<ViewerSession>, event: SessionEvent) {
    match event {
        SessionEvent::GateWaiting { remaining_secs } => {
            info!("waiting room: {}s until the doors open", remaining_secs);
        }
        SessionEvent::GateAdmitted => info!("admitted, starting playback"),
        SessionEvent::PlaybackStarted { position } => {
            info!("playback started at {:.1}s", position);
            let s = session.clone();
            tokio::spawn(async move {
                sleep(Duration::from_secs(5)).await;
                s.send_chat("Hello from the headless viewer").await;
            });
        }
        SessionEvent::PlaybackTime { position, .. } => debug!("t={:.1}s", position),
        SessionEvent::PlaybackHeld { title } => info!("playback held by '{}'", title),
        SessionEvent::PlaybackReleased => info!("playback resumed"),
        SessionEvent::PlaybackEnded => info!("playback reached the end"),
        SessionEvent::PlaybackFatal { message } => {
            error!("playback failed for good: {}", message);
            let s = session.clone();
            tokio::spawn(async move {
                s.shutdown().await;
            });
        }
        SessionEvent::InteractionTriggered(def) => {
            info!("interaction up: '{}' ({})", def.title, def.kind.type_name());
            if def.kind.aggregates_results() {
                let s = session.clone();
                let id = def.id;
                tokio::spawn(async move {
                    sleep(Duration::from_secs(2)).await;
                    s.answer(id, json!({ "optionIndex": 0 })).await;
                });
            } else if def.kind.pauses_playback() {
                let s = session.clone();
                let id = def.id;
                tokio::spawn(async move {
                    sleep(Duration::from_secs(3)).await;
                    s.dismiss(id).await;
                });
            }
        }
        SessionEvent::ActiveInteractions(active) => {
            debug!("{} overlay(s) active", active.len());
        }
        SessionEvent::FeedUpdated { visible } => debug!("feed now shows {} item(s)", visible),
        SessionEvent::ChannelStatusChanged(status) => info!("realtime channel is {}", status),
        SessionEvent::ResultsUpdated(snapshot) => {
            if let Some(results) = &snapshot.results {
                info!(
                    "poll results: {} response(s) so far{}",
                    results.total_responses,
                    if snapshot.is_stale() { " (stale)" } else { "" }
                );
            }
        }
        SessionEvent::EndScreenShown(screen) => {
            info!("end screen: {}", screen.headline);
            let s = session.clone();
            tokio::spawn(async move {
                s.end_screen_clicked().await;
                sleep(Duration::from_secs(1)).await;
                s.shutdown().await;
            });
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!(
        "simucast player starting. duration={}s, start_offset={}s, speed={}x",
        args.duration, args.start_offset, args.speed
    );

    let access = demo_access(&args);
    let webinar_id = access.webinar.webinar_id;
    let poll_id = access
        .interactions
        .iter()
        .find(|d| d.kind.aggregates_results())
        .map(|d| d.id);

    let backend = Arc::new(MemoryBackend::new().with_transcript(demo_transcript()));
    if let Some(id) = poll_id {
        backend.seed_tally(id, vec![("Kubernetes", 14), ("Bare VMs", 5), ("Serverless", 8)]);
    }

    let gate = MemoryAccessGate::new(AccessDecision::Granted(Box::new(access)));
    let access = match gate.request_access(&args.token).await? {
        AccessDecision::Granted(access) => *access,
        AccessDecision::Waiting { starts_at } => {
            info!("session not open yet, come back at {}", starts_at);
            return Ok(());
        }
        AccessDecision::Denied(e) => {
            error!("access denied: {}", e);
            return Ok(());
        }
    };

    let hub = Arc::new(InMemoryChannelHub::new());
    let channel = InMemoryChannel::new(hub.clone(), webinar_id);
    let (media, media_handle) = scripted_media(access.webinar.video_duration);

    let session = Arc::new(ViewerSession::launch(
        &args.token,
        access,
        Box::new(media),
        Some(Box::new(channel)),
        MemoryBackend::collaborators(&backend),
        EngineConfig::default(),
    ));
    let mut events = session.subscribe().await;
    let mut shutdown_watch = session.bus().shutdown_rx.clone();

    let ticker =
        media_handle.spawn_ticker(Duration::from_millis(250), args.speed, shutdown_watch.clone());
    let audience = spawn_audience_task(hub, webinar_id, shutdown_watch.clone());

    let ctrl_session = session.clone();
    let _ctrlc_handle = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {:?}", e);
            return;
        }
        info!("Ctrl-C detected; shutting down the session...");
        ctrl_session.shutdown().await;
    });

    loop {
        tokio::select! {
            Ok(_) = shutdown_watch.changed() => {
                if *shutdown_watch.borrow() {
                    break;
                }
            }
            maybe_event = events.recv() => {
                match maybe_event {
                    Some(event) => handle_session_event(&session, event),
                    None => break,
                }
            }
        }
    }

    let _ = ticker.await;
    let _ = audience.await;
    info!(
        "session over: {} progress report(s), {} analytics event(s), {} interaction event(s) recorded",
        backend.progress_reports().len(),
        backend.analytics_events().len(),
        backend.interaction_events().len()
    );
    Ok(())
}
