// File: simucast-core/src/tasks/mod.rs

pub mod channel_reader;
pub mod chat_window;
pub mod reporting;
pub mod results_poller;

pub use channel_reader::spawn_channel_reader_task;
pub use chat_window::spawn_chat_window_task;
pub use reporting::{spawn_analytics_send, spawn_interaction_send, spawn_progress_send};
pub use results_poller::spawn_results_poller_task;
