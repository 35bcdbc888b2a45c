// File: simucast-core/src/feed/history.rs

/// Tracks the advancing window over the scripted transcript. The session
/// fetches `(last_fetched, current]` as playback progresses, one request
/// in flight at a time, so the full transcript is never loaded up front.
#[derive(Debug)]
pub struct HistoryCursor {
    last_fetched_second: u32,
    in_flight: bool,
}

impl HistoryCursor {
    pub fn new() -> Self {
        HistoryCursor { last_fetched_second: 0, in_flight: false }
    }

    /// The next window to fetch, if playback has moved past the cursor and
    /// nothing is already in flight. Marks the window as in flight.
    pub fn next_window(&mut self, current_second: u32) -> Option<(u32, u32)> {
        if self.in_flight || current_second <= self.last_fetched_second {
            return None;
        }
        self.in_flight = true;
        Some((self.last_fetched_second, current_second))
    }

    /// A window fetch came back; the cursor advances to its upper bound.
    pub fn complete(&mut self, to: u32) {
        self.last_fetched_second = self.last_fetched_second.max(to);
        self.in_flight = false;
    }

    /// A window fetch failed; the same range becomes eligible again.
    pub fn abandon(&mut self) {
        self.in_flight = false;
    }

    pub fn last_fetched_second(&self) -> u32 {
        self.last_fetched_second
    }
}

impl Default for HistoryCursor {
    fn default() -> Self {
        Self::new()
    }
}
