// File: simucast-core/src/interactions/scheduler.rs
//
// Pure timeline state machine for the session's interactions. It consumes
// playback time observations and viewer actions; it owns no clocks and
// performs no I/O, so every property here is testable with plain calls.
//
// Invariants it maintains:
//   - triggering is monotonic: once an interaction has fired it never
//     reverts to untriggered, no matter where the playhead goes;
//   - an interaction is active while the playhead sits inside its window
//     and the viewer has neither dismissed nor answered it;
//   - dismiss and answer are terminal, and answer records the first
//     submission only.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use simucast_common::models::interaction::{
    AnsweredInteraction, InteractionDefinition, InteractionPhase, TriggeredInteraction,
};

#[derive(Debug, Default, Clone)]
struct RuntimeEntry {
    triggered_at: Option<u32>,
    dismissed: bool,
    answered: Option<AnsweredInteraction>,
}

pub struct InteractionScheduler {
    /// Sorted by trigger time; the order of `all_triggered` follows it.
    definitions: Vec<InteractionDefinition>,
    entries: HashMap<Uuid, RuntimeEntry>,
    default_duration: u32,
    /// Latest observed playback second. Moves backwards on seeks.
    last_second: u32,
}

impl InteractionScheduler {
    pub fn new(mut definitions: Vec<InteractionDefinition>, default_duration: u32) -> Self {
        definitions.sort_by_key(|d| (d.trigger_time, d.id));
        InteractionScheduler {
            definitions,
            entries: HashMap::new(),
            default_duration,
            last_second: 0,
        }
    }

    /// Feeds a playback position; returns the definitions this observation
    /// newly triggered, in timeline order.
    pub fn observe_time(&mut self, position: f64) -> Vec<InteractionDefinition> {
        self.observe_second(position.max(0.0).floor() as u32)
    }

    /// Whole-second variant of `observe_time`. Sparse observations still
    /// trigger everything whose offset has been passed; the recorded
    /// trigger moment is the observed second, which can run late.
    pub fn observe_second(&mut self, second: u32) -> Vec<InteractionDefinition> {
        self.last_second = second;
        let mut newly = Vec::new();
        for def in &self.definitions {
            if def.trigger_time > second {
                break;
            }
            let entry = self.entries.entry(def.id).or_default();
            if entry.triggered_at.is_none() {
                entry.triggered_at = Some(second);
                newly.push(def.clone());
            }
        }
        newly
    }

    /// Dismisses an active interaction. Meaningful only while active;
    /// returns false (and changes nothing) before the trigger, after the
    /// window, or once answered.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        if !self.is_active(id) {
            return false;
        }
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.dismissed = true;
            return true;
        }
        false
    }

    /// Records an answer for a triggered interaction, active or already
    /// past its window. The first answer wins; later submissions and
    /// answers for dismissed or untriggered interactions are ignored.
    pub fn mark_answered(&mut self, id: Uuid, response: Value, answered_at: DateTime<Utc>) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        if entry.triggered_at.is_none() || entry.dismissed || entry.answered.is_some() {
            return false;
        }
        entry.answered = Some(AnsweredInteraction {
            interaction_id: id,
            response,
            answered_at,
        });
        true
    }

    pub fn is_active(&self, id: Uuid) -> bool {
        self.active().iter().any(|d| d.id == id)
    }

    /// The currently-active set: triggered, playhead inside the window,
    /// not dismissed, not answered.
    pub fn active(&self) -> Vec<InteractionDefinition> {
        self.definitions
            .iter()
            .filter(|def| {
                let Some(entry) = self.entries.get(&def.id) else {
                    return false;
                };
                entry.triggered_at.is_some()
                    && !entry.dismissed
                    && entry.answered.is_none()
                    && self.last_second >= def.trigger_time
                    && self.last_second < def.expires_at(self.default_duration)
            })
            .cloned()
            .collect()
    }

    pub fn phase(&self, id: Uuid) -> Option<InteractionPhase> {
        let def = self.definitions.iter().find(|d| d.id == id)?;
        Some(self.phase_of(def))
    }

    fn phase_of(&self, def: &InteractionDefinition) -> InteractionPhase {
        let Some(entry) = self.entries.get(&def.id) else {
            return InteractionPhase::Pending;
        };
        if entry.answered.is_some() {
            InteractionPhase::Answered
        } else if entry.dismissed {
            InteractionPhase::Dismissed
        } else if entry.triggered_at.is_some()
            && self.last_second >= def.trigger_time
            && self.last_second < def.expires_at(self.default_duration)
        {
            InteractionPhase::Active
        } else {
            InteractionPhase::Pending
        }
    }

    pub fn answered(&self, id: Uuid) -> Option<&AnsweredInteraction> {
        self.entries.get(&id).and_then(|e| e.answered.as_ref())
    }

    pub fn definition(&self, id: Uuid) -> Option<&InteractionDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Everything that has ever triggered, in timeline order, each carrying
    /// its current phase and any recorded answer. This is the interaction
    /// half of the combined feed.
    pub fn all_triggered(&self) -> Vec<TriggeredInteraction> {
        self.definitions
            .iter()
            .filter_map(|def| {
                let entry = self.entries.get(&def.id)?;
                let triggered_at_second = entry.triggered_at?;
                Some(TriggeredInteraction {
                    definition: def.clone(),
                    phase: self.phase_of(def),
                    triggered_at_second,
                    response: entry.answered.as_ref().map(|a| a.response.clone()),
                    answered_at: entry.answered.as_ref().map(|a| a.answered_at),
                })
            })
            .collect()
    }

    pub fn last_second(&self) -> u32 {
        self.last_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use simucast_common::models::interaction::{InteractionKind, PollConfig, TipConfig};

    fn poll_at(trigger_time: u32, duration: Option<u32>) -> InteractionDefinition {
        InteractionDefinition {
            id: Uuid::new_v4(),
            title: format!("poll@{trigger_time}"),
            kind: InteractionKind::Poll(PollConfig {
                options: vec!["a".into(), "b".into()],
            }),
            trigger_time,
            duration_seconds: duration,
        }
    }

    fn tip_at(trigger_time: u32) -> InteractionDefinition {
        InteractionDefinition {
            id: Uuid::new_v4(),
            title: format!("tip@{trigger_time}"),
            kind: InteractionKind::Tip(TipConfig { text: "hint".into() }),
            trigger_time,
            duration_seconds: None,
        }
    }

    #[test]
    fn test_trigger_fires_once_at_offset() {
        let def = poll_at(120, Some(30));
        let mut sched = InteractionScheduler::new(vec![def.clone()], 30);

        assert!(sched.observe_second(119).is_empty());
        let newly = sched.observe_second(120);
        assert_eq!(newly.len(), 1);
        assert_eq!(newly[0].id, def.id);
        assert!(
            sched.observe_second(121).is_empty(),
            "repeat observations must not re-trigger"
        );
    }

    #[test]
    fn test_sparse_observations_catch_up() {
        let def = poll_at(120, Some(30));
        let mut sched = InteractionScheduler::new(vec![def.clone()], 30);

        sched.observe_second(118);
        let newly = sched.observe_second(125);
        assert_eq!(newly.len(), 1, "a skipped-over offset still fires");

        let all = sched.all_triggered();
        assert_eq!(all[0].triggered_at_second, 125, "trigger moment is as observed");
    }

    #[test]
    fn test_active_window_closes_at_expiry() {
        let def = poll_at(30, Some(30));
        let mut sched = InteractionScheduler::new(vec![def.clone()], 30);

        sched.observe_second(30);
        assert!(sched.is_active(def.id));
        sched.observe_second(59);
        assert!(sched.is_active(def.id));
        sched.observe_second(60);
        assert!(!sched.is_active(def.id), "window is [trigger, trigger+duration)");

        // Gone from the active set but still in the feed, unanswered.
        let all = sched.all_triggered();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].phase, InteractionPhase::Pending);
        assert!(all[0].response.is_none());
    }

    #[test]
    fn test_default_duration_fills_in() {
        let def = tip_at(10);
        let mut sched = InteractionScheduler::new(vec![def.clone()], 30);

        sched.observe_second(10);
        sched.observe_second(39);
        assert!(sched.is_active(def.id));
        sched.observe_second(40);
        assert!(!sched.is_active(def.id));
    }

    #[test]
    fn test_dismiss_only_while_active() {
        let def = poll_at(30, Some(30));
        let mut sched = InteractionScheduler::new(vec![def.clone()], 30);

        assert!(!sched.dismiss(def.id), "nothing to dismiss before trigger");
        sched.observe_second(35);
        assert!(sched.dismiss(def.id));
        assert_eq!(sched.phase(def.id), Some(InteractionPhase::Dismissed));
        assert!(!sched.dismiss(def.id), "dismiss is terminal");
        assert!(
            !sched.mark_answered(def.id, json!({"optionIndex": 0}), Utc::now()),
            "dismissed interactions take no answer"
        );
    }

    #[test]
    fn test_late_answer_after_window() {
        let def = poll_at(30, Some(30));
        let mut sched = InteractionScheduler::new(vec![def.clone()], 30);

        sched.observe_second(35);
        sched.observe_second(90);
        assert!(!sched.is_active(def.id));

        assert!(
            sched.mark_answered(def.id, json!({"optionIndex": 1}), Utc::now()),
            "answers from the feed are accepted after the window"
        );
        assert_eq!(sched.phase(def.id), Some(InteractionPhase::Answered));

        assert!(
            !sched.mark_answered(def.id, json!({"optionIndex": 0}), Utc::now()),
            "first answer wins"
        );
        let recorded = sched.answered(def.id).expect("answer recorded");
        assert_eq!(recorded.response, json!({"optionIndex": 1}));
    }

    #[test]
    fn test_answered_never_returns_to_active() {
        let def = poll_at(30, Some(30));
        let mut sched = InteractionScheduler::new(vec![def.clone()], 30);

        sched.observe_second(40);
        assert!(sched.mark_answered(def.id, json!(1), Utc::now()));

        // Replay seek back into the window.
        sched.observe_second(35);
        assert!(!sched.is_active(def.id));
        assert_eq!(sched.phase(def.id), Some(InteractionPhase::Answered));
    }

    #[test]
    fn test_untouched_interaction_reactivates_on_window_reentry() {
        let def = poll_at(30, Some(30));
        let mut sched = InteractionScheduler::new(vec![def.clone()], 30);

        sched.observe_second(40);
        sched.observe_second(90);
        assert!(!sched.is_active(def.id));

        sched.observe_second(35);
        assert!(
            sched.is_active(def.id),
            "an untouched interaction shows again inside its window"
        );
        assert!(
            sched.observe_second(35).is_empty(),
            "re-entry is not a re-trigger"
        );
    }

    #[test]
    fn test_backward_seek_keeps_triggered_state() {
        let def = poll_at(30, Some(30));
        let mut sched = InteractionScheduler::new(vec![def.clone()], 30);

        sched.observe_second(45);
        sched.observe_second(10);
        assert!(!sched.is_active(def.id), "playhead is before the window");
        assert_eq!(
            sched.all_triggered().len(),
            1,
            "triggered state is monotonic across backward seeks"
        );
    }

    #[test]
    fn test_feed_projection_is_timeline_ordered() {
        let a = poll_at(300, Some(30));
        let b = tip_at(10);
        let c = poll_at(150, Some(30));
        let mut sched = InteractionScheduler::new(vec![a, b, c], 30);

        sched.observe_second(400);
        let all = sched.all_triggered();
        let offsets: Vec<u32> = all.iter().map(|t| t.definition.trigger_time).collect();
        assert_eq!(offsets, vec![10, 150, 300]);
    }

    #[test]
    fn test_simultaneous_triggers_all_fire() {
        let a = poll_at(60, Some(30));
        let b = tip_at(60);
        let mut sched = InteractionScheduler::new(vec![a, b], 30);

        let newly = sched.observe_second(60);
        assert_eq!(newly.len(), 2);
        assert_eq!(sched.active().len(), 2);
    }

    #[test]
    fn test_negative_positions_clamp_to_zero() {
        let def = tip_at(0);
        let mut sched = InteractionScheduler::new(vec![def.clone()], 30);

        let newly = sched.observe_time(-0.25);
        assert_eq!(newly.len(), 1, "offset zero fires on the first observation");
    }
}
