//! State debouncer
//!
//! Turns the raw runtime state, sampled once per check interval, into stable
//! start/stop transitions. A transition fires only after the new activity has
//! been observed on `threshold` consecutive checks; the threshold depends on
//! the direction (entering PLAYING vs. leaving it).
//!
//! Observations are compared as raw states, so `STOPPING, STOPPED` counts as
//! two different observations even though neither is PLAYING.

use contracts::{DebounceConfig, RuntimeState};
use tracing::{debug, trace};

/// A stable change of activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// PLAYING held for the start threshold
    StartRecording,
    /// Not-PLAYING held for the stop threshold
    StopRecording,
}

/// Consecutive-observation window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebounceWindow {
    /// Most recent raw observation
    pub last_observed: Option<RuntimeState>,
    /// How many times in a row `last_observed` has been seen
    pub consecutive: u32,
}

/// State debouncer
#[derive(Debug, Clone)]
pub struct Debouncer {
    start_threshold: u32,
    stop_threshold: u32,
    window: DebounceWindow,
    /// Committed activity: true once a start fired and until a stop fires
    playing: bool,
}

impl Debouncer {
    /// Create a debouncer; thresholds below 1 are treated as 1
    pub fn new(config: &DebounceConfig) -> Self {
        Self {
            start_threshold: config.start_threshold.max(1),
            stop_threshold: config.stop_threshold.max(1),
            window: DebounceWindow::default(),
            playing: false,
        }
    }

    /// Feed one observation
    pub fn observe(&mut self, state: RuntimeState) -> Option<Transition> {
        if self.window.last_observed == Some(state) {
            self.window.consecutive = self.window.consecutive.saturating_add(1);
        } else {
            self.window.last_observed = Some(state);
            self.window.consecutive = 1;
        }

        let wants_playing = state.is_playing();
        if wants_playing == self.playing {
            return None;
        }

        let threshold = self.required_threshold();
        trace!(
            %state,
            consecutive = self.window.consecutive,
            threshold,
            "Debounce observation"
        );
        if self.window.consecutive < threshold {
            return None;
        }

        self.playing = wants_playing;
        self.window.consecutive = 0;
        let transition = if wants_playing {
            Transition::StartRecording
        } else {
            Transition::StopRecording
        };
        debug!(?transition, %state, "Stable state transition");
        Some(transition)
    }

    /// Threshold for the next transition
    pub fn required_threshold(&self) -> u32 {
        if self.playing {
            self.stop_threshold
        } else {
            self.start_threshold
        }
    }

    /// Committed activity
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current observation window
    pub fn window(&self) -> &DebounceWindow {
        &self.window
    }

    /// Forget all observations and return to idle
    ///
    /// Used when a session is torn down without a stop transition, so the
    /// next session needs a full start window.
    pub fn force_idle(&mut self) {
        self.playing = false;
        self.window = DebounceWindow::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::RuntimeState::*;

    fn debouncer() -> Debouncer {
        Debouncer::new(&DebounceConfig::default())
    }

    fn feed(debouncer: &mut Debouncer, states: &[RuntimeState]) -> Vec<(usize, Transition)> {
        states
            .iter()
            .enumerate()
            .filter_map(|(i, s)| debouncer.observe(*s).map(|t| (i, t)))
            .collect()
    }

    #[test]
    fn test_start_fires_on_third_playing() {
        let mut d = debouncer();
        let fired = feed(
            &mut d,
            &[Stopped, Stopped, Stopped, Stopped, Stopped, Playing, Playing, Playing],
        );
        assert_eq!(fired, vec![(7, Transition::StartRecording)]);
        assert!(d.is_playing());
    }

    #[test]
    fn test_below_threshold_never_fires() {
        let mut d = debouncer();
        assert!(feed(&mut d, &[Playing, Playing, Stopped, Playing, Playing]).is_empty());
        assert!(!d.is_playing());
    }

    #[test]
    fn test_fires_exactly_once_per_window() {
        let mut d = debouncer();
        let fired = feed(&mut d, &[Playing; 10]);
        assert_eq!(fired, vec![(2, Transition::StartRecording)]);
    }

    #[test]
    fn test_stop_needs_two() {
        let mut d = debouncer();
        feed(&mut d, &[Playing, Playing, Playing]);
        assert_eq!(d.required_threshold(), 2);

        let fired = feed(&mut d, &[Paused, Playing, Paused, Paused]);
        assert_eq!(fired, vec![(3, Transition::StopRecording)]);
        assert!(!d.is_playing());
    }

    #[test]
    fn test_single_poll_flicker_is_ignored() {
        let mut d = debouncer();
        feed(&mut d, &[Playing, Playing, Playing]);
        let fired = feed(&mut d, &[Playing, Pausing, Playing, Playing, Pausing, Playing]);
        assert!(fired.is_empty());
        assert!(d.is_playing());
    }

    #[test]
    fn test_raw_states_are_compared() {
        let mut d = debouncer();
        feed(&mut d, &[Playing, Playing, Playing]);
        assert!(feed(&mut d, &[Stopping, Stopped]).is_empty());
        assert_eq!(
            feed(&mut d, &[Stopped]),
            vec![(0, Transition::StopRecording)]
        );
    }

    #[test]
    fn test_count_resets_after_transition() {
        let mut d = Debouncer::new(&DebounceConfig {
            start_threshold: 2,
            stop_threshold: 2,
            ..Default::default()
        });
        feed(&mut d, &[Playing, Playing]);
        assert_eq!(d.window().consecutive, 0);
        assert_eq!(d.window().last_observed, Some(Playing));
    }

    #[test]
    fn test_force_idle_requires_new_window() {
        let mut d = debouncer();
        feed(&mut d, &[Playing, Playing, Playing]);
        d.force_idle();
        assert!(!d.is_playing());
        let fired = feed(&mut d, &[Playing, Playing, Playing]);
        assert_eq!(fired, vec![(2, Transition::StartRecording)]);
    }
}
