//! Ephemeral per-invocation turn state.

use serde::{Deserialize, Serialize};

use super::TurnStage;

/// State accumulated by one turn of the pipeline.
///
/// Lives only for the invocation; nothing here is persisted. Confidence
/// scores are recorded per stage and drive two decisions: the recover
/// edge after processing (minimum score) and the turn-level confidence at
/// completion (mean score).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnState {
    /// Current pipeline stage.
    pub stage: TurnStage,
    /// Per-stage confidence scores recorded this turn.
    confidences: Vec<(TurnStage, f64)>,
    /// Error text captured by the driver, if any.
    error: Option<String>,
    /// Trips through error recovery within this turn.
    recovery_loops: u32,
}

impl TurnState {
    /// Fresh state at the entry stage.
    pub fn new() -> Self {
        Self {
            stage: TurnStage::entry(),
            confidences: Vec::new(),
            error: None,
            recovery_loops: 0,
        }
    }

    /// Records a stage's confidence, clamped into [0, 1].
    pub fn record_confidence(&mut self, stage: TurnStage, score: f64) {
        self.confidences.push((stage, score.clamp(0.0, 1.0)));
    }

    /// The lowest confidence recorded so far this turn.
    pub fn min_confidence(&self) -> Option<f64> {
        self.confidences
            .iter()
            .map(|(_, score)| *score)
            .fold(None, |min, s| match min {
                Some(m) if m <= s => Some(m),
                _ => Some(s),
            })
    }

    /// Mean of all per-stage confidences recorded this turn; 0.0 when no
    /// stage reported one.
    pub fn mean_confidence(&self) -> f64 {
        if self.confidences.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.confidences.iter().map(|(_, s)| s).sum();
        sum / self.confidences.len() as f64
    }

    /// Flags an error captured by the driver.
    pub fn flag_error(&mut self, text: impl Into<String>) {
        self.error = Some(text.into());
    }

    /// The captured error text, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The recover edge decision after processing: recover when the error
    /// flag is set or the minimum confidence fell below the floor.
    pub fn should_recover(&self, confidence_floor: f64) -> bool {
        if self.error.is_some() {
            return true;
        }
        matches!(self.min_confidence(), Some(min) if min < confidence_floor)
    }

    /// Begins an error-recovery loop: clears the error flag and this
    /// turn's confidences (the rerun re-records them) and counts the trip.
    pub fn begin_recovery_loop(&mut self) {
        self.recovery_loops += 1;
        self.error = None;
        self.confidences.clear();
    }

    /// Trips through error recovery so far this turn.
    pub fn recovery_loops(&self) -> u32 {
        self.recovery_loops
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_greeting_with_no_scores() {
        let state = TurnState::new();
        assert_eq!(state.stage, TurnStage::Greeting);
        assert!(state.min_confidence().is_none());
        assert_eq!(state.mean_confidence(), 0.0);
        assert_eq!(state.recovery_loops(), 0);
    }

    #[test]
    fn min_and_mean_track_recorded_scores() {
        let mut state = TurnState::new();
        state.record_confidence(TurnStage::IntentDetection, 0.8);
        state.record_confidence(TurnStage::AgentRouting, 0.6);
        state.record_confidence(TurnStage::Processing, 1.0);

        assert_eq!(state.min_confidence(), Some(0.6));
        assert!((state.mean_confidence() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn confidence_is_clamped() {
        let mut state = TurnState::new();
        state.record_confidence(TurnStage::Processing, 1.5);
        state.record_confidence(TurnStage::IntentDetection, -0.2);
        assert_eq!(state.min_confidence(), Some(0.0));
    }

    #[test]
    fn recover_on_error_flag() {
        let mut state = TurnState::new();
        state.record_confidence(TurnStage::IntentDetection, 0.9);
        assert!(!state.should_recover(0.3));

        state.flag_error("agent backend error: boom");
        assert!(state.should_recover(0.3));
    }

    #[test]
    fn recover_on_low_confidence() {
        let mut state = TurnState::new();
        state.record_confidence(TurnStage::Processing, 0.2);
        assert!(state.should_recover(0.3));
        assert!(!state.should_recover(0.1));
    }

    #[test]
    fn no_scores_means_no_confidence_recovery() {
        let state = TurnState::new();
        assert!(!state.should_recover(0.3));
    }

    #[test]
    fn recovery_loop_resets_error_and_scores() {
        let mut state = TurnState::new();
        state.record_confidence(TurnStage::Processing, 0.1);
        state.flag_error("timeout");

        state.begin_recovery_loop();

        assert_eq!(state.recovery_loops(), 1);
        assert!(state.error().is_none());
        assert!(state.min_confidence().is_none());
        assert!(!state.should_recover(0.3));
    }
}
