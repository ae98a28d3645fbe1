//! Trial domain model.
//!
//! Trials are the discrete stimuli a subject responds to. A trial is either
//! choice-based (pick one of several displayed options, e.g. after an audio
//! stimulus) or speech-based (read a target word aloud). Trials are immutable
//! once issued by the backend.

use serde::{Deserialize, Serialize};

/// Number of non-adaptive trials every test starts with.
pub const BASELINE_TRIALS: usize = 4;

/// Adaptive trial cap for the audio discrimination test.
pub const AUDIO_ADAPTIVE_TRIALS: usize = 6;

/// Total trial cap for the reading test.
pub const READING_MAX_TRIALS: usize = 10;

/// Which screening test a session belongs to.
///
/// The id doubles as the aggregator slot key and selects the backend
/// endpoint family and wire field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestId {
    /// Audio discrimination: hear a word, pick it from options.
    Audio,
    /// Reading aloud: see a word, speak it.
    Reading,
}

impl TestId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Reading => "reading",
        }
    }
}

impl std::fmt::Display for TestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-test trial counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TrialLimits {
    /// Size of the fixed initial batch.
    pub baseline_trials: usize,
    /// Hard cap on total trials (baseline + adaptive).
    pub max_total: usize,
}

impl TrialLimits {
    /// Default limits for a given test.
    pub fn for_test(test: TestId) -> Self {
        match test {
            TestId::Audio => Self {
                baseline_trials: BASELINE_TRIALS,
                max_total: BASELINE_TRIALS + AUDIO_ADAPTIVE_TRIALS,
            },
            TestId::Reading => Self {
                baseline_trials: BASELINE_TRIALS,
                max_total: READING_MAX_TRIALS,
            },
        }
    }
}

/// Progression phase of a trial session. Strictly monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Serving the fixed initial batch.
    Baseline,
    /// Serving backend-selected trials.
    Adaptive,
    /// No further trials will be served.
    Finished,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Adaptive => "adaptive",
            Self::Finished => "finished",
        }
    }

    /// Phase ordering never reverses: Baseline -> Adaptive -> Finished.
    pub fn can_transition_to(&self, next: Self) -> bool {
        match self {
            Self::Baseline => matches!(next, Self::Adaptive | Self::Finished),
            Self::Adaptive => matches!(next, Self::Finished),
            Self::Finished => false,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A choice-based trial: the subject hears a stimulus and selects one of the
/// displayed options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceTrial {
    /// Canonical identifier for the stimulus (the target word).
    pub stimulus_key: String,

    /// URL of the audio asset to play, when served remotely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stimulus_url: Option<String>,

    /// Options presented to the subject.
    pub options: Vec<String>,

    /// Index of the correct option within `options`.
    pub correct_index: usize,
}

impl ChoiceTrial {
    /// The option the backend marked correct, if `correct_index` is in range.
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_index).map(String::as_str)
    }
}

/// A speech-based trial: the subject reads the target word aloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechTrial {
    /// The target word the subject must produce.
    pub stimulus_key: String,

    /// Optional display override (falls back to `stimulus_key`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
}

impl SpeechTrial {
    /// Text to render for the subject.
    pub fn display(&self) -> &str {
        self.display_text.as_deref().unwrap_or(&self.stimulus_key)
    }
}

/// A single trial, tagged by response modality so grading is exhaustively
/// checked per variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trial {
    Choice(ChoiceTrial),
    Speech(SpeechTrial),
}

impl Trial {
    pub fn stimulus_key(&self) -> &str {
        match self {
            Self::Choice(t) => &t.stimulus_key,
            Self::Speech(t) => &t.stimulus_key,
        }
    }

    /// Grade a submitted answer against this trial's canonical answer.
    ///
    /// Choice answers must match the correct option exactly. Speech
    /// transcripts are compared case-insensitively after whitespace
    /// normalization; there is no fuzzy or phonetic matching.
    pub fn grade(&self, selected: &str) -> bool {
        match self {
            Self::Choice(t) => t.correct_option() == Some(selected),
            Self::Speech(t) => {
                normalize_transcript(selected) == normalize_transcript(&t.stimulus_key)
            }
        }
    }
}

/// Lowercase and collapse whitespace for transcript comparison.
pub fn normalize_transcript(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One completed trial's outcome. Append-only once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseItem {
    /// Stimulus the subject responded to.
    pub stimulus_key: String,

    /// What the subject selected or said.
    pub selected: String,

    /// Whether the response matched the canonical answer.
    pub correct: bool,

    /// Seconds from stimulus presentation to response registration.
    pub reaction_time_seconds: f64,
}

impl ResponseItem {
    /// Build a response item, clamping reaction time to be non-negative.
    pub fn new(
        stimulus_key: impl Into<String>,
        selected: impl Into<String>,
        correct: bool,
        reaction_time_seconds: f64,
    ) -> Self {
        Self {
            stimulus_key: stimulus_key.into(),
            selected: selected.into(),
            correct,
            reaction_time_seconds: reaction_time_seconds.max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(word: &str, options: &[&str], correct_index: usize) -> Trial {
        Trial::Choice(ChoiceTrial {
            stimulus_key: word.to_string(),
            stimulus_url: None,
            options: options.iter().map(ToString::to_string).collect(),
            correct_index,
        })
    }

    #[test]
    fn test_phase_is_monotonic() {
        assert!(Phase::Baseline.can_transition_to(Phase::Adaptive));
        assert!(Phase::Baseline.can_transition_to(Phase::Finished));
        assert!(Phase::Adaptive.can_transition_to(Phase::Finished));

        assert!(!Phase::Adaptive.can_transition_to(Phase::Baseline));
        assert!(!Phase::Finished.can_transition_to(Phase::Adaptive));
        assert!(!Phase::Finished.can_transition_to(Phase::Baseline));
    }

    #[test]
    fn test_choice_grading_is_exact() {
        let trial = choice("Robot", &["Apple", "Robot", "Space", "Music"], 1);
        assert!(trial.grade("Robot"));
        assert!(!trial.grade("robot"));
        assert!(!trial.grade("Apple"));
    }

    #[test]
    fn test_choice_grading_with_out_of_range_index() {
        let trial = choice("Robot", &["Apple", "Robot"], 7);
        assert!(!trial.grade("Robot"));
        assert!(!trial.grade("Apple"));
    }

    #[test]
    fn test_speech_grading_normalizes() {
        let trial = Trial::Speech(SpeechTrial {
            stimulus_key: "Galaxy".to_string(),
            display_text: None,
        });
        assert!(trial.grade("galaxy"));
        assert!(trial.grade("  GALAXY  "));
        assert!(!trial.grade("galaxies"));
        assert!(!trial.grade(""));
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_transcript("  Red   Planet "), "red planet");
        assert_eq!(normalize_transcript(""), "");
    }

    #[test]
    fn test_response_item_clamps_negative_reaction_time() {
        let item = ResponseItem::new("Star", "Star", true, -0.25);
        assert_eq!(item.reaction_time_seconds, 0.0);
    }

    #[test]
    fn test_limits_defaults() {
        let audio = TrialLimits::for_test(TestId::Audio);
        assert_eq!(audio.baseline_trials, 4);
        assert_eq!(audio.max_total, 10);

        let reading = TrialLimits::for_test(TestId::Reading);
        assert_eq!(reading.baseline_trials, 4);
        assert_eq!(reading.max_total, 10);
    }

    #[test]
    fn test_speech_display_falls_back_to_key() {
        let trial = SpeechTrial {
            stimulus_key: "Comet".to_string(),
            display_text: None,
        };
        assert_eq!(trial.display(), "Comet");

        let styled = SpeechTrial {
            stimulus_key: "Comet".to_string(),
            display_text: Some("comet".to_string()),
        };
        assert_eq!(styled.display(), "comet");
    }
}
