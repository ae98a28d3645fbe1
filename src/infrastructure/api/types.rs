//! Wire types for the scoring backend's JSON surface.
//!
//! The backend speaks the original field names (`audio`, `text_word`,
//! `reaction_time`); everything here converts between that surface and the
//! domain models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::models::{ChoiceTrial, ResponseItem, SpeechTrial, TestId, Trial};

/// Audio-test trial as served by `/baseline` and `/next-trial`.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioTrialWire {
    /// Target word; doubles as the stimulus key.
    pub audio: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    pub options: Vec<String>,
    pub correct_index: usize,
}

impl AudioTrialWire {
    /// A served choice trial must be answerable: at least one option, with
    /// the correct index inside the option list.
    pub fn ensure_answerable(&self) -> Result<(), String> {
        if self.options.is_empty() {
            return Err(format!("choice trial '{}' has no options", self.audio));
        }
        if self.correct_index >= self.options.len() {
            return Err(format!(
                "choice trial '{}' correct_index {} outside its {} options",
                self.audio,
                self.correct_index,
                self.options.len()
            ));
        }
        Ok(())
    }
}

impl From<AudioTrialWire> for Trial {
    fn from(wire: AudioTrialWire) -> Self {
        Self::Choice(ChoiceTrial {
            stimulus_key: wire.audio,
            stimulus_url: wire.audio_url,
            options: wire.options,
            correct_index: wire.correct_index,
        })
    }
}

/// Reading-test trial as served by `/test2/baseline` and `/test2/adaptive`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingTrialWire {
    pub text_word: String,
    #[serde(default)]
    pub display_text: Option<String>,
}

impl From<ReadingTrialWire> for Trial {
    fn from(wire: ReadingTrialWire) -> Self {
        Self::Speech(SpeechTrial {
            stimulus_key: wire.text_word,
            display_text: wire.display_text,
        })
    }
}

/// Adaptive endpoint reply. The audio endpoint always envelopes the trial
/// in `{next_trial, analysis}`; the reading endpoint sometimes answers with
/// a bare trial object. `Bare` must be tried first: an enveloped reply never
/// parses as a trial, but with defaulted fields the reverse would.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum NextTrialWire<T> {
    Bare(T),
    Enveloped {
        #[serde(default = "none")]
        next_trial: Option<T>,
        #[serde(default)]
        analysis: Option<Value>,
    },
}

fn none<T>() -> Option<T> {
    None
}

impl<T> NextTrialWire<T> {
    /// The selected trial as served, before domain conversion.
    pub fn trial(&self) -> Option<&T> {
        match self {
            Self::Bare(t) => Some(t),
            Self::Enveloped { next_trial, .. } => next_trial.as_ref(),
        }
    }
}

impl<T: Into<Trial>> NextTrialWire<T> {
    /// Flatten to the trial the adaptive policy selected, if any.
    pub fn into_trial(self) -> Option<Trial> {
        match self {
            Self::Bare(t) => Some(t.into()),
            Self::Enveloped { next_trial, .. } => next_trial.map(Into::into),
        }
    }
}

/// One response item in an adaptive or evaluation request body, keyed the
/// way the backend expects for the given test.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResponseWire<'a> {
    Audio {
        audio: &'a str,
        selected: &'a str,
        correct: bool,
        reaction_time: f64,
    },
    Reading {
        text_word: &'a str,
        selected: &'a str,
        correct: bool,
        reaction_time: f64,
    },
}

impl<'a> ResponseWire<'a> {
    pub fn new(test: TestId, item: &'a ResponseItem) -> Self {
        match test {
            TestId::Audio => Self::Audio {
                audio: &item.stimulus_key,
                selected: &item.selected,
                correct: item.correct,
                reaction_time: item.reaction_time_seconds,
            },
            TestId::Reading => Self::Reading {
                text_word: &item.stimulus_key,
                selected: &item.selected,
                correct: item.correct,
                reaction_time: item.reaction_time_seconds,
            },
        }
    }
}

/// Body of an adaptive next-trial request.
#[derive(Debug, Serialize)]
pub struct NextTrialRequest<'a> {
    pub responses: Vec<ResponseWire<'a>>,
}

impl<'a> NextTrialRequest<'a> {
    pub fn new(test: TestId, responses: &'a [ResponseItem]) -> Self {
        Self {
            responses: responses.iter().map(|r| ResponseWire::new(test, r)).collect(),
        }
    }
}

/// Body of the final evaluation request. Either array may be empty when the
/// subject skipped a stage.
#[derive(Debug, Serialize)]
pub struct EvaluationRequest<'a> {
    pub test1_data: Vec<ResponseWire<'a>>,
    pub test2_data: Vec<ResponseWire<'a>>,
}

impl<'a> EvaluationRequest<'a> {
    pub fn new(audio: &'a [ResponseItem], reading: &'a [ResponseItem]) -> Self {
        Self {
            test1_data: audio
                .iter()
                .map(|r| ResponseWire::new(TestId::Audio, r))
                .collect(),
            test2_data: reading
                .iter()
                .map(|r| ResponseWire::new(TestId::Reading, r))
                .collect(),
        }
    }
}
