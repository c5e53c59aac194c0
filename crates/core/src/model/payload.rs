use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PayloadError {
    #[error("exercise must have at least one step")]
    NoSteps,

    #[error("step {step} has no target utterance")]
    BlankTarget { step: usize },

    #[error("instruction list is missing its main instructions")]
    MissingMainInstructions,
}

//
// ─── STEP ITEMS ────────────────────────────────────────────────────────────────
//

/// A single word to say, optionally tagged with the sound it drills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordItem {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_sound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl WordItem {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_sound: None,
            hint: None,
        }
    }

    #[must_use]
    pub fn with_target_sound(mut self, sound: impl Into<String>) -> Self {
        self.target_sound = Some(sound.into());
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Either a contrast pair (`ship` / `chip`) or a word with associations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PairItem {
    Contrast {
        word1: String,
        word2: String,
        focus: String,
    },
    Association {
        word: String,
        associations: Vec<String>,
    },
}

/// A timed instruction, e.g. a breathing step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedStep {
    pub instruction: String,
    pub duration_seconds: u32,
}

/// A short passage read aloud, followed by comprehension questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryItem {
    pub text: String,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// A category to name examples for (e.g. "Fruits").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPrompt {
    pub name: String,
    #[serde(default)]
    pub examples: Vec<String>,
}

//
// ─── PAYLOAD ───────────────────────────────────────────────────────────────────
//

/// Step content of an exercise.
///
/// Every variant is an ordered list of steps and answers the same three
/// questions: how many steps there are, what the user should say at step `i`,
/// and which hint (if any) belongs to step `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepPayload {
    WordList {
        items: Vec<WordItem>,
    },
    PairList {
        items: Vec<PairItem>,
    },
    PhraseList {
        items: Vec<String>,
    },
    SentenceList {
        items: Vec<String>,
    },
    StepList {
        items: Vec<TimedStep>,
    },
    StoryList {
        items: Vec<StoryItem>,
    },
    InstructionList {
        main_instructions: String,
        items: Vec<String>,
    },
    CategoryPromptList {
        items: Vec<CategoryPrompt>,
    },
    PromptList {
        items: Vec<String>,
    },
}

impl StepPayload {
    /// Number of steps in this payload.
    #[must_use]
    pub fn step_count(&self) -> usize {
        match self {
            StepPayload::WordList { items } => items.len(),
            StepPayload::PairList { items } => items.len(),
            StepPayload::PhraseList { items }
            | StepPayload::SentenceList { items }
            | StepPayload::PromptList { items }
            | StepPayload::InstructionList { items, .. } => items.len(),
            StepPayload::StepList { items } => items.len(),
            StepPayload::StoryList { items } => items.len(),
            StepPayload::CategoryPromptList { items } => items.len(),
        }
    }

    /// What the user is expected to say at `step`, or `None` past the end.
    #[must_use]
    pub fn target_utterance(&self, step: usize) -> Option<Cow<'_, str>> {
        let target = match self {
            StepPayload::WordList { items } => Cow::Borrowed(items.get(step)?.text.as_str()),
            StepPayload::PairList { items } => match items.get(step)? {
                PairItem::Contrast { word1, word2, .. } => Cow::Owned(format!("{word1} {word2}")),
                PairItem::Association { word, .. } => Cow::Borrowed(word.as_str()),
            },
            StepPayload::PhraseList { items }
            | StepPayload::SentenceList { items }
            | StepPayload::PromptList { items }
            | StepPayload::InstructionList { items, .. } => {
                Cow::Borrowed(items.get(step)?.as_str())
            }
            StepPayload::StepList { items } => {
                Cow::Borrowed(items.get(step)?.instruction.as_str())
            }
            StepPayload::StoryList { items } => Cow::Borrowed(items.get(step)?.text.as_str()),
            StepPayload::CategoryPromptList { items } => {
                Cow::Borrowed(items.get(step)?.name.as_str())
            }
        };
        Some(target)
    }

    /// Optional hint for `step`.
    #[must_use]
    pub fn hint(&self, step: usize) -> Option<Cow<'_, str>> {
        match self {
            StepPayload::WordList { items } => {
                let item = items.get(step)?;
                match (&item.hint, &item.target_sound) {
                    (Some(hint), _) => Some(Cow::Borrowed(hint.as_str())),
                    (None, Some(sound)) => {
                        Some(Cow::Owned(format!("Focus on the \"{sound}\" sound.")))
                    }
                    (None, None) => None,
                }
            }
            StepPayload::PairList { items } => match items.get(step)? {
                PairItem::Contrast { focus, .. } => Some(Cow::Owned(format!("Focus: {focus}"))),
                PairItem::Association { associations, .. } if !associations.is_empty() => Some(
                    Cow::Owned(format!("Think of: {}", associations.join(", "))),
                ),
                PairItem::Association { .. } => None,
            },
            StepPayload::StepList { items } => {
                let item = items.get(step)?;
                Some(Cow::Owned(format!(
                    "Take about {} seconds for this step.",
                    item.duration_seconds
                )))
            }
            StepPayload::StoryList { items } => {
                let item = items.get(step)?;
                if item.questions.is_empty() {
                    None
                } else {
                    Some(Cow::Owned(format!(
                        "Afterwards, think about: {}",
                        item.questions.join(" ")
                    )))
                }
            }
            StepPayload::InstructionList {
                main_instructions,
                items,
            } => {
                items.get(step)?;
                Some(Cow::Borrowed(main_instructions.as_str()))
            }
            StepPayload::CategoryPromptList { items } => {
                let item = items.get(step)?;
                if item.examples.is_empty() {
                    None
                } else {
                    Some(Cow::Owned(format!(
                        "For example: {}",
                        item.examples.join(", ")
                    )))
                }
            }
            StepPayload::PhraseList { .. }
            | StepPayload::SentenceList { .. }
            | StepPayload::PromptList { .. } => None,
        }
    }

    /// Checks the catalog invariants: at least one step, and a non-blank target
    /// utterance for every step.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError` describing the first violation.
    pub fn validate(&self) -> Result<(), PayloadError> {
        let count = self.step_count();
        if count == 0 {
            return Err(PayloadError::NoSteps);
        }
        if let StepPayload::InstructionList {
            main_instructions, ..
        } = self
        {
            if main_instructions.trim().is_empty() {
                return Err(PayloadError::MissingMainInstructions);
            }
        }
        for step in 0..count {
            let blank = self
                .target_utterance(step)
                .is_none_or(|target| target.trim().is_empty());
            if blank {
                return Err(PayloadError::BlankTarget { step });
            }
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn words() -> StepPayload {
        StepPayload::WordList {
            items: vec![
                WordItem::new("Park").with_target_sound("p"),
                WordItem::new("Ball").with_hint("Lips together, then pop."),
                WordItem::new("Table"),
            ],
        }
    }

    #[test]
    fn word_list_exposes_targets_and_hints() {
        let payload = words();
        assert_eq!(payload.step_count(), 3);
        assert_eq!(payload.target_utterance(0).as_deref(), Some("Park"));
        assert_eq!(
            payload.hint(0).as_deref(),
            Some("Focus on the \"p\" sound.")
        );
        assert_eq!(payload.hint(1).as_deref(), Some("Lips together, then pop."));
        assert_eq!(payload.hint(2), None);
        assert_eq!(payload.target_utterance(3), None);
    }

    #[test]
    fn contrast_pairs_say_both_words() {
        let payload = StepPayload::PairList {
            items: vec![PairItem::Contrast {
                word1: "ship".into(),
                word2: "chip".into(),
                focus: "sh vs ch".into(),
            }],
        };
        assert_eq!(payload.target_utterance(0).as_deref(), Some("ship chip"));
        assert_eq!(payload.hint(0).as_deref(), Some("Focus: sh vs ch"));
    }

    #[test]
    fn instruction_list_hints_with_main_instructions() {
        let payload = StepPayload::InstructionList {
            main_instructions: "Say each instruction back.".into(),
            items: vec!["Touch your nose".into()],
        };
        assert_eq!(
            payload.hint(0).as_deref(),
            Some("Say each instruction back.")
        );
        assert_eq!(payload.hint(1), None);
    }

    #[test]
    fn empty_payload_is_rejected() {
        let payload = StepPayload::PhraseList { items: vec![] };
        assert_eq!(payload.validate(), Err(PayloadError::NoSteps));
    }

    #[test]
    fn blank_target_is_rejected() {
        let payload = StepPayload::PromptList {
            items: vec!["Tell me about your day".into(), "   ".into()],
        };
        assert_eq!(
            payload.validate(),
            Err(PayloadError::BlankTarget { step: 1 })
        );
    }

    #[test]
    fn payload_deserializes_from_tagged_json() {
        let json = r#"{
            "kind": "pair_list",
            "items": [
                { "word1": "fan", "word2": "van", "focus": "f vs v" },
                { "word": "Sun", "associations": ["hot", "bright"] }
            ]
        }"#;
        let payload: StepPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.step_count(), 2);
        assert_eq!(payload.target_utterance(1).as_deref(), Some("Sun"));
        assert_eq!(payload.hint(1).as_deref(), Some("Think of: hot, bright"));
        assert!(payload.validate().is_ok());
    }
}
