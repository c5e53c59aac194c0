use crate::catalog::CatalogDraft;
use crate::model::{
    CategoryDraft, CategoryPrompt, Difficulty, ExerciseDraft, PairItem, StepPayload, StoryItem,
    TimedStep, WordItem,
};

fn category(id: &str, name: &str, description: &str, icon: &str) -> CategoryDraft {
    CategoryDraft {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        icon: icon.into(),
    }
}

#[allow(clippy::too_many_arguments)]
fn exercise(
    id: &str,
    title: &str,
    description: &str,
    difficulty: Difficulty,
    level: u32,
    category_id: &str,
    points: u32,
    payload: StepPayload,
) -> ExerciseDraft {
    ExerciseDraft {
        id: id.into(),
        title: title.into(),
        description: description.into(),
        difficulty,
        level,
        category_id: category_id.into(),
        points,
        payload,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn contrast(word1: &str, word2: &str, focus: &str) -> PairItem {
    PairItem::Contrast {
        word1: word1.into(),
        word2: word2.into(),
        focus: focus.into(),
    }
}

fn association(word: &str, associations: &[&str]) -> PairItem {
    PairItem::Association {
        word: word.into(),
        associations: strings(associations),
    }
}

/// Catalog data bundled with the application.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn builtin_drafts() -> CatalogDraft {
    let categories = vec![
        category(
            "articulation",
            "Articulation",
            "Clear production of individual sounds.",
            "👄",
        ),
        category(
            "fluency",
            "Fluency",
            "Smooth, paced and relaxed speech.",
            "🌊",
        ),
        category(
            "language",
            "Language",
            "Finding and using the right words.",
            "💬",
        ),
        category(
            "cognition",
            "Cognition",
            "Listening, memory and following directions.",
            "🧠",
        ),
    ];

    let exercises = vec![
        // ── articulation ──
        exercise(
            "consonant-practice",
            "Consonant Practice",
            "Practice crisp consonant sounds at the start of words.",
            Difficulty::Easy,
            1,
            "articulation",
            10,
            StepPayload::WordList {
                items: vec![
                    WordItem::new("Park")
                        .with_target_sound("p")
                        .with_hint("Press your lips together, then release a puff of air."),
                    WordItem::new("Ball").with_target_sound("b"),
                    WordItem::new("Table")
                        .with_target_sound("t")
                        .with_hint("Tap your tongue just behind your top teeth."),
                    WordItem::new("Dog").with_target_sound("d"),
                    WordItem::new("Kite")
                        .with_target_sound("k")
                        .with_hint("Lift the back of your tongue to the roof of your mouth."),
                ],
            },
        ),
        exercise(
            "vowel-sounds",
            "Vowel Sounds",
            "Stretch and shape long vowel sounds.",
            Difficulty::Easy,
            1,
            "articulation",
            10,
            StepPayload::WordList {
                items: vec![
                    WordItem::new("Moon").with_target_sound("oo"),
                    WordItem::new("Tree").with_target_sound("ee"),
                    WordItem::new("Cake").with_target_sound("ay"),
                    WordItem::new("Boat").with_target_sound("oh"),
                    WordItem::new("Time").with_target_sound("eye"),
                ],
            },
        ),
        exercise(
            "minimal-pairs",
            "Minimal Pairs",
            "Contrast two words that differ by a single sound.",
            Difficulty::Medium,
            2,
            "articulation",
            15,
            StepPayload::PairList {
                items: vec![
                    contrast("ship", "chip", "sh vs ch"),
                    contrast("bat", "pat", "b vs p"),
                    contrast("fan", "van", "f vs v"),
                    contrast("thin", "fin", "th vs f"),
                ],
            },
        ),
        exercise(
            "tongue-twisters",
            "Tongue Twisters",
            "Practice these tongue twisters to improve articulation.",
            Difficulty::Hard,
            3,
            "articulation",
            25,
            StepPayload::PhraseList {
                items: strings(&[
                    "She sells seashells by the seashore.",
                    "Red lorry, yellow lorry.",
                    "Peter Piper picked a peck of pickled peppers.",
                ]),
            },
        ),
        // ── fluency ──
        exercise(
            "word-repetition",
            "Word Repetition",
            "Listen to the word and repeat it clearly.",
            Difficulty::Easy,
            1,
            "fluency",
            10,
            StepPayload::WordList {
                items: vec![
                    WordItem::new("Apple"),
                    WordItem::new("Window"),
                    WordItem::new("Hospital").with_hint("Say it in three beats: hos-pi-tal."),
                    WordItem::new("Beautiful").with_hint("Three beats: beau-ti-ful."),
                    WordItem::new("Conversation").with_hint("Four beats: con-ver-sa-tion."),
                ],
            },
        ),
        exercise(
            "smooth-phrases",
            "Smooth Phrases",
            "Glide through vowel transitions without pausing between words.",
            Difficulty::Medium,
            2,
            "fluency",
            15,
            StepPayload::PhraseList {
                items: strings(&["How are you", "I am ready", "Open the window"]),
            },
        ),
        exercise(
            "reading-practice",
            "Reading Practice",
            "Read the paragraph aloud at a steady pace.",
            Difficulty::Medium,
            2,
            "fluency",
            20,
            StepPayload::SentenceList {
                items: strings(&[
                    "The sun was shining brightly in the clear blue sky. Birds were singing in the trees, and flowers were blooming in the garden.",
                ]),
            },
        ),
        exercise(
            "paced-breathing",
            "Paced Breathing",
            "Coordinate breath and voice before speaking.",
            Difficulty::Easy,
            1,
            "fluency",
            5,
            StepPayload::StepList {
                items: vec![
                    TimedStep {
                        instruction: "Breathe in slowly".into(),
                        duration_seconds: 4,
                    },
                    TimedStep {
                        instruction: "Hold your breath".into(),
                        duration_seconds: 2,
                    },
                    TimedStep {
                        instruction: "Say hello as you breathe out".into(),
                        duration_seconds: 4,
                    },
                ],
            },
        ),
        // ── language ──
        exercise(
            "object-naming",
            "Object Naming",
            "Name the everyday objects out loud.",
            Difficulty::Easy,
            1,
            "language",
            10,
            StepPayload::WordList {
                items: vec![
                    WordItem::new("Clock").with_hint("It tells you the time."),
                    WordItem::new("Chair").with_hint("You sit on it."),
                    WordItem::new("Telephone").with_hint("You use it to call someone."),
                    WordItem::new("Glasses").with_hint("They help you see."),
                    WordItem::new("Book").with_hint("It has pages to read."),
                ],
            },
        ),
        exercise(
            "word-associations",
            "Word Associations",
            "Say the word, then think of related words.",
            Difficulty::Medium,
            2,
            "language",
            15,
            StepPayload::PairList {
                items: vec![
                    association("Sun", &["hot", "bright", "day"]),
                    association("Rain", &["wet", "umbrella", "cloud"]),
                    association("Kitchen", &["cook", "stove", "dinner"]),
                ],
            },
        ),
        exercise(
            "category-naming",
            "Category Naming",
            "Name the category, then list members of it.",
            Difficulty::Medium,
            2,
            "language",
            15,
            StepPayload::CategoryPromptList {
                items: vec![
                    CategoryPrompt {
                        name: "Fruits".into(),
                        examples: strings(&["apple", "banana", "orange"]),
                    },
                    CategoryPrompt {
                        name: "Animals".into(),
                        examples: strings(&["dog", "cat", "horse"]),
                    },
                    CategoryPrompt {
                        name: "Colors".into(),
                        examples: strings(&["red", "blue", "green"]),
                    },
                ],
            },
        ),
        exercise(
            "daily-conversation",
            "Daily Conversation",
            "Answer everyday questions in your own words.",
            Difficulty::Hard,
            3,
            "language",
            25,
            StepPayload::PromptList {
                items: strings(&[
                    "I would like a cup of tea",
                    "Today I feel happy",
                    "The weather is nice",
                ]),
            },
        ),
        // ── cognition ──
        exercise(
            "following-directions",
            "Following Directions",
            "Repeat each instruction back in order.",
            Difficulty::Medium,
            2,
            "cognition",
            15,
            StepPayload::InstructionList {
                main_instructions: "Listen to each instruction, then say it back before doing it."
                    .into(),
                items: strings(&[
                    "Touch your nose",
                    "Raise your right hand",
                    "Close your eyes and count to three",
                ]),
            },
        ),
        exercise(
            "story-recall",
            "Story Recall",
            "Read a short story aloud and recall the details.",
            Difficulty::Hard,
            3,
            "cognition",
            25,
            StepPayload::StoryList {
                items: vec![
                    StoryItem {
                        text: "Anna walked her dog to the park and met her friend Sam.".into(),
                        questions: strings(&["Who did Anna meet?", "Where did they go?"]),
                    },
                    StoryItem {
                        text: "Tom baked a chocolate cake for his sister's birthday.".into(),
                        questions: strings(&["What did Tom bake?", "Who was it for?"]),
                    },
                ],
            },
        ),
    ];

    CatalogDraft {
        categories,
        exercises,
    }
}
