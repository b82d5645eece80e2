//! Story data model: segments, dialogue lines, choices and history.
//!
//! Everything here serializes with camelCase field names, which is the shape
//! used by save files and imported scripts.

use serde::{Deserialize, Serialize};

/// Choice id that asks for the story-opening generator.
pub const START_GAME_CHOICE_ID: &str = "start_game";

/// The playable character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protagonist {
    #[serde(rename = "MALE")]
    Male,
    #[serde(rename = "FEMALE")]
    Female,
}

impl Protagonist {
    /// Full name as shown in menus and prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Protagonist::Male => "凯伦·凡斯 (Kaelen)",
            Protagonist::Female => "艾拉拉·凡斯 (Elara)",
        }
    }

    /// Name used as a dialogue speaker.
    pub fn speaker_name(&self) -> &'static str {
        match self {
            Protagonist::Male => "凯伦",
            Protagonist::Female => "艾拉拉",
        }
    }

    /// Words that mark this character as present in a scene description.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Protagonist::Male => &["凯伦", "Kaelen", "男主"],
            Protagonist::Female => &["艾拉拉", "Elara", "女主"],
        }
    }

    /// Parse a command-line style name ("male", "kaelen", "f", ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "kaelen" | "凯伦" => Some(Protagonist::Male),
            "female" | "f" | "elara" | "艾拉拉" => Some(Protagonist::Female),
            _ => None,
        }
    }
}

impl std::fmt::Display for Protagonist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Emotion tag on a dialogue line. Unknown tags read as neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Angry,
    Sad,
    Surprised,
    Determined,
    Fear,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Angry,
        Emotion::Sad,
        Emotion::Surprised,
        Emotion::Determined,
        Emotion::Fear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Angry => "angry",
            Emotion::Sad => "sad",
            Emotion::Surprised => "surprised",
            Emotion::Determined => "determined",
            Emotion::Fear => "fear",
        }
    }
}

impl From<String> for Emotion {
    fn from(s: String) -> Self {
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .unwrap_or_default()
    }
}

impl From<Option<String>> for Emotion {
    fn from(s: Option<String>) -> Self {
        s.map(Emotion::from).unwrap_or_default()
    }
}

/// One line of dialogue or narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueLine {
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub emotion: Emotion,
    /// Inner-monologue aside shown under the line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monologue: Option<String>,
}

impl DialogueLine {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            emotion: Emotion::Neutral,
            monologue: None,
        }
    }

    pub fn with_emotion(mut self, emotion: Emotion) -> Self {
        self.emotion = emotion;
        self
    }

    pub fn with_monologue(mut self, monologue: impl Into<String>) -> Self {
        self.monologue = Some(monologue.into());
        self
    }
}

/// What kind of action a choice represents. Unknown kinds read as continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum ChoiceKind {
    Action,
    Dialogue,
    Deduction,
    #[default]
    Continue,
}

impl From<String> for ChoiceKind {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "action" => ChoiceKind::Action,
            "dialogue" => ChoiceKind::Dialogue,
            "deduction" => ChoiceKind::Deduction,
            _ => ChoiceKind::Continue,
        }
    }
}

impl From<Option<String>> for ChoiceKind {
    fn from(s: Option<String>) -> Self {
        s.map(ChoiceKind::from).unwrap_or_default()
    }
}

/// A player choice offered at the end of a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: String,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: ChoiceKind,
    /// Target node when playing an imported script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_scene_id: Option<String>,
}

impl Choice {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kind: ChoiceKind::Continue,
            next_scene_id: None,
        }
    }

    pub fn with_kind(mut self, kind: ChoiceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_next_scene(mut self, id: impl Into<String>) -> Self {
        self.next_scene_id = Some(id.into());
        self
    }
}

/// Ending category of a terminal segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum EndingType {
    True,
    Good,
    Normal,
    Bad,
    Dead,
}

impl EndingType {
    /// Bad and dead endings count as a loss.
    pub fn is_defeat(&self) -> bool {
        matches!(self, EndingType::Bad | EndingType::Dead)
    }

    /// Title shown on the ending screen.
    pub fn title(&self) -> &'static str {
        match self {
            EndingType::True => "真结局 (True Ending)",
            EndingType::Good => "好结局 (Good Ending)",
            EndingType::Normal => "普通结局 (Normal Ending)",
            EndingType::Bad => "坏结局 (Bad Ending)",
            EndingType::Dead => "死亡 (DEAD END)",
        }
    }
}

impl From<String> for EndingType {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "true" => EndingType::True,
            "good" => EndingType::Good,
            "bad" => EndingType::Bad,
            "dead" => EndingType::Dead,
            _ => EndingType::Normal,
        }
    }
}

/// One narrative beat. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySegment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub visual_description: String,
    pub lines: Vec<DialogueLine>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub is_ending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending_type: Option<EndingType>,
}

impl StorySegment {
    pub fn new(visual_description: impl Into<String>) -> Self {
        Self {
            id: None,
            visual_description: visual_description.into(),
            lines: Vec::new(),
            choices: Vec::new(),
            is_ending: false,
            ending_type: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_line(mut self, line: DialogueLine) -> Self {
        self.lines.push(line);
        self
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    /// Mark as terminal with the given category.
    pub fn ending(mut self, ending_type: EndingType) -> Self {
        self.is_ending = true;
        self.ending_type = Some(ending_type);
        self
    }

    /// Look up an offered choice by id.
    pub fn find_choice(&self, id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == id)
    }

    /// Whether this segment ends the game in defeat.
    pub fn is_defeat(&self) -> bool {
        self.is_ending && self.ending_type.is_some_and(|e| e.is_defeat())
    }
}

/// A history entry: a shown segment and the choice that left it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameHistoryItem {
    pub segment: StorySegment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_made: Option<String>,
}

impl GameHistoryItem {
    pub fn new(segment: StorySegment) -> Self {
        Self {
            segment,
            choice_made: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protagonist_wire_names() {
        assert_eq!(serde_json::to_string(&Protagonist::Male).unwrap(), "\"MALE\"");
        let p: Protagonist = serde_json::from_str("\"FEMALE\"").unwrap();
        assert_eq!(p, Protagonist::Female);
    }

    #[test]
    fn test_protagonist_parse() {
        assert_eq!(Protagonist::parse("Kaelen"), Some(Protagonist::Male));
        assert_eq!(Protagonist::parse(" f "), Some(Protagonist::Female));
        assert_eq!(Protagonist::parse("bob"), None);
    }

    #[test]
    fn test_segment_defaults_from_minimal_json() {
        let seg: StorySegment =
            serde_json::from_str(r#"{"lines":[{"speaker":"旁白","text":"夜色"}]}"#).unwrap();
        assert_eq!(seg.id, None);
        assert!(seg.choices.is_empty());
        assert!(!seg.is_ending);
        assert_eq!(seg.lines[0].emotion, Emotion::Neutral);
    }

    #[test]
    fn test_segment_requires_lines() {
        let result: Result<StorySegment, _> = serde_json::from_str(r#"{"visualDescription":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_lenient_enums() {
        let line: DialogueLine =
            serde_json::from_str(r#"{"speaker":"a","text":"b","emotion":"Confused"}"#).unwrap();
        assert_eq!(line.emotion, Emotion::Neutral);

        let choice: Choice = serde_json::from_str(r#"{"id":"c1","text":"go"}"#).unwrap();
        assert_eq!(choice.kind, ChoiceKind::Continue);

        let choice: Choice =
            serde_json::from_str(r#"{"id":"c1","text":"go","type":"deduction"}"#).unwrap();
        assert_eq!(choice.kind, ChoiceKind::Deduction);
    }

    #[test]
    fn test_null_enum_tags_use_defaults() {
        let line: DialogueLine =
            serde_json::from_str(r#"{"speaker":"a","text":"b","emotion":null}"#).unwrap();
        assert_eq!(line.emotion, Emotion::Neutral);

        let choice: Choice =
            serde_json::from_str(r#"{"id":"c1","text":"go","type":null}"#).unwrap();
        assert_eq!(choice.kind, ChoiceKind::Continue);
    }

    #[test]
    fn test_camel_case_round_shape() {
        let seg = StorySegment::new("hall")
            .with_id("a")
            .with_choice(Choice::new("c", "next").with_next_scene("b"));
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["visualDescription"], "hall");
        assert_eq!(json["choices"][0]["nextSceneId"], "b");
        assert_eq!(json["choices"][0]["type"], "continue");
        assert_eq!(json["isEnding"], false);
    }

    #[test]
    fn test_defeat_classification() {
        assert!(StorySegment::new("x").ending(EndingType::Dead).is_defeat());
        assert!(!StorySegment::new("x").ending(EndingType::Normal).is_defeat());
        let mut untyped = StorySegment::new("x");
        untyped.is_ending = true;
        assert!(!untyped.is_defeat());
    }
}
