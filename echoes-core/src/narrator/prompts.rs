//! Prompt construction for segment generation.

use super::NarratorConfig;
use crate::story::{GameHistoryItem, Protagonist};

/// Story phase derived from the turn count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    Setup,
    Investigation,
    Climax,
}

impl Pacing {
    pub fn for_turn(turn: usize) -> Self {
        if turn < 10 {
            Pacing::Setup
        } else if turn < 25 {
            Pacing::Investigation
        } else {
            Pacing::Climax
        }
    }

    pub fn directive(&self) -> &'static str {
        match self {
            Pacing::Setup => {
                "Phase: escape and bonding. The two leads are thrown together by the attack; \
                 build the immediate threat and the friction between them. Do not end the story."
            }
            Pacing::Investigation => {
                "Phase: investigation. Follow clues about who attacked the wedding and why; \
                 reveal one concrete piece of the conspiracy per scene."
            }
            Pacing::Climax => {
                "Phase: climax. Draw the threads together toward a confrontation. \
                 An ending may now be reached when the player's choices earn it."
            }
        }
    }
}

/// The fixed system instruction.
pub fn system_prompt(config: &NarratorConfig) -> String {
    let mut prompt = String::new();

    prompt.push_str(include_str!("prompts/game_master.txt"));
    prompt.push_str(&format!(
        "\nLanguage: every line, monologue and choice text MUST be written in {}.\n",
        config.language
    ));

    prompt.push('\n');
    prompt.push_str(include_str!("prompts/continuity.txt"));

    prompt.push('\n');
    prompt.push_str(include_str!("prompts/characters.txt"));

    prompt.push('\n');
    prompt.push_str(include_str!("prompts/output_rules.txt"));

    if let Some(ref extra) = config.custom_instructions {
        prompt.push_str("\n## Additional Instructions\n");
        prompt.push_str(extra);
        prompt.push('\n');
    }

    prompt
}

/// Prompt for the first generated scene, right after the prelude.
pub fn opening_prompt(protagonist: Protagonist, config: &NarratorConfig) -> String {
    format!(
        "Begin the story from the point of view of {protagonist}.\n\
         Scene: the wedding hall.\n\
         Inciting incident: an explosion shatters the dome and armed attackers storm in.\n\
         \n\
         Tasks:\n\
         1. Show the visual impact of the explosion.\n\
         2. Give the protagonist a defining moment (Kaelen protects, Elara analyzes).\n\
         3. Establish the first interaction between the two leads.\n\
         4. Tag every line with an emotion.\n\
         Offer three choices: one action, one deduction, one dialogue.\n\
         Write in {}.",
        config.language
    )
}

/// Prompt for every later scene.
pub fn continuation_prompt(
    protagonist: Protagonist,
    history: &[GameHistoryItem],
    choice_text: &str,
    config: &NarratorConfig,
) -> String {
    let turn = history.len();
    let pacing = Pacing::for_turn(turn);
    let previous_scene = history
        .last()
        .map(|item| item.segment.visual_description.as_str())
        .unwrap_or("");

    let mut prompt = String::new();
    prompt.push_str(&format!("Protagonist: {protagonist}\n"));
    prompt.push_str(&format!("Turn: {turn}\n"));
    prompt.push_str(&format!("Pacing: {}\n", pacing.directive()));

    prompt.push_str("\n## Recent History\n");
    prompt.push_str(&history_window(history, config.history_window));

    prompt.push_str(&format!("\nPrevious scene: \"{previous_scene}\"\n"));
    prompt.push_str(&format!("Player choice: \"{choice_text}\"\n"));

    prompt.push_str(&format!(
        "\nTasks:\n\
         1. The first line must show the direct physical consequence of \"{choice_text}\".\n\
         2. Describe the route and surroundings whenever the scene moves.\n\
         3. Keep both characters in character.\n\
         Write 3-6 lines in {}.",
        config.language
    ));
    prompt
}

/// The last `window` history entries as speaker/text/choice triples.
pub fn history_window(history: &[GameHistoryItem], window: usize) -> String {
    let start = history.len().saturating_sub(window);
    let mut out = String::new();
    for (i, item) in history.iter().enumerate().skip(start) {
        out.push_str(&format!("[Turn {}]\n", i + 1));
        for line in &item.segment.lines {
            out.push_str(&format!("{}: {}\n", line.speaker, line.text));
        }
        if let Some(ref choice) = item.choice_made {
            out.push_str(&format!("> Choice: {choice}\n"));
        }
    }
    out
}
