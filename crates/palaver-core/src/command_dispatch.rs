//! CommandDispatch: fuzzy-matches `TextEvent.text` against attention and
//! command phrase families, gating commands behind an attention state when
//! configured to require it.

use crate::fuzzy::{partial_ratio_alignment, ratio};
use crate::patterns::{CommandDefinition, Pattern};
use crate::types::{CommandEvent, CommandKind, TextEvent};

#[derive(Debug, Clone)]
pub struct CommandDispatchConfig {
    pub require_alerts: bool,
    pub attention_score: u32,
    pub command_score: u32,
}

impl Default for CommandDispatchConfig {
    fn default() -> Self {
        Self {
            require_alerts: true,
            attention_score: 70,
            command_score: 75,
        }
    }
}

/// Checks whether `text` clears `threshold` against any attention/command
/// phrase, using the two-stage gate from the original dispatcher: a
/// partial-ratio alignment must first clear `threshold * 0.9` before the
/// full-string ratio against `threshold` is evaluated. Returns the winning
/// phrase and score.
fn two_stage_match<'a>(text: &str, phrases: &'a [Pattern], threshold: u32) -> Option<(&'a str, u32)> {
    let prelim_threshold = ((threshold as f32) * 0.9).round() as u32;
    let mut best: Option<(&str, u32)> = None;
    for pattern in phrases {
        let (prelim, alignment) = partial_ratio_alignment(&pattern.phrase, text);
        if prelim < prelim_threshold {
            continue;
        }
        let full = ratio(&pattern.phrase, &alignment);
        if full >= threshold && best.map_or(true, |(_, b)| full > b) {
            best = Some((pattern.phrase.as_str(), full));
        }
    }
    best
}

pub struct CommandDispatch {
    config: CommandDispatchConfig,
    attention_patterns: Vec<Pattern>,
    commands: Vec<CommandDefinition>,
    alert_active: bool,
    alert_text_event: Option<TextEvent>,
    in_block: bool,
}

impl CommandDispatch {
    pub fn new(
        config: CommandDispatchConfig,
        attention_patterns: Vec<Pattern>,
        commands: Vec<CommandDefinition>,
    ) -> Self {
        Self {
            config,
            attention_patterns,
            commands,
            alert_active: false,
            alert_text_event: None,
            in_block: false,
        }
    }

    /// Feeds one TextEvent, returning the CommandEvents it produced, in
    /// the order their owning definitions are configured.
    pub fn process(&mut self, text_event: &TextEvent) -> Vec<CommandEvent> {
        if self.config.require_alerts && !self.alert_active {
            if let Some((matched, _score)) =
                two_stage_match(&text_event.text, &self.attention_patterns, self.config.attention_score)
            {
                self.alert_active = true;
                self.alert_text_event = Some(text_event.clone());
                tracing::debug!(phrase = matched, "attention phrase matched");
            } else {
                return Vec::new();
            }
        }

        let mut out = Vec::new();
        for def in &self.commands {
            if self.in_block && def.name == "start_block" {
                continue;
            }
            if let Some((matched, _score)) =
                two_stage_match(&text_event.text, &def.phrases, self.config.command_score)
            {
                let offset = text_event.text.to_lowercase().find(matched).unwrap_or(0);
                let command = match def.name.as_str() {
                    "start_block" => CommandKind::StartBlock,
                    "stop_block" => CommandKind::StopBlock,
                    other => CommandKind::Custom(other.to_string()),
                };
                let is_stop = matches!(command, CommandKind::StopBlock);
                let is_start = matches!(command, CommandKind::StartBlock);

                out.push(CommandEvent {
                    command,
                    matched_pattern: matched.to_string(),
                    match_offset: offset,
                    matched_text: matched.to_string(),
                    text_event: text_event.clone(),
                    alert_text_event: self.alert_text_event.clone(),
                });

                if is_start {
                    self.in_block = true;
                }
                if is_stop {
                    self.in_block = false;
                    self.alert_active = false;
                    self.alert_text_event = None;
                }
            }
        }
        out
    }
}
