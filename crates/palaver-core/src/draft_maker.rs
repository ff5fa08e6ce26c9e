//! DraftMaker: assembles Drafts from TextEvents using start/end pattern
//! sets, maintaining a rolling search buffer and an index back to the
//! originating TextEvents so match offsets resolve to audio time ranges.

use crate::fuzzy::{clean_with_index_map, partial_ratio, ratio};
use crate::patterns::Pattern;
use crate::types::{Draft, DraftEvent, EventId, TextEvent, FORCED_END_TEXT};
use uuid::Uuid;

const PARTIAL_MATCH_THRESHOLD: u32 = 85;
const REQUIRED_WORD_THRESHOLD: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchClass {
    Start,
    End,
}

struct Winner {
    class: MatchClass,
    pattern_phrase: String,
    score: u32,
    /// Byte range in the *cleaned* buffer.
    clean_start: usize,
    clean_end: usize,
}

/// `(TextEvent, start_pos, end_pos)`: start/end are byte offsets into the
/// punctuated search buffer where this event's text landed.
struct IndexedEvent {
    event: TextEvent,
    start_pos: usize,
    end_pos: usize,
}

pub struct DraftMaker {
    start_patterns: Vec<Pattern>,
    end_patterns: Vec<Pattern>,
    buffer: String,
    index: Vec<IndexedEvent>,
    open_draft: Option<Draft>,
}

impl DraftMaker {
    pub fn new(start_patterns: Vec<Pattern>, end_patterns: Vec<Pattern>) -> Self {
        Self {
            start_patterns,
            end_patterns,
            buffer: String::new(),
            index: Vec::new(),
            open_draft: None,
        }
    }

    pub fn has_open_draft(&self) -> bool {
        self.open_draft.is_some()
    }

    /// Feeds one TextEvent, appending it to the search buffer and running
    /// the matcher to exhaustion, applying the transition table after each
    /// match. Returns the DraftEvents produced, in order.
    pub fn process(&mut self, text_event: TextEvent) -> Vec<DraftEvent> {
        let start_pos = if self.buffer.is_empty() {
            0
        } else {
            self.buffer.push(' ');
            self.buffer.len()
        };
        self.buffer.push_str(&text_event.text);
        let end_pos = self.buffer.len();
        self.index.push(IndexedEvent {
            event: text_event,
            start_pos,
            end_pos,
        });

        let mut out = Vec::new();
        while let Some(winner) = self.best_match() {
            let (actual_start, actual_end) = self.find_real_range(winner.clean_start, winner.clean_end);
            out.extend(self.apply_transition(winner, actual_start, actual_end));
        }
        out
    }

    /// Closes any open draft with the sentinel forced-end text, emitting
    /// DraftEnd, and clears the search buffer.
    pub fn force_end(&mut self) -> Option<DraftEvent> {
        let mut draft = self.open_draft.take()?;
        draft.end_text = FORCED_END_TEXT.to_string();
        draft.full_text = self.buffer.clone();
        draft.audio_end_time = self
            .index
            .last()
            .map(|e| e.event.audio_end_time)
            .unwrap_or(draft.audio_start_time);
        self.buffer.clear();
        self.index.clear();
        Some(DraftEvent::DraftEnd(draft))
    }

    /// Imports an already-complete rescanned draft, emitting DraftRescan
    /// without touching in-progress buffer state.
    pub fn import_draft(&self, draft: Draft) -> Option<DraftEvent> {
        let original_id = draft.parent_draft_id?;
        Some(DraftEvent::DraftRescan {
            original_id,
            revised_draft: draft,
        })
    }

    fn best_match(&self) -> Option<Winner> {
        let (cleaned, _index_map) = clean_with_index_map(&self.buffer);
        if cleaned.is_empty() {
            return None;
        }

        let candidates: Vec<(MatchClass, &Pattern)> = self
            .start_patterns
            .iter()
            .map(|p| (MatchClass::Start, p))
            .chain(self.end_patterns.iter().map(|p| (MatchClass::End, p)))
            .collect();

        let mut best: Option<Winner> = None;
        for (class, pattern) in candidates {
            if !pattern.required_words.is_empty() {
                let words_present = pattern.required_words.iter().all(|w| {
                    cleaned
                        .split_whitespace()
                        .any(|token| ratio(token, w) >= REQUIRED_WORD_THRESHOLD)
                });
                if !words_present {
                    continue;
                }
            }

            let (window_start, window_end, score) = self.best_window(&cleaned, &pattern.phrase);
            if score < PARTIAL_MATCH_THRESHOLD {
                continue;
            }

            let is_better = match &best {
                None => true,
                Some(b) => {
                    score > b.score
                        || (score == b.score && window_end < b.clean_end)
                        || (score == b.score
                            && window_end == b.clean_end
                            && (window_end - window_start) > (b.clean_end - b.clean_start))
                }
            };
            if is_better {
                best = Some(Winner {
                    class,
                    pattern_phrase: pattern.phrase.clone(),
                    score,
                    clean_start: window_start,
                    clean_end: window_end,
                });
            }
        }
        best
    }

    /// Slides `pattern` over `cleaned` at pattern-length windows, returning
    /// the best-scoring window's `(start, end, score)` in byte offsets into
    /// `cleaned`.
    fn best_window(&self, cleaned: &str, pattern: &str) -> (usize, usize, u32) {
        let cleaned_chars: Vec<char> = cleaned.chars().collect();
        let pattern_len = pattern.chars().count();
        if pattern_len == 0 || cleaned_chars.is_empty() {
            return (0, 0, 0);
        }
        if cleaned_chars.len() <= pattern_len {
            return (0, cleaned.len(), partial_ratio(pattern, cleaned));
        }

        let mut best = (0usize, 0usize, 0u32);
        for start in 0..=(cleaned_chars.len() - pattern_len) {
            let window: String = cleaned_chars[start..start + pattern_len].iter().collect();
            let score = ratio(pattern, &window);
            if score > best.2 {
                let byte_start: usize = cleaned_chars[..start].iter().map(|c| c.len_utf8()).sum();
                let byte_end = byte_start + window.len();
                best = (byte_start, byte_end, score);
            }
        }
        best
    }

    /// Re-locates the true `(start, end)` byte offsets in the original
    /// punctuated buffer by walking word-by-word through the index map,
    /// rather than a naive substring search (which would be fooled by
    /// punctuation stripped during cleaning).
    fn find_real_range(&self, clean_start: usize, clean_end: usize) -> (usize, usize) {
        let (cleaned, index_map) = clean_with_index_map(&self.buffer);
        let clamp = |i: usize| i.min(index_map.len().saturating_sub(1));
        if index_map.is_empty() {
            return (0, self.buffer.len());
        }

        let start_char_idx = cleaned[..clean_start.min(cleaned.len())].chars().count();
        let end_char_idx = cleaned[..clean_end.min(cleaned.len())].chars().count();

        let real_start = index_map.get(start_char_idx).copied().unwrap_or(0);
        let mut real_end = index_map
            .get(end_char_idx.saturating_sub(1))
            .copied()
            .unwrap_or(clamp(index_map.len() - 1));

        // advance past the matched char itself plus any trailing
        // whitespace/punctuation up to (not including) the next word
        let bytes = self.buffer.as_bytes();
        let mut cursor = real_end + 1;
        while cursor < bytes.len() && !(bytes[cursor] as char).is_alphanumeric() {
            cursor += 1;
        }
        real_end = cursor;

        (real_start, real_end.min(self.buffer.len()))
    }

    fn apply_transition(&mut self, winner: Winner, actual_start: usize, actual_end: usize) -> Vec<DraftEvent> {
        let mut out = Vec::new();
        match (self.open_draft.is_some(), winner.class) {
            (false, MatchClass::Start) => {
                let audio_start_time = self.event_spanning(actual_start).map(|e| e.audio_start_time).unwrap_or(0.0);
                let draft = Draft {
                    draft_id: Uuid::new_v4(),
                    parent_draft_id: None,
                    timestamp: audio_start_time,
                    audio_start_time,
                    audio_end_time: audio_start_time,
                    start_text: winner.pattern_phrase.clone(),
                    end_text: String::new(),
                    full_text: String::new(),
                    start_matched_events: self.events_spanning(actual_start, actual_end),
                    end_matched_events: Vec::new(),
                };
                self.open_draft = Some(draft.clone());
                out.push(DraftEvent::DraftStart(draft));
                self.trim_buffer_to(actual_end);
            }
            (true, MatchClass::Start) => {
                // close current draft with end_text = matched, full_text = buffer[:actual_start]
                let mut closing = self.open_draft.take().unwrap();
                closing.end_text = winner.pattern_phrase.clone();
                closing.full_text = self.buffer[..actual_start.min(self.buffer.len())].to_string();
                closing.audio_end_time = self.event_spanning(actual_start).map(|e| e.audio_end_time).unwrap_or(closing.audio_start_time);
                out.push(DraftEvent::DraftEnd(closing));

                let audio_start_time = self.event_spanning(actual_start).map(|e| e.audio_start_time).unwrap_or(0.0);
                let draft = Draft {
                    draft_id: Uuid::new_v4(),
                    parent_draft_id: None,
                    timestamp: audio_start_time,
                    audio_start_time,
                    audio_end_time: audio_start_time,
                    start_text: winner.pattern_phrase.clone(),
                    end_text: String::new(),
                    full_text: String::new(),
                    start_matched_events: self.events_spanning(actual_start, actual_end),
                    end_matched_events: Vec::new(),
                };
                self.open_draft = Some(draft.clone());
                out.push(DraftEvent::DraftStart(draft));
                self.trim_buffer_to(actual_end);
            }
            (true, MatchClass::End) => {
                let mut draft = self.open_draft.take().unwrap();
                draft.end_text = winner.pattern_phrase.clone();
                draft.full_text = self.buffer[..actual_end.min(self.buffer.len())].to_string();
                draft.audio_end_time = self.event_spanning(actual_end).map(|e| e.audio_end_time).unwrap_or(draft.audio_start_time);
                draft.end_matched_events = self.events_spanning(actual_start, actual_end);
                out.push(DraftEvent::DraftEnd(draft));
                self.trim_buffer_to(actual_end);
            }
            (false, MatchClass::End) => {
                tracing::warn!(pattern = %winner.pattern_phrase, "end phrase matched with no open draft, dropping");
                self.trim_buffer_to(actual_end);
            }
        }
        out
    }

    fn event_spanning(&self, byte_pos: usize) -> Option<&TextEvent> {
        self.index
            .iter()
            .find(|e| byte_pos >= e.start_pos && byte_pos <= e.end_pos)
            .map(|e| &e.event)
    }

    fn events_spanning(&self, start: usize, end: usize) -> Vec<EventId> {
        self.index
            .iter()
            .filter(|e| e.end_pos > start && e.start_pos < end)
            .map(|e| e.event.event_id)
            .collect()
    }

    /// Trims the buffer to `[actual_end, ..]` and drops any index entries
    /// fully consumed by the boundary, shifting remaining offsets.
    fn trim_buffer_to(&mut self, actual_end: usize) {
        let actual_end = actual_end.min(self.buffer.len());
        self.buffer = self.buffer[actual_end..].trim_start().to_string();

        self.index.retain_mut(|e| {
            if e.end_pos <= actual_end {
                false
            } else {
                e.start_pos = e.start_pos.saturating_sub(actual_end);
                e.end_pos = e.end_pos.saturating_sub(actual_end);
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{default_draft_end_patterns, default_draft_start_patterns, DEFAULT_NAMES};

    fn maker() -> DraftMaker {
        DraftMaker::new(
            default_draft_start_patterns(DEFAULT_NAMES),
            default_draft_end_patterns(DEFAULT_NAMES),
        )
    }

    fn text_event(text: &str) -> TextEvent {
        TextEvent::new(Uuid::new_v4(), 0.0, 1.0, text)
    }

    #[test]
    fn single_note_produces_one_bracketed_draft() {
        let mut m = maker();
        let events = m.process(text_event(
            "rupert take this down hello world break break break",
        ));
        let starts = events
            .iter()
            .filter(|e| matches!(e, DraftEvent::DraftStart(_)))
            .count();
        let ends = events
            .iter()
            .filter(|e| matches!(e, DraftEvent::DraftEnd(_)))
            .count();
        assert_eq!(starts, 1);
        assert_eq!(ends, 1);
        if let Some(DraftEvent::DraftEnd(d)) = events.iter().find(|e| matches!(e, DraftEvent::DraftEnd(_))) {
            assert!(d.full_text.contains("hello world"));
        }
    }

    #[test]
    fn back_to_back_starts_auto_close_prior_draft() {
        let mut m = maker();
        let events = m.process(text_event(
            "rupert take this down first rupert take this down second rupert stop draft",
        ));
        let ends: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                DraftEvent::DraftEnd(d) => Some(d.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(ends.len(), 2);
        assert!(ends[0].full_text.contains("first"));
    }

    #[test]
    fn force_end_uses_forced_sentinel() {
        let mut m = maker();
        m.process(text_event("rupert take this down unfinished thought"));
        assert!(m.has_open_draft());
        let ev = m.force_end().unwrap();
        match ev {
            DraftEvent::DraftEnd(d) => assert_eq!(d.end_text, FORCED_END_TEXT),
            _ => panic!("expected DraftEnd"),
        }
        assert!(!m.has_open_draft());
    }

    #[test]
    fn end_phrase_with_no_open_draft_is_dropped() {
        let mut m = maker();
        let events = m.process(text_event("break break break"));
        assert!(events.is_empty());
    }
}
