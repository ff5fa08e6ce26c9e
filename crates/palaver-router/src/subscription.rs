//! Per-client subscription sets. The sentinel `"all"` means "every event
//! family except AudioChunkEvent" — chunk streaming is opt-in even for
//! clients that otherwise want everything, since it is by far the highest
//! volume stream.

use std::collections::HashSet;

pub const ALL: &str = "all";
pub const AUDIO_CHUNK_EVENT: &str = "AudioChunkEvent";

#[derive(Debug, Clone)]
pub struct Subscription {
    all: bool,
    explicit: HashSet<String>,
}

impl Subscription {
    pub fn from_tags(tags: impl IntoIterator<Item = String>) -> Self {
        let mut all = false;
        let mut explicit = HashSet::new();
        for tag in tags {
            if tag == ALL {
                all = true;
            } else {
                explicit.insert(tag);
            }
        }
        Self { all, explicit }
    }

    pub fn all() -> Self {
        Self::from_tags([ALL.to_string()])
    }

    /// Whether a client with this subscription should receive an event
    /// tagged `event_class`.
    pub fn wants(&self, event_class: &str) -> bool {
        if event_class == AUDIO_CHUNK_EVENT {
            return self.explicit.contains(event_class);
        }
        self.all || self.explicit.contains(event_class)
    }
}
