use serde::{Deserialize, Serialize};

/// Served whenever generation is unavailable or fails. Content lookups hand
/// the caller prose, never an error.
pub const FALLBACK_TEXT: &str = "Fresh reading material is unavailable right now. \
Keep training - every session still counts - and check back here shortly.";

/// The fixed set of reader-facing topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topic {
    MemoryAndBrain,
    ReactionTime,
}

impl Topic {
    /// Unknown keys resolve to the default topic instead of erroring.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "reaction_time" | "reaction-time" | "reaction time" => Topic::ReactionTime,
            _ => Topic::MemoryAndBrain,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Topic::MemoryAndBrain => "memory_and_brain",
            Topic::ReactionTime => "reaction_time",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Topic::MemoryAndBrain => "Memory & Brain",
            Topic::ReactionTime => "Reaction Time",
        }
    }

    fn stock_text(self) -> &'static str {
        match self {
            Topic::MemoryAndBrain => {
                "Working memory lives in networks that rebuild themselves with use. \
Each time you hold a position in mind a few steps longer than feels comfortable, \
the synapses carrying that trace fire together and strengthen, and the hippocampus \
recruits new cells to support the load. Repeated over days, those strengthened \
connections make recall faster and less effortful, which is why short, regular \
sessions move the needle further than occasional marathons. The struggle you feel \
at the edge of your span is not failure - it is the training signal itself."
            }
            Topic::ReactionTime => {
                "Reaction speed is mostly wiring, and wiring responds to demand. \
Signals travel faster along nerve fibers wrapped in myelin, and timed practice \
prompts the cells that lay down that insulation to thicken it along the pathways \
you use most. At the same time the prefrontal circuits that turn a stimulus into \
a decision become more efficient, trimming milliseconds between seeing and acting. \
The quick judgments this training demands are exactly the kind of pressure those \
circuits need to streamline."
            }
        }
    }
}

/// Resolves a topic to a paragraph of reader-facing prose.
///
/// `stub` mode serves the built-in library. Any other mode - including a
/// future external text generator - must land on [`FALLBACK_TEXT`] when it
/// cannot produce text; failures never reach the caller.
#[derive(Debug, Clone)]
pub struct ContentRuntime {
    pub mode: String,
}

impl ContentRuntime {
    pub fn new_from_env() -> Self {
        // MINDTRAINER_CONTENT=off|stub
        let mode = std::env::var("MINDTRAINER_CONTENT")
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_else(|_| "stub".to_string());
        Self { mode }
    }

    /// Returns the text and whether it came from a live generator.
    pub fn generate(&self, topic: Topic) -> (String, bool) {
        match self.mode.as_str() {
            "stub" => (topic.stock_text().to_string(), false),
            // Future: external endpoint; its failures also land here.
            _ => (FALLBACK_TEXT.to_string(), false),
        }
    }
}

impl Default for ContentRuntime {
    fn default() -> Self {
        Self {
            mode: "stub".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_topic_keys_resolve_to_the_default() {
        assert_eq!(Topic::parse("Reaction Time"), Topic::ReactionTime);
        assert_eq!(Topic::parse("memory"), Topic::MemoryAndBrain);
        assert_eq!(Topic::parse(""), Topic::MemoryAndBrain);
        assert_eq!(Topic::parse("astrology"), Topic::MemoryAndBrain);
    }

    #[test]
    fn stub_mode_serves_distinct_topic_texts() {
        let rt = ContentRuntime::default();
        let (memory, _) = rt.generate(Topic::MemoryAndBrain);
        let (reaction, _) = rt.generate(Topic::ReactionTime);
        assert_ne!(memory, reaction);
        assert!(!memory.is_empty());
    }

    #[test]
    fn non_stub_modes_fall_back_instead_of_failing() {
        for mode in ["off", "openai", "garbage"] {
            let rt = ContentRuntime {
                mode: mode.to_string(),
            };
            let (text, generated) = rt.generate(Topic::ReactionTime);
            assert_eq!(text, FALLBACK_TEXT);
            assert!(!generated);
        }
    }
}
