//! Deterministic keyword answers used when no generative backend answers.

/// Topic keyword to canned answer, checked in declaration order.
const TOPICS: &[(&str, &str)] = &[
    ("hello", "Hello! I can help with Arrow Conveyancing questions."),
    (
        "services",
        "Arrow Conveyancing offers property legal services, conveyancing, and fixed-fee legal work.",
    ),
    (
        "contact",
        "You can contact Arrow Conveyancing through their website at arrowconveyancing.co.uk",
    ),
    (
        "fee",
        "Arrow Conveyancing promises transparent, fixed legal fees for their services.",
    ),
    (
        "property",
        "They specialize in residential and commercial property transactions.",
    ),
    (
        "legal",
        "Their experienced legal team handles all aspects of property law.",
    ),
];

const DEFAULT_ANSWER: &str =
    "I can help with conveyancing questions. Ask about services, fees, or contact information.";

/// Keyword lookup over a fixed topic table. Total: always yields a
/// non-empty answer.
#[derive(Debug, Clone)]
pub struct FallbackTable {
    topics: Vec<(String, String)>,
    default_answer: String,
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self {
            topics: TOPICS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            default_answer: DEFAULT_ANSWER.to_string(),
        }
    }
}

impl FallbackTable {
    /// Build a custom table. Keywords are lowercased; an empty default is
    /// replaced with the built-in one.
    pub fn new(topics: Vec<(String, String)>, default_answer: impl Into<String>) -> Self {
        let default_answer = default_answer.into();
        let default_answer = if default_answer.trim().is_empty() {
            DEFAULT_ANSWER.to_string()
        } else {
            default_answer
        };
        Self {
            topics: topics
                .into_iter()
                .filter(|(_, answer)| !answer.trim().is_empty())
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
            default_answer,
        }
    }

    /// First topic whose keyword occurs in the lowercased message, else the
    /// default answer.
    pub fn answer(&self, message: &str) -> &str {
        let lowered = message.to_lowercase();
        self.topics
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword.as_str()))
            .map(|(_, answer)| answer.as_str())
            .unwrap_or(&self.default_answer)
    }

    pub fn default_answer(&self) -> &str {
        &self.default_answer
    }
}
