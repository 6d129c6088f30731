use std::collections::BTreeMap;

/// Characters stripped from both ends before looking a phrase up.
pub const GREETING_TRIM: &[char] = &['!', '?', '.', ' '];

pub fn default_greetings() -> BTreeMap<String, String> {
    [
        ("hi", "Hello! How can I help you today?"),
        ("hello", "Hi there! What can I do for you?"),
        ("hey", "Hey! Need any help with campus info?"),
        ("good morning", "Good morning! How can I assist you?"),
        ("good afternoon", "Good afternoon! What's on your mind?"),
        ("good evening", "Good evening! How can I help?"),
        (
            "how are you",
            "I'm just a bot, but I'm functioning perfectly! How can I help you?",
        ),
        (
            "who are you",
            "I am the Student Support Bot, specialized in answering queries about the campus, exams, and facilities.",
        ),
    ]
    .into_iter()
    .map(|(phrase, reply)| (phrase.to_string(), reply.to_string()))
    .collect()
}

/// Literal, case-insensitive table of conversational openers.
#[derive(Debug, Clone)]
pub struct GreetingTable {
    replies: BTreeMap<String, String>,
}

impl GreetingTable {
    pub fn new(replies: &BTreeMap<String, String>) -> Self {
        Self {
            replies: replies
                .iter()
                .map(|(phrase, reply)| (phrase.to_lowercase(), reply.clone()))
                .collect(),
        }
    }

    pub fn match_greeting(&self, text: &str) -> Option<&str> {
        let key = text.to_lowercase();
        self.replies
            .get(key.trim_matches(GREETING_TRIM))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }
}

impl Default for GreetingTable {
    fn default() -> Self {
        Self::new(&default_greetings())
    }
}
