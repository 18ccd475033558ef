//! Canned responder with fixed simulated latency
//!
//! Stands in for the AI service. Replies are deterministic: the first topic
//! with a keyword among the message's words picks the reply. Keywords match
//! whole words, or the word plus a plural `s`.

use super::{Responder, ResponderError, ResponseRequest};
use async_trait::async_trait;
use std::time::Duration;

const TOPICS: &[(&[&str], &str)] = &[
    (
        &["visa", "permit", "immigration"],
        "Student visa requirements depend on your destination country. You will usually need \
         an offer letter, proof of funds, and a valid passport. Check the Visa section of your \
         dashboard for the checklist that matches your application.",
    ),
    (
        &["scholarship", "funding", "financial aid", "loan"],
        "There are merit-based and need-based scholarships for international students. Open the \
         Scholarships tab to see the awards matched to your profile and their deadlines.",
    ),
    (
        &["document", "transcript", "statement of purpose", "recommendation"],
        "Most universities ask for academic transcripts, a statement of purpose, letters of \
         recommendation, and test scores. You can upload each of these from the Documents page.",
    ),
    (
        &["university", "universities", "college", "courses", "program"],
        "I can help you shortlist universities. Tell me your preferred country, field of study, \
         and budget, and I will suggest programs that fit your profile.",
    ),
    (
        &["apply", "applying", "application", "deadline", "admission"],
        "To apply, pick your target programs, complete your profile, upload the required \
         documents, and submit before each program's deadline. Your Applications dashboard \
         tracks the status of every submission.",
    ),
];

const FALLBACK_REPLY: &str = "Thanks for your question! I'm your UNI360 study-abroad assistant. \
     I can help with university shortlisting, applications, documents, scholarships, and visas. \
     What would you like to know more about?";

/// Pick the canned reply for a message
pub fn canned_reply(message: &str) -> &'static str {
    let lowered = message.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    TOPICS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| mentions(&words, k)))
        .map_or(FALLBACK_REPLY, |(_, reply)| *reply)
}

/// Whether `keyword` (one or more words) appears as consecutive words
fn mentions(words: &[&str], keyword: &str) -> bool {
    let parts: Vec<&str> = keyword.split(' ').collect();
    words.windows(parts.len()).any(|window| {
        window
            .iter()
            .zip(&parts)
            .all(|(word, part)| word_matches(word, part))
    })
}

fn word_matches(word: &str, keyword: &str) -> bool {
    word.strip_prefix(keyword)
        .is_some_and(|rest| rest.is_empty() || rest == "s")
}

/// Responder that waits a fixed latency then answers from a fixed table
#[derive(Debug, Clone)]
pub struct CannedResponder {
    latency: Duration,
}

impl CannedResponder {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl Responder for CannedResponder {
    async fn respond(&self, request: &ResponseRequest) -> Result<String, ResponderError> {
        tokio::time::sleep(self.latency).await;
        Ok(canned_reply(&request.message).to_string())
    }

    fn name(&self) -> &str {
        "canned"
    }
}
