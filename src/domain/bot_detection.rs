use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    constants::{MAX_FORM_AGE_MS, MIN_FILL_TIME_MS},
    entities::contact::ContactSubmission,
};

/// Promotional phrases typical of automated form spam.
static SPAM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bbuy now\b",
        r"\bclick here\b",
        r"\bfree money\b",
        r"\bmake money (fast|online)\b",
        r"\bwork from home\b",
        r"\bviagra\b",
        r"\bcialis\b",
        r"\bcasino\b",
        r"\blottery\b",
        r"\blorem ipsum\b",
        r"\blimited time offer\b",
        r"\bcrypto(currency)? investment\b",
        r"\bseo services\b",
        r"\b100% free\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid spam pattern"))
    .collect()
});

/// Why a submission was classified as automated. Logged, never shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotSignal {
    Honeypot,
    ImplausibleTimestamp,
    TooFast,
    SpamContent,
}

impl fmt::Display for BotSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BotSignal::Honeypot => "honeypot",
            BotSignal::ImplausibleTimestamp => "implausible_timestamp",
            BotSignal::TooFast => "too_fast",
            BotSignal::SpamContent => "spam_content",
        };
        write!(f, "{s}")
    }
}

/// First matching signal, checked in order: honeypot, render timestamp
/// plausibility, fill time, content. A timestamp from the future or older
/// than [`MAX_FORM_AGE_MS`] was not produced by a rendered form.
pub fn detect_bot(submission: &ContactSubmission, now_ms: i64) -> Option<BotSignal> {
    if !submission.honeypot.is_empty() {
        return Some(BotSignal::Honeypot);
    }

    let elapsed = now_ms.saturating_sub(submission.timestamp);
    if !(0..=MAX_FORM_AGE_MS).contains(&elapsed) {
        return Some(BotSignal::ImplausibleTimestamp);
    }

    if elapsed < MIN_FILL_TIME_MS {
        return Some(BotSignal::TooFast);
    }

    let text = submission.combined_text().to_lowercase();
    if SPAM_PATTERNS.iter().any(|re| re.is_match(&text)) {
        return Some(BotSignal::SpamContent);
    }

    None
}

pub fn is_bot(submission: &ContactSubmission, now_ms: i64) -> bool {
    detect_bot(submission, now_ms).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn human() -> ContactSubmission {
        ContactSubmission {
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            subject: "Project inquiry".into(),
            message: "Would you be available for a short call next week?".into(),
            honeypot: String::new(),
            timestamp: NOW - 5_000,
            csrf_token: "t".into(),
        }
    }

    #[test]
    fn human_submission_passes() {
        assert_eq!(detect_bot(&human(), NOW), None);
    }

    #[test]
    fn filled_honeypot_wins_over_everything() {
        let mut sub = human();
        sub.honeypot = "http://spam.example".into();
        sub.timestamp = NOW - 60_000;
        assert_eq!(detect_bot(&sub, NOW), Some(BotSignal::Honeypot));
        assert!(is_bot(&sub, NOW));
    }

    #[test]
    fn submissions_under_three_seconds_are_bots() {
        let mut sub = human();
        sub.timestamp = NOW - 500;
        assert_eq!(detect_bot(&sub, NOW), Some(BotSignal::TooFast));

        sub.timestamp = NOW - 2_999;
        assert!(is_bot(&sub, NOW));

        sub.timestamp = NOW - 3_000;
        assert!(!is_bot(&sub, NOW));
    }

    #[test]
    fn spam_phrases_match_case_insensitively() {
        let mut sub = human();
        sub.message = "CLICK HERE for the best deal you will ever see".into();
        assert_eq!(detect_bot(&sub, NOW), Some(BotSignal::SpamContent));

        let mut sub = human();
        sub.subject = "Lorem Ipsum".into();
        assert!(is_bot(&sub, NOW));
    }

    #[test]
    fn words_containing_spam_terms_are_not_flagged() {
        let mut sub = human();
        sub.message = "Occasionally I visit a casinos museum and buy nowhere near enough books".into();
        assert!(!is_bot(&sub, NOW));
    }

    #[test]
    fn out_of_range_timestamps_are_bots() {
        let mut sub = human();
        sub.timestamp = i64::MIN;
        assert_eq!(detect_bot(&sub, NOW), Some(BotSignal::ImplausibleTimestamp));

        sub.timestamp = i64::MAX;
        assert_eq!(detect_bot(&sub, NOW), Some(BotSignal::ImplausibleTimestamp));

        sub.timestamp = NOW + 1;
        assert!(is_bot(&sub, NOW));

        sub.timestamp = NOW - MAX_FORM_AGE_MS - 1;
        assert_eq!(detect_bot(&sub, NOW), Some(BotSignal::ImplausibleTimestamp));

        sub.timestamp = NOW - MAX_FORM_AGE_MS;
        assert!(!is_bot(&sub, NOW));
    }
}
