//! Per-kind predicates deciding whether a message body triggers a rule.
//!
//! Keyword reply rules and canned intents use plain substring matching;
//! campaign keywords additionally require a tag or a standalone word.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use regex::Regex;

use frontdesk_db::{Campaign, ReplyRule};

use crate::simulated::Intent;

pub trait Matcher {
    type Rule;

    fn matches(&self, body: &str, rule: &Self::Rule) -> bool;

    /// First rule in iteration order that matches `body`.
    fn first<'r, I>(&self, body: &str, rules: I) -> Option<&'r Self::Rule>
    where
        I: IntoIterator<Item = &'r Self::Rule>,
        Self::Rule: 'r,
    {
        rules.into_iter().find(|rule| self.matches(body, rule))
    }
}

/// Keyword reply rules: the lowercased body contains the trimmed,
/// lowercased keyword. Rules with a blank keyword or response never fire.
pub struct SubstringMatcher;

impl Matcher for SubstringMatcher {
    type Rule = ReplyRule;

    fn matches(&self, body: &str, rule: &ReplyRule) -> bool {
        let keyword = rule.keyword.trim();
        if keyword.is_empty() || rule.response.trim().is_empty() {
            return false;
        }
        body.to_lowercase().contains(&keyword.to_lowercase())
    }
}

/// Campaign keywords, compared uppercased: `[KW]`, `(KW)` or `KW` as a
/// standalone word. Inactive campaigns and blank keywords are skipped.
pub struct CampaignKeywordMatcher;

impl Matcher for CampaignKeywordMatcher {
    type Rule = Campaign;

    fn matches(&self, body: &str, campaign: &Campaign) -> bool {
        let keyword = campaign.keyword.trim();
        if !campaign.active || keyword.is_empty() {
            return false;
        }

        let body = body.to_uppercase();
        let keyword = keyword.to_uppercase();

        if body.contains(&format!("[{keyword}]")) || body.contains(&format!("({keyword})")) {
            return true;
        }

        word_pattern(&keyword).is_some_and(|word| word.is_match(&body))
    }
}

/// Compiled `\bKW\b` patterns, keyed by uppercased keyword.
static WORD_PATTERNS: LazyLock<Mutex<HashMap<String, Regex>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn word_pattern(keyword: &str) -> Option<Regex> {
    let mut patterns = WORD_PATTERNS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(word) = patterns.get(keyword) {
        return Some(word.clone());
    }
    match Regex::new(&format!(r"\b{}\b", regex::escape(keyword))) {
        Ok(word) => {
            patterns.insert(keyword.to_string(), word.clone());
            Some(word)
        }
        Err(e) => {
            tracing::warn!(keyword = %keyword, error = %e, "Unusable campaign keyword");
            None
        }
    }
}

/// Canned intents of the simulated responder.
pub struct IntentMatcher;

impl Matcher for IntentMatcher {
    type Rule = Intent;

    fn matches(&self, body: &str, intent: &Intent) -> bool {
        let body = body.to_lowercase();
        intent.triggers.iter().any(|trigger| body.contains(trigger))
    }
}
