use std::collections::BTreeMap;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<CampaignAttribution>,
    #[serde(default)]
    pub synced: bool,
}

impl Conversation {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            messages: Vec::new(),
            last_message: None,
            timestamp: 0,
            email: None,
            extracted_name: None,
            campaign: None,
            synced: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub body: String,
    pub from_me: bool,
    pub timestamp: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub formatted_time: String,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        body: impl Into<String>,
        from_me: bool,
        timestamp: i64,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            from_me,
            timestamp,
            kind: kind.into(),
            formatted_time: format_time(timestamp),
        }
    }
}

/// Local wall-clock time for a unix timestamp, display only.
pub fn format_time(timestamp: i64) -> String {
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub source: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub leads: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Snapshot of a campaign taken when a conversation was attributed to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignAttribution {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub keyword: String,
    pub detected_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_from_message: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub manual: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BotStatus {
    pub enabled: bool,
}

impl Default for BotStatus {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Free-form agent configuration; values are kept as strings.
///
/// Non-string JSON values written by other tools are stringified instead of
/// rejecting the whole document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "serde_json::Map<String, serde_json::Value>")]
pub struct AgentSettings(pub BTreeMap<String, String>);

impl From<serde_json::Map<String, serde_json::Value>> for AgentSettings {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        let values = map
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some((key, s)),
                other => Some((key, other.to_string())),
            })
            .collect();
        Self(values)
    }
}

impl AgentSettings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value for `key`, or `default` when absent or blank.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => value,
            _ => default,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplyRule {
    pub keyword: String,
    pub response: String,
}

/// Keyword to canned-response map, kept in stored order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplyRules(pub Vec<ReplyRule>);

impl ReplyRules {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| ReplyRule {
                    keyword: k.into(),
                    response: v.into(),
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReplyRule> {
        self.0.iter()
    }
}

impl Serialize for ReplyRules {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for rule in &self.0 {
            map.serialize_entry(&rule.keyword, &rule.response)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ReplyRules {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(Self::from_pairs(map.into_iter().filter_map(
            |(keyword, value)| match value {
                serde_json::Value::String(response) => Some((keyword, response)),
                _ => None,
            },
        )))
    }
}

/// Conversations created by the dashboard may carry `"timestamp": null`.
fn null_as_zero<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_true() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_rules_keep_stored_order() {
        let rules: ReplyRules =
            serde_json::from_str(r#"{"zeta": "z", "alpha": "a", "mid": "m"}"#).unwrap();
        let keys: Vec<_> = rules.iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);

        let back = serde_json::to_string(&rules).unwrap();
        assert_eq!(back, r#"{"zeta":"z","alpha":"a","mid":"m"}"#);
    }

    #[test]
    fn reply_rules_skip_non_string_responses() {
        let rules: ReplyRules = serde_json::from_str(r#"{"hola": "hi", "bad": 3}"#).unwrap();
        assert_eq!(rules.0.len(), 1);
    }

    #[test]
    fn conversation_null_timestamp_reads_as_zero() {
        let conversation: Conversation =
            serde_json::from_str(r#"{"id": "1@c.us", "name": "Ana", "timestamp": null}"#).unwrap();
        assert_eq!(conversation.timestamp, 0);
        assert!(conversation.messages.is_empty());
    }

    #[test]
    fn agent_settings_stringify_loose_values() {
        let settings: AgentSettings =
            serde_json::from_str(r#"{"agentSettings_auto-replies": false, "x": null}"#).unwrap();
        assert_eq!(settings.get("agentSettings_auto-replies"), Some("false"));
        assert_eq!(settings.get("x"), None);
    }

    #[test]
    fn agent_settings_blank_falls_back() {
        let mut settings = AgentSettings::default();
        settings.set("name", "  ");
        assert_eq!(settings.get_or("name", "Eryum"), "Eryum");
        settings.set("name", "Ana");
        assert_eq!(settings.get_or("name", "Eryum"), "Ana");
    }

    #[test]
    fn conversation_uses_dashboard_field_names() {
        let mut conv = Conversation::new("1@c.us", "Ana");
        conv.messages.push(Message::new("m1", "hola", false, 1_700_000_000, "chat"));
        let json = serde_json::to_value(&conv).unwrap();
        assert_eq!(json["lastMessage"], serde_json::Value::Null);
        assert_eq!(json["messages"][0]["fromMe"], false);
        assert_eq!(json["messages"][0]["type"], "chat");
        assert!(json.get("campaign").is_none());
    }
}
