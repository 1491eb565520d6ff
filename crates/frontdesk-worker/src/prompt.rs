use std::fmt::Write;

use frontdesk_db::{AgentSettings, KnowledgeEntry, Message};

pub const AGENT_NAME: &str = "agentSettings_agent-name";
pub const AGENT_ROLE: &str = "agentSettings_agent-role";
pub const AGENT_PERSONALITY: &str = "agentSettings_agent-personality";
pub const AGENT_TONE: &str = "agentSettings_agent-tone";
pub const AGENT_LANGUAGE: &str = "agentSettings_agent-language";
pub const BUSINESS_NAME: &str = "agentSettings_business-name";
pub const BUSINESS_DESC: &str = "agentSettings_business-desc";
pub const BUSINESS_PRODUCTS: &str = "agentSettings_business-products";
pub const AUTO_REPLIES: &str = "agentSettings_auto-replies";

const HISTORY_TURNS: usize = 5;

/// Who the assistant is, resolved from the stored settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Persona<'a> {
    pub name: &'a str,
    pub role: &'a str,
    pub personality: &'a str,
    pub tone: &'a str,
    pub language: &'a str,
    pub business: &'a str,
    pub description: &'a str,
    pub products: &'a str,
}

impl<'a> Persona<'a> {
    pub fn from_settings(settings: &'a AgentSettings) -> Self {
        Self {
            name: settings.get_or(AGENT_NAME, "Eryum"),
            role: settings.get_or(AGENT_ROLE, "asistente"),
            personality: settings.get_or(AGENT_PERSONALITY, "amable"),
            tone: settings.get_or(AGENT_TONE, "amigable"),
            language: settings.get_or(AGENT_LANGUAGE, "Español"),
            business: settings.get_or(BUSINESS_NAME, "TalosFlow"),
            description: settings.get_or(BUSINESS_DESC, ""),
            products: settings.get_or(BUSINESS_PRODUCTS, ""),
        }
    }
}

/// Keyword rules run unless explicitly switched off.
pub fn auto_replies_enabled(settings: &AgentSettings) -> bool {
    settings.get(AUTO_REPLIES) != Some("false")
}

/// Builds the generation prompt from the persona, the knowledge base,
/// the last few stored turns and the new message.
pub fn build_prompt(
    persona: &Persona<'_>,
    knowledge: &[KnowledgeEntry],
    history: &[Message],
    incoming: &str,
) -> String {
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "Eres {}, un {} de la empresa {}.",
        persona.name, persona.role, persona.business
    );
    let _ = writeln!(
        prompt,
        "Tu personalidad es {}, respondes en {} con un tono {}.",
        persona.personality, persona.language, persona.tone
    );
    prompt.push_str("No digas que eres una IA. Conversa fluidamente como un humano experto.\n");
    let _ = writeln!(prompt, "Información de la empresa: {}", persona.description);
    let _ = writeln!(prompt, "Nuestros servicios: {}", persona.products);
    prompt.push_str("Base de Conocimientos (usa esto para ayudar al cliente):\n");
    for entry in knowledge {
        let _ = writeln!(prompt, "{}: {}", entry.title, entry.description);
    }

    prompt.push_str("\nHistorial reciente:\n");
    let start = history.len().saturating_sub(HISTORY_TURNS);
    for message in &history[start..] {
        let speaker = if message.from_me { "Asistente" } else { "Cliente" };
        let _ = writeln!(prompt, "{}: {}", speaker, message.body);
    }

    let _ = writeln!(prompt, "\nCliente acaba de decir: \"{}\"", incoming);
    prompt.push_str(
        "Responde al cliente de manera corta, resolutiva y natural, como en un chat \
         de WhatsApp. Usa un emoji si corresponde, sin exagerar:",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str, from_me: bool) -> Message {
        Message::new(body, body, from_me, 0, "chat")
    }

    #[test]
    fn defaults_fill_missing_settings() {
        let settings = AgentSettings::default();
        let persona = Persona::from_settings(&settings);
        assert_eq!(persona.name, "Eryum");
        assert_eq!(persona.business, "TalosFlow");
        assert_eq!(persona.language, "Español");
        assert_eq!(persona.description, "");
    }

    #[test]
    fn stored_settings_win() {
        let mut settings = AgentSettings::default();
        settings.set(AGENT_NAME, "Lucía");
        settings.set(BUSINESS_NAME, "Acme");
        let persona = Persona::from_settings(&settings);
        assert_eq!(persona.name, "Lucía");
        assert_eq!(persona.business, "Acme");
    }

    #[test]
    fn auto_replies_only_off_when_false() {
        let mut settings = AgentSettings::default();
        assert!(auto_replies_enabled(&settings));
        settings.set(AUTO_REPLIES, "no");
        assert!(auto_replies_enabled(&settings));
        settings.set(AUTO_REPLIES, "false");
        assert!(!auto_replies_enabled(&settings));
    }

    #[test]
    fn prompt_keeps_last_five_turns() {
        let settings = AgentSettings::default();
        let persona = Persona::from_settings(&settings);
        let history: Vec<Message> = (0..7)
            .map(|i| message(&format!("turno-{i}"), i % 2 == 1))
            .collect();
        let knowledge = vec![KnowledgeEntry {
            id: "k1".into(),
            category: "faq".into(),
            title: "Envíos".into(),
            description: "Gratis sobre $50".into(),
            status: "ready".into(),
            active: true,
        }];

        let prompt = build_prompt(&persona, &knowledge, &history, "turno-6");

        assert!(prompt.starts_with("Eres Eryum, un asistente de la empresa TalosFlow."));
        assert!(prompt.contains("Envíos: Gratis sobre $50"));
        assert!(!prompt.contains("turno-1\n"));
        assert!(prompt.contains("Asistente: turno-3"));
        assert!(prompt.contains("Cliente: turno-2"));
        assert!(prompt.contains("Cliente acaba de decir: \"turno-6\""));
    }
}
