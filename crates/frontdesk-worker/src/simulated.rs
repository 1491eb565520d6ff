//! Canned responder used when no generative model is available.

use crate::matching::{IntentMatcher, Matcher};
use crate::prompt::Persona;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Greeting,
    Pricing,
    HowItWorks,
    Scheduling,
    HumanHandoff,
}

#[derive(Debug, Clone, Copy)]
pub struct Intent {
    pub kind: IntentKind,
    pub triggers: &'static [&'static str],
}

/// Checked in order; the first hit wins.
pub const INTENTS: &[Intent] = &[
    Intent {
        kind: IntentKind::Greeting,
        triggers: &["hola", "buenos dias", "buenas tardes"],
    },
    Intent {
        kind: IntentKind::Pricing,
        triggers: &["precio", "costo", "cuanto"],
    },
    Intent {
        kind: IntentKind::HowItWorks,
        triggers: &["funciona", "como es", "informacion"],
    },
    Intent {
        kind: IntentKind::Scheduling,
        triggers: &["demo", "agenda", "reunion"],
    },
    Intent {
        kind: IntentKind::HumanHandoff,
        triggers: &["humano", "persona", "hablar con alguien"],
    },
];

pub fn classify(body: &str) -> Option<IntentKind> {
    IntentMatcher.first(body, INTENTS).map(|intent| intent.kind)
}

pub fn respond(body: &str, persona: &Persona<'_>) -> String {
    let business = persona.business;
    match classify(body) {
        Some(IntentKind::Greeting) => format!(
            "¡Hola! 👋 Soy {} de {}. Qué gusto saludarte. ¿En qué puedo ayudarte hoy para automatizar tu negocio?",
            persona.name, business
        ),
        Some(IntentKind::Pricing) => "Nuestros planes son súper flexibles. 🚀 Empezamos desde $99/mes con el Plan Starter, ideal para arrancar. ¿Cuántos leads o mensajes manejas al mes aprox, para darte una recomendación más exacta?".to_string(),
        Some(IntentKind::HowItWorks) => format!(
            "¡Claro! Básicamente conectamos a {} a tu WhatsApp y Meta Ads. Hacemos que la IA califique a tus clientes y responda dudas 24/7 sin que tú muevas un dedo. ¿Te gustaría agendar una demo rápida para verlo en vivo?",
            business
        ),
        Some(IntentKind::Scheduling) => format!(
            "¡Excelente! 🗓️ Puedes agendar el día y la hora que mejor te acomode directamente en este link: https://calendly.com/{}/demo . ¡Ahí nos vemos!",
            business.to_lowercase()
        ),
        Some(IntentKind::HumanHandoff) => "Por supuesto. En este momento estoy transfiriendo este chat a uno de nuestros expertos. 👨‍💻 Te responderá en unos minutos por aquí mismo.".to_string(),
        None => "Entiendo... la verdad es que cada negocio es un mundo. Basado en nuestra base de conocimientos, puedo ayudarte mejor si me cuentas: ¿cuál es el mayor cuello de botella que tienes ahora mismo en tu atención al cliente? 🤔".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontdesk_db::AgentSettings;

    #[test]
    fn intents_resolve_in_order() {
        assert_eq!(classify("Hola, cuanto cuesta?"), Some(IntentKind::Greeting));
        assert_eq!(classify("cuanto cuesta"), Some(IntentKind::Pricing));
        assert_eq!(classify("quiero una DEMO"), Some(IntentKind::Scheduling));
        assert_eq!(classify("hablar con alguien"), Some(IntentKind::HumanHandoff));
        assert_eq!(classify("ok"), None);
    }

    #[test]
    fn pricing_answer_for_cuanto_cuesta() {
        let settings = AgentSettings::default();
        let reply = respond("cuanto cuesta", &Persona::from_settings(&settings));
        assert!(reply.starts_with("Nuestros planes son súper flexibles."));
    }

    #[test]
    fn scheduling_link_uses_lowercased_business() {
        let mut settings = AgentSettings::default();
        settings.set(crate::prompt::BUSINESS_NAME, "AcmeCo");
        let reply = respond("agenda", &Persona::from_settings(&settings));
        assert!(reply.contains("https://calendly.com/acmeco/demo"));
    }

    #[test]
    fn greeting_names_the_agent() {
        let settings = AgentSettings::default();
        let reply = respond("buenas tardes", &Persona::from_settings(&settings));
        assert!(reply.contains("Soy Eryum de TalosFlow"));
    }
}
