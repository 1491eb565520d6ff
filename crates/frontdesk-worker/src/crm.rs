//! Best-effort contact details pulled out of free-text messages.

use std::sync::LazyLock;

use regex::Regex;

use frontdesk_db::Conversation;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._-]+@[a-zA-Z0-9._-]+\.[a-zA-Z0-9_-]+").expect("static email regex")
});

// Only the lead-in phrase is case-insensitive; the name itself must be
// capitalised.
static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i:me llamo|mi nombre es)\s+([A-ZÁÉÍÓÚÑ][a-záéíóúñ]+(?:\s+[A-ZÁÉÍÓÚÑ][a-záéíóúñ]+)?)",
    )
    .expect("static name regex")
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrmFields {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl CrmFields {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none()
    }
}

pub fn extract(body: &str) -> CrmFields {
    CrmFields {
        email: EMAIL.find(body).map(|m| m.as_str().to_string()),
        name: NAME
            .captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string()),
    }
}

/// Stores whatever was found; a field that was not found keeps its value.
pub fn apply(conversation: &mut Conversation, fields: CrmFields) {
    if let Some(email) = fields.email {
        conversation.email = Some(email);
    }
    if let Some(name) = fields.name {
        conversation.extracted_name = Some(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_email() {
        let fields = extract("mi correo es ana.perez@mail.example.com gracias");
        assert_eq!(fields.email.as_deref(), Some("ana.perez@mail.example.com"));
    }

    #[test]
    fn finds_one_or_two_word_names() {
        assert_eq!(
            extract("Hola, me llamo Ana").name.as_deref(),
            Some("Ana")
        );
        assert_eq!(
            extract("MI NOMBRE ES José Núñez y quiero info").name.as_deref(),
            Some("José Núñez")
        );
    }

    #[test]
    fn lowercase_name_is_not_a_name() {
        assert!(extract("me llamo ana").name.is_none());
    }

    #[test]
    fn nothing_found() {
        assert!(extract("cuanto cuesta?").is_empty());
    }

    #[test]
    fn apply_never_erases() {
        let mut conversation = Conversation::new("1@c.us", "Ana");
        apply(&mut conversation, extract("me llamo Ana, ana@x.io"));
        apply(&mut conversation, extract("gracias"));
        assert_eq!(conversation.email.as_deref(), Some("ana@x.io"));
        assert_eq!(conversation.extracted_name.as_deref(), Some("Ana"));
    }
}
