//! One JSON document per entity class, each with the value it starts from
//! when missing or unreadable.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::{AgentSettings, BotStatus, Campaign, Conversation, KnowledgeEntry, ReplyRules};

pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const NAME: &'static str;

    fn initial() -> Self;
}

/// All conversations keyed by chat id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Conversations(pub BTreeMap<String, Conversation>);

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Campaigns(pub Vec<Campaign>);

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct KnowledgeBase(pub Vec<KnowledgeEntry>);

impl Document for Conversations {
    const NAME: &'static str = "conversations";

    fn initial() -> Self {
        Self::default()
    }
}

impl Document for Campaigns {
    const NAME: &'static str = "campaigns";

    fn initial() -> Self {
        let starter = [
            ("camp_1", "Facebook Ads - Enero", "FB-ENE", "#1877f2", "facebook"),
            ("camp_2", "Instagram Stories", "IG-STORIES", "#e1306c", "instagram"),
            ("camp_3", "Google Ads", "GOOGLE", "#4285f4", "google"),
            ("camp_4", "WhatsApp Link Perfil", "PERFIL", "#25d366", "organic"),
            ("camp_5", "Email Marketing", "EMAIL", "#f59e0b", "email"),
        ];
        Self(
            starter
                .into_iter()
                .map(|(id, name, keyword, color, source)| Campaign {
                    id: id.to_string(),
                    name: name.to_string(),
                    keyword: keyword.to_string(),
                    color: color.to_string(),
                    source: source.to_string(),
                    active: true,
                    leads: 0,
                    created_at: None,
                })
                .collect(),
        )
    }
}

impl Document for KnowledgeBase {
    const NAME: &'static str = "knowledge";

    fn initial() -> Self {
        Self::default()
    }
}

impl Document for AgentSettings {
    const NAME: &'static str = "agent_settings";

    fn initial() -> Self {
        Self::default()
    }
}

impl Document for BotStatus {
    const NAME: &'static str = "bot_status";

    fn initial() -> Self {
        Self::default()
    }
}

impl Document for ReplyRules {
    const NAME: &'static str = "replies";

    fn initial() -> Self {
        Self::from_pairs([
            (
                "hola",
                "¡Hola! Gracias por contactarnos. ¿En qué podemos ayudarte el día de hoy?",
            ),
            (
                "precio",
                "Nuestros precios varían según el servicio. Por favor visita nuestra web o especifica qué servicio te interesa.",
            ),
            (
                "horario",
                "Nuestro horario de atención es de Lunes a Viernes de 9:00 AM a 6:00 PM.",
            ),
            (
                "direccion",
                "Estamos ubicados en Calle Falsa 123, Ciudad Ejemplo.",
            ),
        ])
    }
}

macro_rules! deref_newtype {
    ($name:ident, $inner:ty) => {
        impl Deref for $name {
            type Target = $inner;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };
}

deref_newtype!(Conversations, BTreeMap<String, Conversation>);
deref_newtype!(Campaigns, Vec<Campaign>);
deref_newtype!(KnowledgeBase, Vec<KnowledgeEntry>);
