use chrono::{DateTime, SecondsFormat, Utc};

use frontdesk_db::{Campaign, CampaignAttribution, Conversation};

use crate::matching::{CampaignKeywordMatcher, Matcher};

const EXCERPT_CHARS: usize = 100;

/// First active campaign whose keyword appears in `body`.
pub fn detect_campaign<'c>(body: &str, campaigns: &'c [Campaign]) -> Option<&'c Campaign> {
    CampaignKeywordMatcher.first(body, campaigns)
}

pub fn attribution_for(campaign: &Campaign, body: &str, now: DateTime<Utc>) -> CampaignAttribution {
    CampaignAttribution {
        id: campaign.id.clone(),
        name: campaign.name.clone(),
        source: campaign.source.clone(),
        color: campaign.color.clone(),
        keyword: campaign.keyword.clone(),
        detected_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        detected_from_message: Some(body.chars().take(EXCERPT_CHARS).collect()),
        manual: false,
    }
}

/// Attributes an unattributed conversation to the first matching campaign
/// and counts the lead on it.
///
/// Returns the new attribution, or `None` when the conversation already
/// had one or nothing matched.
pub fn attribute(
    conversation: &mut Conversation,
    body: &str,
    campaigns: &mut [Campaign],
) -> Option<CampaignAttribution> {
    if conversation.campaign.is_some() {
        return None;
    }

    let index = campaigns
        .iter()
        .position(|c| CampaignKeywordMatcher.matches(body, c))?;
    let campaign = &mut campaigns[index];
    campaign.leads += 1;

    let attribution = attribution_for(campaign, body, Utc::now());
    conversation.campaign = Some(attribution.clone());
    Some(attribution)
}
