use serde::Serialize;

pub const BOT_USERNAME: &str = "Unified Alert Bot";

pub const COLOR_GREEN: u32 = 3066993;
pub const COLOR_YELLOW: u32 = 16776960;
pub const COLOR_RED: u32 = 15158332;
pub const COLOR_NEUTRAL: u32 = 2105893;
pub const COLOR_BLUE: u32 = 3447003;
pub const COLOR_PURPLE: u32 = 9807270;

/// Body of a webhook execute or edit call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedMedia {
    pub url: String,
}

impl Embed {
    pub fn field(&self, name: &str) -> Option<&EmbedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl WebhookPayload {
    /// First embed, which is the only one this service ever sends.
    pub fn embed(&self) -> Option<&Embed> {
        self.embeds.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_parts_are_omitted_from_json() {
        let payload = WebhookPayload {
            username: None,
            avatar_url: None,
            embeds: vec![Embed {
                title: Some("t".to_string()),
                color: COLOR_BLUE,
                ..Default::default()
            }],
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, json!({"embeds": [{"title": "t", "color": 3447003}]}));
    }
}
