use crate::config::CameraMode;
use crate::models::camera::Camera;
use crate::models::details::{self, Details, DetailsShape, NcdotIncident, PoliceIncident, RweccIncident};
use crate::models::discord::{
    Embed, EmbedField, EmbedFooter, EmbedMedia, WebhookPayload, BOT_USERNAME, COLOR_BLUE,
    COLOR_GREEN, COLOR_NEUTRAL, COLOR_PURPLE, COLOR_RED, COLOR_YELLOW,
};
use crate::models::incident::{ClearedIncident, Incident, IncidentSource, UnknownSource};
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::America::New_York;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

const NO_CASE_PREFIX: &str = "NO_CASE-";
const STATIC_MAP_BASE: &str = "https://maps.googleapis.com/maps/api/staticmap";

/// Read-only settings shared by every builder.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub maps_api_key: Option<&'a str>,
    pub camera_mode: CameraMode,
}

pub trait PayloadBuilder {
    fn build(
        &self,
        ctx: &BuildContext<'_>,
        incident: &Incident,
        cameras: &[Camera],
        attachment_name: Option<&str>,
    ) -> WebhookPayload;
}

pub struct NcdotBuilder;
pub struct RweccBuilder;
pub struct PoliceBuilder;

pub fn builder_for(source: IncidentSource) -> &'static dyn PayloadBuilder {
    match source {
        IncidentSource::Ncdot => &NcdotBuilder,
        IncidentSource::Rwecc => &RweccBuilder,
        IncidentSource::ArcgisPolice => &PoliceBuilder,
    }
}

pub fn build_payload(
    ctx: &BuildContext<'_>,
    incident: &Incident,
    cameras: &[Camera],
    attachment_name: Option<&str>,
) -> Result<WebhookPayload, UnknownSource> {
    let source: IncidentSource = incident.source.parse()?;
    Ok(builder_for(source).build(ctx, incident, cameras, attachment_name))
}

impl PayloadBuilder for NcdotBuilder {
    fn build(
        &self,
        ctx: &BuildContext<'_>,
        incident: &Incident,
        cameras: &[Camera],
        attachment_name: Option<&str>,
    ) -> WebhookPayload {
        let Details { incident: raw, weather, .. } = decode_logged::<NcdotIncident>(incident);

        let color = match raw.severity {
            1 => COLOR_GREEN,
            2 => COLOR_YELLOW,
            3 => COLOR_RED,
            _ => COLOR_NEUTRAL,
        };

        let mut fields = vec![
            EmbedField::new("Reason", raw.reason),
            EmbedField::new("Road", raw.road),
            EmbedField::new("Location", raw.location),
            EmbedField::new("Severity", raw.severity.to_string()),
        ];
        if let Some(weather) = weather {
            fields.push(EmbedField::new("Weather Conditions", weather.summary()));
        }
        fields.extend(camera_field(ctx.camera_mode, cameras));

        let embed = Embed {
            title: Some("🚨 NC DOT - Incident Alert 🚨".to_string()),
            color,
            fields,
            footer: footer("Source: NC DOT API"),
            timestamp: Some(rfc3339(&incident.timestamp)),
            thumbnail: map_url(ctx, incident, &THUMBNAIL_MAP),
            image: attachment_image(attachment_name),
        };
        alert(embed)
    }
}

impl PayloadBuilder for RweccBuilder {
    fn build(
        &self,
        ctx: &BuildContext<'_>,
        incident: &Incident,
        cameras: &[Camera],
        attachment_name: Option<&str>,
    ) -> WebhookPayload {
        let Details { incident: raw, weather, .. } = decode_logged::<RweccIncident>(incident);

        let mut fields = vec![
            EmbedField::new("Address", incident.address.clone()),
            EmbedField::new("Jurisdiction", raw.jurisdiction),
        ];
        if let Some(weather) = weather {
            fields.push(EmbedField::new("Weather Conditions", weather.summary()));
        }
        fields.extend(camera_field(ctx.camera_mode, cameras));

        let embed = Embed {
            title: Some(format!("🔵 {} 🔵", raw.problem)),
            color: COLOR_BLUE,
            fields,
            footer: footer("Source: Raleigh-Wake ECC"),
            timestamp: Some(rfc3339(&incident.timestamp)),
            thumbnail: map_url(ctx, incident, &THUMBNAIL_MAP),
            image: attachment_image(attachment_name),
        };
        alert(embed)
    }
}

impl PayloadBuilder for PoliceBuilder {
    /// Police alerts carry no camera enrichment; `cameras` and
    /// `attachment_name` are ignored.
    fn build(
        &self,
        ctx: &BuildContext<'_>,
        incident: &Incident,
        _cameras: &[Camera],
        _attachment_name: Option<&str>,
    ) -> WebhookPayload {
        debug!(incident_id = incident.id, details = %incident.details, "raw police incident details");

        let raw = decode_logged::<PoliceIncident>(incident).incident;

        let mut fields = vec![
            EmbedField::new("Address", incident.address.clone()),
            EmbedField::new("Agency", raw.agency),
        ];
        if !raw.case_number.starts_with(NO_CASE_PREFIX) {
            fields.push(EmbedField::new("Case #", raw.case_number));
        }
        fields.push(EmbedField::new("Reported", reported_at(&incident.timestamp)));

        let embed = Embed {
            title: Some(format!("🟣 {} 🟣", raw.crime_description)),
            color: COLOR_PURPLE,
            fields,
            footer: footer("Source: Police Incidents Feed"),
            timestamp: Some(rfc3339(&incident.timestamp)),
            thumbnail: None,
            image: map_url(ctx, incident, &FULL_MAP),
        };
        alert(embed)
    }
}

/// Replacement content for a message whose incident has cleared.
pub fn cleared_payload(incident: &ClearedIncident, now: DateTime<Utc>) -> WebhookPayload {
    WebhookPayload {
        username: None,
        avatar_url: None,
        embeds: vec![Embed {
            title: Some("✅ Incident Cleared ✅".to_string()),
            color: COLOR_GREEN,
            fields: vec![
                EmbedField::new("Source", incident.source.clone()),
                EmbedField::new("Address", incident.address.clone().unwrap_or_default()),
            ],
            footer: footer("Incident no longer in active feed"),
            timestamp: Some(rfc3339(&now)),
            thumbnail: None,
            image: None,
        }],
    }
}

struct MapStyle {
    zoom: u8,
    size: &'static str,
    marker_color: &'static str,
}

const THUMBNAIL_MAP: MapStyle = MapStyle {
    zoom: 14,
    size: "300x300",
    marker_color: "red",
};

const FULL_MAP: MapStyle = MapStyle {
    zoom: 15,
    size: "600x400",
    marker_color: "purple",
};

fn map_url(ctx: &BuildContext<'_>, incident: &Incident, style: &MapStyle) -> Option<EmbedMedia> {
    let key = ctx.maps_api_key?;
    let (lat, lon) = incident.coordinates()?;
    Some(EmbedMedia {
        url: format!(
            "{}?center={:.6},{:.6}&zoom={}&size={}&markers=color:{}%7C{:.6},{:.6}&key={}",
            STATIC_MAP_BASE, lat, lon, style.zoom, style.size, style.marker_color, lat, lon, key
        ),
    })
}

fn camera_field(mode: CameraMode, cameras: &[Camera]) -> Option<EmbedField> {
    let (name, listed) = match mode {
        // The nearest camera is attached as an image, so only the others are linked.
        CameraMode::Attach => ("Other Live Cameras", cameras.get(1..).unwrap_or_default()),
        CameraMode::LinkOnly => ("Nearby Cameras", cameras),
    };
    if listed.is_empty() {
        return None;
    }

    let links: Vec<String> = listed.iter().map(Camera::markdown_link).collect();
    Some(EmbedField::new(name, links.join("\n")))
}

fn attachment_image(attachment_name: Option<&str>) -> Option<EmbedMedia> {
    attachment_name.map(|name| EmbedMedia {
        url: format!("attachment://{}", name),
    })
}

fn decode_logged<T>(incident: &Incident) -> Details<T>
where
    T: DeserializeOwned + Default,
{
    let decoded = details::decode::<T>(&incident.details);
    match decoded.shape {
        DetailsShape::Wrapped => {}
        DetailsShape::Legacy => {
            debug!(incident_id = incident.id, source = %incident.source, "details in legacy shape");
        }
        DetailsShape::Unreadable => {
            warn!(incident_id = incident.id, source = %incident.source, "details unreadable, using empty fields");
        }
    }
    decoded
}

fn alert(embed: Embed) -> WebhookPayload {
    WebhookPayload {
        username: Some(BOT_USERNAME.to_string()),
        avatar_url: None,
        embeds: vec![embed],
    }
}

fn footer(text: &str) -> Option<EmbedFooter> {
    Some(EmbedFooter {
        text: text.to_string(),
    })
}

fn rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn reported_at(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&New_York)
        .format("%a, %b %-d, %-I:%M %p")
        .to_string()
}
