use crate::types::push::{NotificationPayload, Standing, Tag};

use serde::{Deserialize, Serialize};

const STANDINGS_TITLE: &str = "Current Standings";
const STANDINGS_FALLBACK: &str = "Check the leaderboard for the latest standings!";
const STANDINGS_SEPARATOR: &str = " · ";
const STANDINGS_TOP: usize = 4;
const EVENT_RESULT_TITLE_FALLBACK: &str = "Event Results";
const EVENT_RESULT_BODY_FALLBACK: &str = "New results are in — check the leaderboard!";
const EVENT_RESULT_CALL_TO_ACTION: &str = "Check the leaderboard for updated standings.";

/// Input to [`compose`], as submitted from the admin form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Template {
    Custom {
        title: String,
        body: String,
        #[serde(default)]
        tag: Option<Tag>,
    },
    Standings {
        #[serde(default)]
        note: Option<String>,
    },
    EventResult(EventResultFields),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResultFields {
    #[serde(default)]
    pub house_id: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub place: String,
    #[serde(default)]
    pub day: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    First,
    Second,
    Third,
    Fourth,
}

impl Place {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1st" => Some(Self::First),
            "2nd" => Some(Self::Second),
            "3rd" => Some(Self::Third),
            "4th" => Some(Self::Fourth),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::First => "1st",
            Self::Second => "2nd",
            Self::Third => "3rd",
            Self::Fourth => "4th",
        }
    }

    fn emoji(self) -> &'static str {
        match self {
            Self::First => "🥇",
            Self::Second => "🥈",
            Self::Third => "🥉",
            Self::Fourth => "4️⃣",
        }
    }
}

/// Builds the notification for `template` against the current standings,
/// which must already be ordered by descending points.
pub fn compose(template: &Template, standings: &[Standing]) -> NotificationPayload {
    match template {
        Template::Custom { title, body, tag } => NotificationPayload {
            title: title.clone(),
            body: body.clone(),
            tag: tag.unwrap_or(Tag::Reminders),
        },
        Template::Standings { note } => compose_standings(note.as_deref(), standings),
        Template::EventResult(fields) => compose_event_result(fields, standings),
    }
}

fn compose_standings(note: Option<&str>, standings: &[Standing]) -> NotificationPayload {
    let body = if standings.is_empty() {
        STANDINGS_FALLBACK.to_string()
    } else {
        let mut body = standings
            .iter()
            .take(STANDINGS_TOP)
            .enumerate()
            .map(|(index, standing)| {
                format!(
                    "{}. {} ({} pts)",
                    index + 1,
                    standing.name,
                    standing.total_points
                )
            })
            .collect::<Vec<_>>()
            .join(STANDINGS_SEPARATOR);
        if let Some(note) = note.map(str::trim).filter(|note| !note.is_empty()) {
            body.push_str(" — ");
            body.push_str(note);
        }
        body
    };

    NotificationPayload {
        title: STANDINGS_TITLE.to_string(),
        body,
        tag: Tag::Results,
    }
}

fn compose_event_result(fields: &EventResultFields, standings: &[Standing]) -> NotificationPayload {
    let event = fields.event.trim();
    let place = Place::parse(&fields.place);
    let house = standings
        .iter()
        .find(|standing| !fields.house_id.is_empty() && standing.id == fields.house_id);

    let title = if event.is_empty() {
        EVENT_RESULT_TITLE_FALLBACK.to_string()
    } else {
        let emoji = place.map(Place::emoji).unwrap_or("🏆");
        format!("{emoji} {event} Results")
    };

    let body = match (house, place) {
        (Some(house), Some(place)) if !event.is_empty() => {
            let mut body = format!(
                "{} takes {} place in {event}!",
                capitalize(&house.name),
                place.label()
            );
            if let Some(day) = fields
                .day
                .as_deref()
                .map(str::trim)
                .filter(|day| !day.is_empty())
            {
                body.push_str(&format!(" (Day {day})"));
            }
            body.push(' ');
            body.push_str(EVENT_RESULT_CALL_TO_ACTION);
            body
        }
        _ => EVENT_RESULT_BODY_FALLBACK.to_string(),
    };

    NotificationPayload {
        title,
        body,
        tag: Tag::Results,
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether a composed payload may be handed to the dispatcher.
pub fn is_sendable(template: &Template, payload: &NotificationPayload) -> bool {
    if !payload.has_content() {
        return false;
    }
    match template {
        Template::EventResult(fields) => {
            !fields.event.trim().is_empty()
                && !fields.house_id.trim().is_empty()
                && !fields.place.trim().is_empty()
        }
        Template::Custom { .. } | Template::Standings { .. } => true,
    }
}
