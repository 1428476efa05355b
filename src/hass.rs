//! The host side of a card: the live state snapshot it reads and the events
//! it emits back.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

/// One entity as delivered by the host.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityState {
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn reading(&self) -> Reading {
        Reading::parse(&self.state)
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.attributes.get("friendly_name").and_then(Value::as_str)
    }
}

/// Lifecycle states that carry no measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unavailable,
    Unknown,
}

impl Lifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Unavailable => "unavailable",
            Lifecycle::Unknown => "unknown",
        }
    }
}

/// A raw state string classified for the update path.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Number(f64),
    Missing(Lifecycle),
    Text(String),
}

impl Reading {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "unavailable" => Reading::Missing(Lifecycle::Unavailable),
            "unknown" => Reading::Missing(Lifecycle::Unknown),
            s => match parse_number(s) {
                Some(v) => Reading::Number(v),
                None => Reading::Text(s.to_string()),
            },
        }
    }

    pub fn number(&self) -> Option<f64> {
        match self {
            Reading::Number(v) => Some(*v),
            _ => None,
        }
    }
}

/// Parses a sensor state as a finite float.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// The state map the host delivers on every update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HassState {
    pub states: HashMap<String, EntityState>,
}

impl HassState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entity_id: &str, state: EntityState) -> Self {
        self.states.insert(entity_id.to_string(), state);
        self
    }

    pub fn set(&mut self, entity_id: &str, state: impl Into<String>) {
        match self.states.get_mut(entity_id) {
            Some(existing) => existing.state = state.into(),
            None => {
                self.states
                    .insert(entity_id.to_string(), EntityState::new(state));
            }
        }
    }

    pub fn get(&self, entity_id: &str) -> Option<&EntityState> {
        self.states.get(entity_id)
    }

    /// Raw state string of an optional entity.
    pub fn text(&self, entity_id: Option<&str>) -> Option<&str> {
        entity_id
            .and_then(|id| self.states.get(id))
            .map(|s| s.state.as_str())
    }

    /// Numeric state of an optional entity, `None` if absent or not a number.
    pub fn number(&self, entity_id: Option<&str>) -> Option<f64> {
        self.text(entity_id).and_then(parse_number)
    }

    pub fn is_on(&self, entity_id: Option<&str>) -> bool {
        self.text(entity_id) == Some("on")
    }

    /// Sorted ids of every entity in `domain`.
    pub fn entities_in(&self, domain: &str) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .states
            .keys()
            .filter(|id| entity_domain(id) == Some(domain))
            .map(String::as_str)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Sorted ids of every entity.
    pub fn entity_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.states.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

pub fn entity_domain(entity_id: &str) -> Option<&str> {
    entity_id.split_once('.').map(|(domain, _)| domain)
}

/// What a card asks the host to do in response to user interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum CardEvent {
    MoreInfo {
        entity_id: String,
    },
    CallService {
        domain: String,
        service: String,
        data: Value,
    },
    Navigate {
        path: String,
    },
    OpenUrl {
        url: String,
    },
    /// Ask the user first; run `then` only on confirmation.
    Confirm {
        text: String,
        then: Box<CardEvent>,
    },
}

impl CardEvent {
    pub fn more_info(entity_id: &str) -> Self {
        CardEvent::MoreInfo {
            entity_id: entity_id.to_string(),
        }
    }

    /// Toggle service call routed on the entity domain.
    pub fn toggle(entity_id: &str) -> Self {
        let parts: Vec<&str> = entity_id.splitn(2, '.').collect();
        let domain = match parts.as_slice() {
            ["switch", _] => "switch",
            ["input_boolean", _] => "input_boolean",
            ["light", _] => "light",
            ["automation", _] => "automation",
            _ => {
                debug!("No dedicated toggle for {:?}, using homeassistant", entity_id);
                "homeassistant"
            }
        };
        CardEvent::CallService {
            domain: domain.to_string(),
            service: "toggle".to_string(),
            data: json!({ "entity_id": entity_id }),
        }
    }
}

/// Home Assistant style action object (`tap_action`, `hold_action`, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ActionConfig {
    MoreInfo {
        #[serde(default)]
        entity: Option<String>,
    },
    Toggle,
    Navigate {
        #[serde(default)]
        navigation_path: Option<String>,
    },
    Url {
        #[serde(default)]
        url_path: Option<String>,
    },
    CallService {
        #[serde(default)]
        service: Option<String>,
        #[serde(default)]
        service_data: Option<Value>,
    },
    #[default]
    None,
}

impl ActionConfig {
    pub fn more_info() -> Self {
        ActionConfig::MoreInfo { entity: None }
    }

    /// Resolves the action against the card's main entity.
    pub fn resolve(&self, card_entity: Option<&str>) -> Option<CardEvent> {
        match self {
            ActionConfig::None => None,
            ActionConfig::MoreInfo { entity } => entity
                .as_deref()
                .or(card_entity)
                .map(CardEvent::more_info),
            ActionConfig::Toggle => card_entity.map(|id| CardEvent::CallService {
                domain: "homeassistant".to_string(),
                service: "toggle".to_string(),
                data: json!({ "entity_id": id }),
            }),
            ActionConfig::Navigate { navigation_path } => {
                navigation_path.as_ref().map(|path| CardEvent::Navigate { path: path.clone() })
            }
            ActionConfig::Url { url_path } => {
                url_path.as_ref().map(|url| CardEvent::OpenUrl { url: url.clone() })
            }
            ActionConfig::CallService {
                service,
                service_data,
            } => {
                let (domain, service) = service.as_deref()?.split_once('.')?;
                Some(CardEvent::CallService {
                    domain: domain.to_string(),
                    service: service.to_string(),
                    data: service_data.clone().unwrap_or_else(|| json!({})),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_classify_lifecycle_states() {
        assert_eq!(Reading::parse("21.5"), Reading::Number(21.5));
        assert_eq!(
            Reading::parse("unavailable"),
            Reading::Missing(Lifecycle::Unavailable)
        );
        assert_eq!(Reading::parse("unknown"), Reading::Missing(Lifecycle::Unknown));
        assert_eq!(Reading::parse("charging"), Reading::Text("charging".into()));
        assert_eq!(Reading::parse("NaN").number(), None);
    }

    #[test]
    fn toggle_routes_by_domain() {
        let CardEvent::CallService { domain, .. } = CardEvent::toggle("switch.car_charging") else {
            panic!("expected a service call");
        };
        assert_eq!(domain, "switch");

        let CardEvent::CallService { domain, data, .. } = CardEvent::toggle("cover.garage") else {
            panic!("expected a service call");
        };
        assert_eq!(domain, "homeassistant");
        assert_eq!(data["entity_id"], "cover.garage");
    }

    #[test]
    fn entities_are_listed_per_domain() {
        let hass = HassState::new()
            .with("sensor.b", EntityState::new("1"))
            .with("sensor.a", EntityState::new("2"))
            .with("switch.c", EntityState::new("on"));
        assert_eq!(hass.entities_in("sensor"), vec!["sensor.a", "sensor.b"]);
        assert!(hass.is_on(Some("switch.c")));
        assert_eq!(hass.number(Some("sensor.a")), Some(2.0));
        assert_eq!(hass.number(None), None);
    }

    #[test]
    fn actions_deserialize_from_ha_objects() {
        let action: ActionConfig =
            serde_json::from_value(json!({ "action": "call-service", "service": "light.turn_on" }))
                .unwrap();
        assert_eq!(
            action.resolve(None),
            Some(CardEvent::CallService {
                domain: "light".into(),
                service: "turn_on".into(),
                data: json!({}),
            })
        );
        let none: ActionConfig = serde_json::from_value(json!({ "action": "none" })).unwrap();
        assert_eq!(none.resolve(Some("sensor.x")), None);
    }
}
