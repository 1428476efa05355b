use std::sync::Arc;
use std::time::{Duration, Instant};

use neon_cards::cards::{BatteryCard, ThermoCard};
use neon_cards::history::HistorySample;
use neon_cards::{CardInstance, CssVarCache, EntityState, HassState};
use serde_json::json;

fn theme() -> Arc<CssVarCache> {
    Arc::new(CssVarCache::default())
}

fn temperature(state: &str) -> HassState {
    HassState::new().with("sensor.t", EntityState::new(state))
}

fn thermo(show_history: bool) -> CardInstance<ThermoCard> {
    CardInstance::from_config(
        &json!({ "entity": "sensor.t", "show_history": show_history }),
        theme(),
    )
    .unwrap()
}

fn text_of<C: neon_cards::Card>(card: &CardInstance<C>, id: &str) -> Option<String> {
    let doc = card.document();
    doc.find(id).and_then(|n| doc.text_of(n)).map(str::to_string)
}

fn samples(values: &[&str]) -> Vec<HistorySample> {
    values.iter().map(|v| HistorySample::new(*v)).collect()
}

#[test]
fn bursts_coalesce_into_one_patch_with_the_latest_reading() {
    let mut card = thermo(false);
    let now = Instant::now();
    for state in ["20.0", "21.0", "22.5"] {
        card.set_hass(&temperature(state), now);
    }
    assert_eq!(card.frames().pending(), 1);
    assert_eq!(card.run_due_frames(now), 1);
    assert_eq!(card.patches(), 1);
    assert_eq!(text_of(&card, "temp-val").as_deref(), Some("22.5"));
}

#[test]
fn unchanged_snapshots_schedule_nothing() {
    let mut card = thermo(false);
    let now = Instant::now();
    card.set_hass(&temperature("21.0"), now);
    card.run_due_frames(now);
    let mutations = card.document().mutations();

    card.set_hass(&temperature("21.0"), now);
    card.set_hass(&temperature("21.05"), now);
    assert_eq!(card.frames().pending(), 0);
    assert_eq!(card.run_due_frames(now), 0);
    assert_eq!(card.document().mutations(), mutations);
    assert_eq!(card.patches(), 1);
}

#[test]
fn unavailable_then_recovery() {
    let mut card = thermo(false);
    let now = Instant::now();
    let root = card.document().find("card").unwrap();

    card.set_hass(&temperature("unavailable"), now);
    card.run_due_frames(now);
    assert_eq!(text_of(&card, "temp-val").as_deref(), Some("—"));
    assert!(card.document().has_class(root, "unavailable"));

    card.set_hass(&temperature("19.4"), now);
    card.run_due_frames(now);
    assert_eq!(text_of(&card, "temp-val").as_deref(), Some("19.4"));
    assert!(!card.document().has_class(root, "unavailable"));
}

#[test]
fn non_numeric_states_keep_the_last_render() {
    let mut card = thermo(false);
    let now = Instant::now();
    card.set_hass(&temperature("18.0"), now);
    card.run_due_frames(now);
    card.set_hass(&temperature("warming up"), now);
    assert_eq!(card.run_due_frames(now), 0);
    assert_eq!(text_of(&card, "temp-val").as_deref(), Some("18.0"));
}

#[test]
fn debounced_cards_patch_after_the_quiet_period() {
    let mut card = CardInstance::<BatteryCard>::from_config(
        &json!({
            "entity": "sensor.batt",
            "debounce_updates": true,
            "update_interval": 1000,
            "smooth_transitions": false,
        }),
        theme(),
    )
    .unwrap();
    let start = Instant::now();
    let batt = |level: &str| HassState::new().with("sensor.batt", EntityState::new(level));

    card.set_hass(&batt("40"), start);
    card.set_hass(&batt("50"), start + Duration::from_millis(600));
    assert_eq!(card.frames().pending(), 0);

    let next = card.poll_timers(start + Duration::from_millis(1000));
    assert_eq!(next, Some(start + Duration::from_millis(1600)));
    assert_eq!(card.frames().pending(), 0);

    assert_eq!(card.poll_timers(start + Duration::from_millis(1600)), None);
    assert_eq!(card.run_due_frames(start + Duration::from_millis(1600)), 1);
    assert_eq!(card.patches(), 1);
    assert_eq!(text_of(&card, "batt-text").as_deref(), Some("50%"));
}

#[test]
fn hidden_cards_catch_up_when_shown() {
    let mut card = CardInstance::<BatteryCard>::from_config(
        &json!({
            "entity": "sensor.batt",
            "power_save_mode": true,
            "smooth_transitions": false,
        }),
        theme(),
    )
    .unwrap();
    let now = Instant::now();
    let batt = |level: &str| HassState::new().with("sensor.batt", EntityState::new(level));

    card.set_visible(false);
    card.set_hass(&batt("30"), now);
    card.set_hass(&batt("35"), now);
    assert_eq!(card.run_due_frames(now), 0);

    card.set_visible(true);
    assert_eq!(card.run_due_frames(now), 1);
    assert_eq!(card.patches(), 1);
    assert_eq!(text_of(&card, "batt-text").as_deref(), Some("35%"));
}

#[test]
fn history_repaints_through_a_frame() {
    let mut card = thermo(true);
    let now = Instant::now();
    let requests = card.set_hass(&temperature("20.0"), now);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query.entity_id, "sensor.t");
    card.run_due_frames(now);

    card.deliver_history(&requests[0].ticket, Ok(samples(&["18", "19", "unknown", "21"])));
    assert_eq!(card.frames().pending(), 1);
    card.run_due_frames(now);
    assert!(card.markup().contains("<polyline"));
    assert_eq!(text_of(&card, "spark-max").as_deref(), Some("MAX:21.0"));

    // Refresh is rate limited.
    assert!(card.set_hass(&temperature("20.5"), now + Duration::from_secs(60)).is_empty());
    assert_eq!(
        card.set_hass(&temperature("20.8"), now + Duration::from_secs(301)).len(),
        1
    );
}

#[test]
fn failed_or_short_history_is_ignored() {
    let mut card = thermo(true);
    let now = Instant::now();
    let requests = card.set_hass(&temperature("20.0"), now);
    card.run_due_frames(now);

    card.deliver_history(&requests[0].ticket, Err(anyhow::anyhow!("recorder offline")));
    card.deliver_history(&requests[0].ticket, Ok(samples(&["20"])));
    assert_eq!(card.frames().pending(), 0);
    assert!(!card.markup().contains("<polyline"));
}

#[test]
fn teardown_drops_late_history_and_updates() {
    let mut card = thermo(true);
    let now = Instant::now();
    let requests = card.set_hass(&temperature("20.0"), now);
    card.teardown();
    let mutations = card.document().mutations();

    card.deliver_history(&requests[0].ticket, Ok(samples(&["18", "19", "21"])));
    assert!(card.set_hass(&temperature("25.0"), now).is_empty());
    card.set_visible(true);
    assert_eq!(card.run_due_frames(now), 0);
    assert_eq!(card.document().mutations(), mutations);
    assert!(card.is_torn_down());
    assert_eq!(card.tap("card"), None);
}

#[test]
fn reconfigure_invalidates_in_flight_history() {
    let mut card = thermo(true);
    let now = Instant::now();
    let old = card.set_hass(&temperature("20.0"), now);
    card.run_due_frames(now);

    let fresh = card
        .reconfigure(&json!({ "entity": "sensor.t", "temp_max": 50 }), now)
        .unwrap();
    assert_eq!(card.generation(), 1);
    assert_eq!(fresh.len(), 1);
    card.run_due_frames(now);

    card.deliver_history(&old[0].ticket, Ok(samples(&["18", "19", "21"])));
    assert_eq!(card.frames().pending(), 0);

    card.deliver_history(&fresh[0].ticket, Ok(samples(&["18", "19", "21"])));
    card.run_due_frames(now);
    assert!(card.markup().contains("<polyline"));
    assert_eq!(text_of(&card, "temp-val").as_deref(), Some("20.0"));
}

#[test]
fn bad_reconfigure_keeps_the_current_card() {
    let mut card = thermo(false);
    let now = Instant::now();
    card.set_hass(&temperature("20.0"), now);
    card.run_due_frames(now);
    assert!(card.reconfigure(&json!({ "show_history": true }), now).is_err());
    assert_eq!(card.generation(), 0);
    assert_eq!(text_of(&card, "temp-val").as_deref(), Some("20.0"));
}
