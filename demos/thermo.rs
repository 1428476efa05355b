use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use neon_cards::{CardRuntime, CssVarCache, EntityState, HassState, HistoryQuery, HistorySample, HistorySource};
use serde_json::json;

/// Pretends to be the recorder: a smooth daily curve around 20 °C.
struct DailyCurve;

#[async_trait]
impl HistorySource for DailyCurve {
    async fn fetch(&self, query: &HistoryQuery) -> anyhow::Result<Vec<HistorySample>> {
        tracing::info!("Fetching history for {}", query.entity_id);
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok((0..96)
            .map(|i| {
                let t = 20.0 + 4.0 * (i as f64 / 96.0 * std::f64::consts::TAU).sin();
                HistorySample::new(format!("{t:.1}"))
            })
            .collect())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let runtime = CardRuntime::start(
        &json!({
            "type": "custom:neon-thermo-card",
            "entity": "sensor.living_room",
            "humidity_entity": "sensor.living_room_humidity",
        }),
        Arc::new(CssVarCache::default()),
        Arc::new(DailyCurve),
    )?;

    let mut temp = 19.0;
    for _ in 0..10 {
        let hass = HassState::new()
            .with(
                "sensor.living_room",
                EntityState::new(format!("{temp:.1}")).with_attribute("friendly_name", "Living room"),
            )
            .with("sensor.living_room_humidity", EntityState::new("48"));
        runtime.set_hass(&hass).await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        println!("{:.1} °C, {} patches", temp, runtime.patches().await);
        temp += 0.35;
    }
    println!("{}", runtime.markup().await);

    runtime.shutdown().await;
    Ok(())
}
