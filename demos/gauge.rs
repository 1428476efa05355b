use std::sync::Arc;
use std::time::{Duration, Instant};

use neon_cards::cards::DualGaugeCard;
use neon_cards::{CardInstance, CssVarCache, EntityState, HassState};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder().finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut card = CardInstance::<DualGaugeCard>::from_config(
        &json!({
            "gauges": [
                { "entity": "sensor.cpu", "unit": "%", "decimals": 0 },
                { "entity": "sensor.grid", "min": -3000, "max": 3000, "unit": "W", "decimals": 0, "leds_count": 60 },
            ]
        }),
        Arc::new(CssVarCache::default()),
    )?;

    let start = Instant::now();
    let mut now = start;
    for (cpu, grid) in [(12, -800), (35, 250), (90, 2400), (90, 2410), (55, 0)] {
        let hass = HassState::new()
            .with("sensor.cpu", EntityState::new(cpu.to_string()))
            .with("sensor.grid", EntityState::new(grid.to_string()));
        card.set_hass(&hass, now);

        // Drive frames until the transitions settle.
        let mut frames = 0;
        loop {
            let ran = card.run_due_frames(now);
            if ran == 0 {
                break;
            }
            frames += ran;
            now += Duration::from_millis(16);
        }

        let doc = card.document();
        let active = doc
            .find_all_with(doc.root(), "data-led")
            .into_iter()
            .filter(|led| doc.has_class(*led, "active"))
            .count();
        println!(
            "cpu {:>3} grid {:>5}: {} frames, {} active leds, {} patches",
            cpu,
            grid,
            frames,
            active,
            card.patches()
        );
        now += Duration::from_secs(1);
    }
    println!("elapsed {:?} of card time", now - start);
    Ok(())
}
