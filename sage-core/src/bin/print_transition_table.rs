use chrono::{TimeDelta, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use itertools::Itertools;
use sage_core::transition_planner::{transition_steps, TransitionStep};
use sage_domain::{Address, CrewCount, FleetState, Sector, TargetState};
use strum::IntoEnumIterator;
use tracing::{event, Level};
use tracing_subscriber::EnvFilter;

fn sample_states() -> Vec<(&'static str, FleetState)> {
    let now = Utc::now();
    let sector = Sector::new(0, 0);
    let to_sector = Sector::new(-40, 30);

    vec![
        ("Idle", FleetState::Idle { sector }),
        (
            "MoveWarp (arrived)",
            FleetState::MoveWarp {
                to_sector,
                arrival_time: now - TimeDelta::minutes(1),
            },
        ),
        (
            "MoveWarp (in flight)",
            FleetState::MoveWarp {
                to_sector,
                arrival_time: now + TimeDelta::minutes(10),
            },
        ),
        (
            "MoveSubwarp (arrived)",
            FleetState::MoveSubwarp {
                to_sector,
                arrival_time: now - TimeDelta::minutes(1),
            },
        ),
        (
            "MoveSubwarp (in flight)",
            FleetState::MoveSubwarp {
                to_sector,
                arrival_time: now + TimeDelta::hours(2),
            },
        ),
        (
            "StarbaseLoadingBay",
            FleetState::StarbaseLoadingBay {
                starbase: Address::new("STARBASE"),
            },
        ),
        (
            "MineAsteroid",
            FleetState::MineAsteroid {
                resource: Address::new("RESOURCE"),
                asteroid: Address::new("ASTEROID"),
            },
        ),
        ("Respawn", FleetState::Respawn { sector }),
    ]
}

fn render_steps(steps: &[TransitionStep]) -> String {
    if steps.is_empty() {
        return "(nothing to do)".to_string();
    }
    steps.iter().map(|step| step.kind().to_string()).join(" -> ")
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let crew = CrewCount {
        current: 10,
        required: 10,
        capacity: 20,
    };
    let now = Utc::now();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .force_no_tty()
        .enforce_styling()
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Current", "Target", "Plan"]);

    let states = sample_states();
    for (label, state) in states.iter() {
        for target in TargetState::iter() {
            let plan = match transition_steps(state, &crew, target, now) {
                Ok(steps) => render_steps(&steps),
                Err(err) => format!("error: {err}"),
            };
            table.add_row(vec![label.to_string(), target.to_string(), plan]);
        }
    }

    event!(Level::INFO, "Rendered {} transitions", states.len() * TargetState::iter().count());
    println!("{table}");
    Ok(())
}
