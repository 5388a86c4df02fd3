//! End-to-end tests of the four-agent lockstep run.
//!
//! Each test builds a [`Simulation`] from a config, runs it on real
//! threads, and checks the reports, the final world, and the commit
//! journal.

#![allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use verdant_core::config::SimulationConfig;
use verdant_core::report::{CollectingSink, JsonLinesSink};
use verdant_core::runner::{Simulation, SimulationEndReason, SimulationResult};
use verdant_types::{Field, Role, WorldSnapshot};

fn run(config: SimulationConfig) -> (SimulationResult, Vec<WorldSnapshot>) {
    let mut sink = CollectingSink::new();
    let result = Simulation::new(config)
        .unwrap()
        .with_journal()
        .run(&mut sink)
        .unwrap();
    (result, sink.into_reports())
}

fn quiet(max_ticks: u64) -> SimulationConfig {
    let mut config = SimulationConfig::default().without_noise();
    config.simulation.max_ticks = max_ticks;
    config
}

#[test]
fn first_tick_matches_hand_computation() {
    let (result, reports) = run(quiet(1));

    assert_eq!(result.ticks, 1);
    assert_eq!(reports.len(), 1);
    let first = reports[0];
    assert_eq!(first.date.year, 2024);
    assert_eq!(first.date.month.index(), 0);
    // 5 inches of grain support 5 deer, so 2 deer step up to 3.
    assert_eq!(first.population, 3);
    // January is not the growth month.
    assert_eq!(first.pressure, 5);
    assert_eq!(result.final_snapshot.date.month.index(), 1);
}

#[test]
fn midpoint_climate_grows_full_rate() {
    let mut config = quiet(1);
    config.climate.avg_temperature = 40.0;
    config.climate.amp_temperature = 0.0;
    config.climate.avg_precipitation = 10.0;
    config.climate.amp_precipitation = 0.0;

    let (_, reports) = run(config);

    // 5 + 12 - 2 deer * 1 inch.
    assert_eq!(reports[0].vegetation_height, 15.0);
    assert_eq!(reports[0].climate.temperature, 40.0);
}

#[test]
fn every_field_has_a_single_writer_per_phase() {
    let ticks = 8;
    let (result, _) = run(quiet(ticks));
    let journal = &result.journal;

    assert_eq!(journal.len(), 5 * usize::try_from(ticks).unwrap());
    for record in journal {
        assert_eq!(record.role, record.field.writer());
        let phase = record.generation % 3;
        if record.field.written_in_epilogue() {
            assert_eq!(record.role, Role::Reporter);
            assert_eq!(phase, 1, "{record:?}");
        } else {
            assert_eq!(phase, 0, "{record:?}");
        }
    }

    for tick in 0..ticks {
        let in_tick: Vec<_> = journal
            .iter()
            .filter(|r| r.generation / 3 == tick)
            .collect();
        for field in Field::ALL {
            assert_eq!(
                in_tick.iter().filter(|r| r.field == field).count(),
                1,
                "tick {tick} field {field}"
            );
        }
    }
}

#[test]
fn clock_advances_one_month_per_tick_until_end_year() {
    let (result, reports) = run(SimulationConfig::default());

    assert_eq!(result.end_reason, SimulationEndReason::EndYearReached);
    assert_eq!(reports.len(), 72);
    for (i, report) in reports.iter().enumerate() {
        let i = i32::try_from(i).unwrap();
        assert_eq!(report.date.year, 2024 + i / 12);
        assert_eq!(i32::from(report.date.month.index()), i % 12);
    }
    assert_eq!(result.final_snapshot.date.year, 2030);
    assert_eq!(result.final_snapshot.date.month.index(), 0);
}

#[test]
fn humans_grow_once_per_year() {
    let (result, reports) = run(SimulationConfig::default());

    // Six growth months between 2024 and 2029.
    assert_eq!(result.final_snapshot.pressure, 5 + 6);
    for pair in reports.windows(2) {
        assert!(pair[1].pressure >= pair[0].pressure);
    }
}

#[test]
fn quantities_stay_non_negative_under_harsh_conditions() {
    let mut config = SimulationConfig::default();
    config.initial.population = 40;
    config.ecology.consumption_per_consumer = 5.0;
    config.climate.avg_precipitation = 0.5;
    config.climate.precipitation_noise = 6.0;
    config.world.seed = 9;

    let (_, reports) = run(config);

    assert!(!reports.is_empty());
    for report in &reports {
        assert!(report.vegetation_height >= 0.0);
        assert!(report.climate.precipitation >= 0.0);
    }
    // Grazing wipes the grain out and the herd starves down with it.
    assert_eq!(reports[0].vegetation_height, 0.0);
    assert!(reports.last().unwrap().population < 40);
}

#[test]
fn same_seed_gives_identical_runs() {
    let mut config = SimulationConfig::default();
    config.simulation.end_year = 2026;

    let (_, first) = run(config.clone());
    let (_, second) = run(config.clone());
    assert_eq!(first, second);

    config.world.seed = config.world.seed.wrapping_add(1);
    let (_, other) = run(config);
    assert_ne!(first, other);
}

#[test]
fn all_agents_complete_the_same_number_of_ticks() {
    let (result, _) = run(quiet(17));

    assert_eq!(result.outcomes.len(), Role::ALL.len());
    for (outcome, role) in result.outcomes.iter().zip(Role::ALL) {
        assert_eq!(outcome.role, role);
        assert_eq!(outcome.ticks, 17);
    }
    assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
}

#[test]
fn start_after_end_year_runs_nothing() {
    let mut config = SimulationConfig::default();
    config.initial.year = 2031;

    let (result, reports) = run(config);

    assert_eq!(result.ticks, 0);
    assert!(reports.is_empty());
    assert!(result.journal.is_empty());
    assert_eq!(result.final_snapshot.date.year, 2031);
}

#[test]
fn json_reports_parse_back() {
    let mut sink = JsonLinesSink::new(Vec::new());
    Simulation::new(quiet(3)).unwrap().run(&mut sink).unwrap();
    let text = String::from_utf8(sink.into_inner()).unwrap();

    let parsed: Vec<WorldSnapshot> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed[2].date.month.index(), 2);
}

#[test]
fn watchdog_does_not_disturb_a_healthy_run() {
    let mut config = quiet(24);
    config.simulation.watchdog_timeout_ms = 10_000;

    let (result, reports) = run(config);

    assert_eq!(result.ticks, 24);
    assert_eq!(reports.len(), 24);
}
