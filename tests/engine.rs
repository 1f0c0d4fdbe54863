//! End-to-end behavior of the erosion engine through the public API.

use std::ops::ControlFlow;

use hydroerode::erosion::{ConfigError, EngineBuilder, ErosionConfig, ErosionEngine, ErosionError};
use hydroerode::pipeline::PassId;
use hydroerode::random::{seeded, Sequence};
use hydroerode::terrain::Field;

fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "{} vs {} (tol {})", a, b, tol);
}

#[test]
fn test_hydrate_and_dissolve_reference_grid() {
    let heights = vec![
        vec![100.0, 100.0, 150.0, 100.0],
        vec![100.0, 150.0, 150.0, 150.0],
        vec![100.0, 100.0, 150.0, 100.0],
        vec![100.0, 100.0, 100.0, 100.0],
    ];
    let config = ErosionConfig {
        dissolve_rate: 0.5,
        ..ErosionConfig::with_size(4)
    };
    let mut engine =
        ErosionEngine::with_heights(config, heights.clone(), Sequence::constant(0.5)).unwrap();

    engine.hydrate(Some(5.0)).unwrap();
    engine.dissolve().unwrap();

    let rock = engine.pluck(Field::Rock);
    let sediment = engine.pluck(Field::Sediment);
    let water = engine.pluck(Field::Water);
    for i in 0..4 {
        for j in 0..4 {
            assert_eq!(water[i][j], 5.0);
            assert_eq!(sediment[i][j], 2.5);
            assert_eq!(rock[i][j], heights[i][j] - 2.5);
        }
    }

    // A second pass dissolves half as much because of the sediment term.
    engine.dissolve().unwrap();
    assert_eq!(engine.pluck(Field::Sediment)[0][0], 3.75);
}

#[test]
fn test_flow_from_scenario_center() {
    let config = ErosionConfig {
        dissolve_rate: 0.1,
        randomness: 0.0,
        ..ErosionConfig::with_size(3)
    };
    let heights = vec![
        vec![100.0, 100.0, 80.0],
        vec![100.0, 100.0, 90.0],
        vec![100.0, 100.0, 100.0],
    ];
    let mut engine = ErosionEngine::with_heights(config, heights, Sequence::constant(0.0)).unwrap();

    engine.hydrate(Some(50.0)).unwrap();
    engine.dissolve().unwrap();
    assert_eq!(engine.pluck(Field::Rock)[1][1], 95.0);
    assert_eq!(engine.pluck(Field::Sediment)[1][1], 5.0);

    engine.flow();
    assert_close(engine.pluck(Field::StagedWater)[1][1], -5.0, 1e-12);
    assert_close(engine.pluck(Field::StagedSediment)[1][1], -0.5, 1e-12);

    let before = engine.budget();
    engine.resolve();
    let after = engine.budget();
    assert_close(after.water, before.water, 1e-9);
    assert_close(after.sediment, before.sediment, 1e-9);
    assert_close(engine.pluck(Field::Water)[1][1], 45.0, 1e-12);
}

#[test]
fn test_same_seed_same_result() {
    let run = |seed: u64| {
        let mut engine = ErosionEngine::new(ErosionConfig::with_size(12), seeded(seed)).unwrap();
        engine.cycle(25).unwrap();
        (engine.heights(), engine.pluck(Field::Sediment))
    };

    assert_eq!(run(7), run(7));
    assert_ne!(run(7).0, run(8).0);
}

#[test]
fn test_fields_stay_non_negative() {
    let config = ErosionConfig {
        rain_splash: 0.2,
        dissolve_rate: 0.1,
        smooth_every: 5,
        ..ErosionConfig::with_size(16)
    };
    let mut engine = EngineBuilder::new(config)
        .height_fn(|i, j| 100.0 + ((i * 7 + j * 13) % 17) as f64)
        .build(seeded(42))
        .unwrap();
    engine.cycle(40).unwrap();

    for cell in engine.grid().cells() {
        assert!(cell.rock >= 0.0 && cell.rock.is_finite());
        assert!(cell.water >= 0.0 && cell.water.is_finite());
        assert!(cell.sediment >= 0.0 && cell.sediment.is_finite());
        assert!(!cell.has_staged());
    }
    assert_eq!(engine.cycles_run(), 40);
}

#[test]
fn test_material_and_water_conserved_without_rain_or_evaporation() {
    let config = ErosionConfig {
        chance_of_rain: 0.0,
        evaporation_rate: 0.0,
        dry_threshold: 0.0,
        dissolve_rate: 0.05,
        final_smooth: false,
        ..ErosionConfig::with_size(8)
    };
    let mut engine = EngineBuilder::new(config)
        .height_fn(|i, j| 100.0 + (i * 8 + j) as f64)
        .build(seeded(3))
        .unwrap();
    engine.hydrate(Some(2.0)).unwrap();

    let before = engine.budget();
    engine.cycle(30).unwrap();
    let after = engine.budget();

    assert_close(after.material(), before.material(), 1e-6);
    assert_close(after.water, before.water, 1e-9);
}

#[test]
fn test_flat_dry_grid_is_stable() {
    let config = ErosionConfig {
        chance_of_rain: 0.0,
        ..ErosionConfig::with_size(6)
    };
    let mut engine = ErosionEngine::with_height_fn(config, |_, _| 120.0, seeded(1)).unwrap();
    engine.cycle(10).unwrap();

    for row in engine.heights() {
        for h in row {
            assert_eq!(h, 120.0);
        }
    }
}

#[test]
fn test_cancel_after_flow_leaves_no_staging() {
    let mut engine = ErosionEngine::new(ErosionConfig::with_size(6), seeded(11)).unwrap();
    let mut passes = 0;
    let result = engine.cycle_with_callbacks(10, |p| {
        passes += 1;
        if p.cycle == 3 && p.pass == PassId::Flow {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    match result {
        Err(ErosionError::Cancelled { cycle, pass }) => {
            assert_eq!(cycle, 3);
            assert_eq!(pass, PassId::Resolve);
        }
        other => panic!("expected cancellation, got {:?}", other.err()),
    }
    assert_eq!(passes, 2 * 5 + 4);
    assert_eq!(engine.cycles_run(), 2);
    assert!(!engine.grid().has_staged());
}

#[test]
fn test_config_file_drives_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("erosion.json");
    let json = r#"{ "size": 5, "chance_of_rain": 1.0, "final_smooth": false }"#;
    std::fs::write(&path, json).unwrap();

    let config = ErosionConfig::load_json(&path).unwrap();
    assert_eq!(config.size, 5);
    assert_eq!(config.amount_of_rain, 1.0);

    let mut engine =
        ErosionEngine::with_height_fn(config, |_, _| 100.0, Sequence::constant(0.9)).unwrap();
    engine.rain();
    assert_eq!(engine.budget().water, 25.0);
}

#[test]
fn test_non_finite_dissolve_aborts_cycle() {
    let config = ErosionConfig {
        dissolve_rate: f64::MAX,
        ..ErosionConfig::with_size(3)
    };
    let mut engine =
        ErosionEngine::with_height_fn(config, |_, _| 100.0, Sequence::constant(0.9)).unwrap();
    engine.hydrate(Some(5.0)).unwrap();
    let before = engine.pluck(Field::Rock);

    let err = engine.dissolve().unwrap_err();
    assert!(matches!(err, ErosionError::NonFinite { i: 0, j: 0, .. }));
    assert_eq!(engine.pluck(Field::Rock), before);
}

#[test]
fn test_non_finite_hydrate_keeps_existing_water() {
    let config = ErosionConfig::with_size(3);
    let mut engine = ErosionEngine::with_height_fn(config, |_, _| 100.0, seeded(5)).unwrap();
    engine.hydrate(Some(4.0)).unwrap();

    for amount in [f64::NAN, f64::INFINITY] {
        let err = engine.hydrate(Some(amount)).unwrap_err();
        assert!(matches!(err, ErosionError::NonFiniteInput { .. }));
        assert_eq!(engine.budget().water, 36.0);
    }
}

#[test]
fn test_negative_dissolve_rate_is_rejected() {
    let config = ErosionConfig {
        dissolve_rate: -0.5,
        ..ErosionConfig::with_size(3)
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OutOfRange { name: "dissolve_rate", .. })
    ));
    assert!(matches!(
        ErosionEngine::new(config, seeded(1)),
        Err(ErosionError::Config(ConfigError::OutOfRange { name: "dissolve_rate", .. }))
    ));
}
