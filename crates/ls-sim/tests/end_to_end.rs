use ls_core::Condition;
use ls_sim::*;
use proptest::prelude::*;

const P_LOOP: &str = r#"
version: 1
name: p-loop
period_s: 0.1
steps: 100
generators:
  - name: setpoint
    type: step
    params:
      amplitude: 1.0
regulator:
  name: ctrl
  kind: proportional
  kp: 2.0
plant:
  name: tank
  type: arx
  a: [-0.9]
  b: [0.1]
  delay: 1
"#;

fn p_loop() -> SimulationLoop {
    compile_loop(&ls_project::from_yaml_str(P_LOOP).unwrap()).unwrap()
}

fn values(sim: &SimulationLoop, channel: &str) -> Vec<f64> {
    sim.historian()
        .samples(channel)
        .unwrap()
        .iter()
        .map(|s| s.value)
        .collect()
}

#[test]
fn proportional_loop_settles_monotonically() {
    let mut sim = p_loop();
    assert_eq!(sim.run().unwrap(), LoopState::Completed);

    for channel in [CHANNEL_GENERATOR, CHANNEL_REGULATOR, CHANNEL_PLANT, CHANNEL_ERROR] {
        assert_eq!(sim.historian().len(channel), 100, "channel {channel}");
    }
    let y = values(&sim, CHANNEL_PLANT);
    assert!(y.windows(2).all(|w| w[1] >= w[0]), "plant output not monotone");
    assert!(y.iter().all(|&v| v <= 2.0 / 3.0 + 1e-12));
    assert!((y[99] - 2.0 / 3.0).abs() < 1e-9, "final output {}", y[99]);

    let e = values(&sim, CHANNEL_ERROR);
    assert_eq!(e[0], 1.0);
    assert!((e[99] - 1.0 / 3.0).abs() < 1e-9);
    assert!(sim.historian().warnings().is_empty());
}

#[test]
fn abort_keeps_partial_history() {
    let mut sim = p_loop();
    let handle = sim.abort_handle();
    let state = sim
        .run_with_progress(|p| {
            if p.step == 10 {
                handle.abort();
            }
        })
        .unwrap();
    assert!(matches!(state, LoopState::Aborted { .. }));
    assert_eq!(sim.historian().len(CHANNEL_PLANT), 10);
    assert_eq!(sim.step_index(), 10);

    // a reset loop can run again
    sim.reset();
    assert_eq!(sim.run().unwrap(), LoopState::Completed);
    assert_eq!(sim.historian().len(CHANNEL_PLANT), 100);
}

#[test]
fn abort_from_another_thread_before_start() {
    let mut sim = p_loop();
    let handle = sim.abort_handle();
    std::thread::spawn(move || handle.abort()).join().unwrap();
    let state = sim.run().unwrap();
    assert_eq!(
        state,
        LoopState::Aborted {
            reason: "abort requested".to_string()
        }
    );
    assert_eq!(sim.historian().total_samples(), 0);
}

#[test]
fn diverging_plant_aborts_after_recorded_ticks() {
    let yaml = P_LOOP
        .replace("kp: 2.0", "kp: 1.0")
        .replace("a: [-0.9]", "a: [-1.0e100]")
        .replace("b: [0.1]", "b: [1.0]");
    let mut sim = compile_loop(&ls_project::from_yaml_str(&yaml).unwrap()).unwrap();
    let state = sim.run().unwrap();
    let LoopState::Aborted { reason } = state else {
        panic!("expected abort, got {state:?}");
    };
    assert!(reason.contains("tank"), "reason: {reason}");
    // ticks 0..=4 stay finite, tick 5 overflows
    assert_eq!(sim.historian().len(CHANNEL_PLANT), 5);
    assert!(matches!(sim.tick(), Err(SimError::InvalidState { .. })));
}

#[test]
fn progress_reports_every_tick() {
    let mut sim = p_loop();
    let mut events = Vec::new();
    sim.run_with_progress(|p| events.push(p.clone())).unwrap();
    assert_eq!(events.len(), 100);
    assert_eq!(events[0].step, 1);
    assert_eq!(events[0].sim_time_s, 0.0);
    let last = events.last().unwrap();
    assert_eq!(last.fraction_complete, 1.0);
    assert!((last.t_end_s - 10.0).abs() < 1e-12);
    assert!(events.windows(2).all(|w| w[0].fraction_complete < w[1].fraction_complete));
}

#[test]
fn gpc_loop_tracks_step_and_logs_warnings() {
    let yaml = r#"
version: 1
name: gpc-step
period_s: 0.1
steps: 80
generators:
  - name: setpoint
    type: step
regulator:
  name: gpc
  kind: gpc
  prediction_horizon: 10
  control_weight: 0.1
  identifier:
    delay: 2
  initial_model:
    a: [-0.5]
    b: [0.5]
    delay: 2
plant:
  name: lag
  type: arx
  a: [-0.9]
  b: [0.1]
  delay: 1
"#;
    let mut sim = compile_loop(&ls_project::from_yaml_str(yaml).unwrap()).unwrap();
    assert_eq!(sim.run().unwrap(), LoopState::Completed);
    let y = values(&sim, CHANNEL_PLANT);
    for (k, v) in y.iter().enumerate().skip(40) {
        assert!((v - 1.0).abs() < 0.05, "step {k}: {v}");
    }
    // the very first regressor is all zeros
    let first = &sim.historian().warnings()[0];
    assert_eq!(first.source, "gpc");
    assert_eq!(first.time_s, 0.0);
    assert!(matches!(first.condition, Condition::IdentificationStalled { .. }));
}

#[test]
fn replay_after_reset_is_identical() {
    let text = std::fs::read_to_string(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/pid_cascade.yaml"),
    )
    .unwrap();
    let mut sim = compile_loop(&ls_project::from_yaml_str(&text).unwrap()).unwrap();
    sim.run().unwrap();
    let first = values(&sim, CHANNEL_PLANT);
    sim.reset();
    sim.run().unwrap();
    assert_eq!(first, values(&sim, CHANNEL_PLANT));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn p_loops_complete_and_replay(
        kp in 0.0f64..5.0,
        pole in -0.95f64..0.95,
        gain in 0.01f64..1.0,
        steps in 1usize..60,
    ) {
        let yaml = P_LOOP
            .replace("kp: 2.0", &format!("kp: {kp:?}"))
            .replace("a: [-0.9]", &format!("a: [{:?}]", -pole))
            .replace("b: [0.1]", &format!("b: [{gain:?}]"))
            .replace("steps: 100", &format!("steps: {steps}"));
        let mut sim = compile_loop(&ls_project::from_yaml_str(&yaml).unwrap()).unwrap();
        prop_assert_eq!(sim.run().unwrap(), LoopState::Completed);
        let first = values(&sim, CHANNEL_REGULATOR);
        prop_assert_eq!(first.len(), steps);
        sim.reset();
        sim.run().unwrap();
        prop_assert_eq!(first, values(&sim, CHANNEL_REGULATOR));
    }
}
