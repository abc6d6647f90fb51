use ls_controls::*;
use ls_core::{Condition, Real, SisoBlock, replay};
use ls_ident::IdentifierConfig;
use ls_models::{ArxCoefficients, create_sim_object};
use proptest::prelude::*;

const PERIOD: Real = 0.1;

/// Close the loop by hand: the regulator sees the previous plant output.
fn closed_loop(regulator: &mut Regulator, setpoint: Real, steps: usize) -> Vec<Real> {
    let model = ArxCoefficients::first_order(0.9, 0.1, 1).unwrap();
    let mut plant = create_sim_object(1, model, PERIOD).unwrap();
    let preview = vec![setpoint; regulator.preview_len()];
    let mut measured = 0.0;
    (0..steps)
        .map(|k| {
            let t = k as Real * PERIOD;
            regulator.set_setpoint_trajectory(&preview);
            let u = regulator.step(measured, t).unwrap();
            measured = plant.step(u, t).unwrap();
            measured
        })
        .collect()
}

proptest! {
    #[test]
    fn pid_with_only_kp_matches_p(
        kp in -5.0f64..5.0,
        setpoint in -10.0f64..10.0,
        measurements in prop::collection::vec(-10.0f64..10.0, 1..40),
    ) {
        let mut p = create_regulator(&RegulatorSpec::Proportional { kp }, PERIOD).unwrap();
        let mut pid = create_regulator(
            &RegulatorSpec::Pid(PIDController::new(kp, 0.0, 0.0).unwrap()),
            PERIOD,
        ).unwrap();
        p.set_setpoint_trajectory(&[setpoint]);
        pid.set_setpoint_trajectory(&[setpoint]);
        for (k, &y) in measurements.iter().enumerate() {
            let t = k as Real * PERIOD;
            prop_assert_eq!(p.step(y, t).unwrap(), pid.step(y, t).unwrap());
        }
    }

    #[test]
    fn regulators_replay_identically(
        kp in 0.1f64..3.0,
        ki in 0.0f64..1.0,
        kd in 0.0f64..0.5,
        measurements in prop::collection::vec(-2.0f64..2.0, 1..30),
    ) {
        let pid = PIDController::new(kp, ki, kd).unwrap().with_derivative_filter(0.05).unwrap();
        let specs = [
            RegulatorSpec::Proportional { kp },
            RegulatorSpec::Pid(pid),
            RegulatorSpec::Gpc(GPCConfig::default()),
        ];
        for spec in &specs {
            let mut reg = create_regulator(spec, PERIOD).unwrap();
            let run = |reg: &mut Regulator| {
                reg.reset();
                reg.set_setpoint_trajectory(&[1.0; 4]);
                measurements
                    .iter()
                    .enumerate()
                    .map(|(k, &y)| reg.step(y, k as Real * PERIOD).unwrap())
                    .collect::<Vec<_>>()
            };
            let first = run(&mut reg);
            let second = run(&mut reg);
            prop_assert_eq!(first, second);
        }
    }
}

#[test]
fn pid_and_p_closed_loops_coincide() {
    let mut p = create_regulator(&RegulatorSpec::Proportional { kp: 1.0 }, PERIOD).unwrap();
    let mut pid = create_regulator(
        &RegulatorSpec::Pid(PIDController::new(1.0, 0.0, 0.0).unwrap()),
        PERIOD,
    )
    .unwrap();
    assert_eq!(closed_loop(&mut p, 1.0, 60), closed_loop(&mut pid, 1.0, 60));
}

#[test]
fn pid_integral_removes_offset() {
    let pid = PIDController::new(2.0, 1.0, 0.0).unwrap();
    let mut reg = create_regulator(&RegulatorSpec::Pid(pid), PERIOD).unwrap();
    let y = closed_loop(&mut reg, 1.0, 600);
    assert!((y[599] - 1.0).abs() < 1e-3, "final output {}", y[599]);
}

#[test]
fn gpc_tracks_step_on_identified_model() {
    // the measurement lags the plant output by one tick, so the regulator
    // sees a total delay of two samples
    let config = GPCConfig {
        prediction_horizon: 10,
        control_weight: 0.1,
        identifier: IdentifierConfig {
            delay: 2,
            ..Default::default()
        },
        initial_model: ArxCoefficients::first_order(0.5, 0.5, 2).unwrap(),
        ..Default::default()
    };
    let mut reg = create_regulator(&RegulatorSpec::Gpc(config), PERIOD).unwrap();
    let y = closed_loop(&mut reg, 1.0, 80);
    for (k, value) in y.iter().enumerate().skip(40) {
        assert!((value - 1.0).abs() < 0.05, "step {k}: output {value}");
    }
    let Regulator::Gpc(gpc) = &reg else {
        panic!("expected gpc");
    };
    assert!(gpc.model_identified());
    let model = gpc.active_model();
    assert!((model.a[0] + 0.9).abs() < 0.05, "a = {:?}", model.a);
    assert!((model.b[0] - 0.1).abs() < 0.05, "b = {:?}", model.b);
}

#[test]
fn degenerate_gpc_holds_previous_command() {
    let config = GPCConfig {
        control_weight: 0.0,
        initial_model: ArxCoefficients::new(vec![-0.5], vec![0.0], 1).unwrap(),
        warmup_updates: Some(usize::MAX),
        ..Default::default()
    };
    let mut reg = create_regulator(&RegulatorSpec::Gpc(config), PERIOD).unwrap();
    reg.set_setpoint_trajectory(&[1.0; 4]);
    let out = replay(&mut reg, &[0.0, 0.2, 0.4], 0.0, PERIOD);
    // replay resets first, which clears the trajectory; the held command stays 0
    assert_eq!(out.unwrap(), vec![0.0; 3]);
    assert!(
        reg.conditions()
            .iter()
            .any(|c| matches!(c, Condition::ControlComputationDegenerate { .. }))
    );
}
