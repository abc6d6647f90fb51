use std::path::Path;

use ls_sim::*;

fn demo(name: &str) -> ls_project::LoopDef {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos").join(name);
    ls_project::load_yaml(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", name, e))
}

#[test]
fn batch_runs_independent_loops() {
    let defs = vec![
        demo("p_loop.yaml"),
        demo("gpc_loop.yaml"),
        demo("pid_cascade.yaml"),
    ];
    let outcomes = run_batch(&defs);
    assert_eq!(outcomes.len(), 3);
    for (def, outcome) in defs.iter().zip(&outcomes) {
        let outcome = outcome.as_ref().unwrap();
        assert_eq!(outcome.state, LoopState::Completed);
        assert_eq!(outcome.manifest.loop_name, def.name);
        assert_eq!(outcome.historian.len(CHANNEL_PLANT), def.steps);
        assert_eq!(outcome.manifest.kernel_version, KERNEL_VERSION);
    }
}

#[test]
fn batch_matches_sequential_runs() {
    let defs = vec![demo("pid_cascade.yaml"), demo("pid_cascade.yaml")];
    let outcomes = run_batch(&defs);
    let sequential = run_definition(&defs[0]).unwrap();
    for outcome in &outcomes {
        let outcome = outcome.as_ref().unwrap();
        assert_eq!(outcome.manifest.run_id, sequential.manifest.run_id);
        assert_eq!(
            outcome.historian.samples(CHANNEL_PLANT).unwrap(),
            sequential.historian.samples(CHANNEL_PLANT).unwrap()
        );
    }
}

#[test]
fn invalid_member_fails_alone() {
    let mut broken = demo("p_loop.yaml");
    broken.period_s = -1.0;
    let outcomes = run_batch(&[demo("p_loop.yaml"), broken]);
    assert!(outcomes[0].is_ok());
    assert!(outcomes[1].is_err());
}
