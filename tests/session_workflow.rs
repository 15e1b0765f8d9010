use bone_enhancer::{
    ActionState, CastPolicy, EnhancementSession, Error, LayoutDescriptor, ProcessingEngine,
    Result, ScalarType, SessionConfig, ViewLayoutRegistry, Volume, VoxelData,
};
use ndarray::Array3;

/// Records every call and writes `input + 1` into the output.
#[derive(Default)]
struct RecordingEngine {
    calls: Vec<(Vec<f64>, String, ScalarType)>,
}

impl ProcessingEngine for RecordingEngine {
    fn invoke(
        &mut self,
        input: &Volume,
        output: &mut Volume,
        parameters: &[f64],
        algorithm: &str,
    ) -> Result<f64> {
        self.calls
            .push((parameters.to_vec(), algorithm.to_string(), input.scalar_type()));
        let source = input
            .samples()
            .ok_or_else(|| Error::Engine("input is not double".to_string()))?;
        let shifted = source.mapv(|v| v + 1.0);
        output
            .samples_mut()
            .ok_or_else(|| Error::Engine("output is not double".to_string()))?
            .assign(&shifted);
        Ok(0.0421)
    }
}

fn ultrasound(scalar: u8) -> Volume {
    Volume::new(
        "US",
        VoxelData::U8(Array3::from_elem((4, 5, 6), scalar)),
        (0.3, 0.3, 0.6),
        (10.0, 20.0, 30.0),
    )
}

fn session(config: SessionConfig) -> EnhancementSession<RecordingEngine> {
    EnhancementSession::with_builtin_catalog(config, RecordingEngine::default()).unwrap()
}

#[test]
fn non_double_input_is_cast_before_the_engine_runs() {
    let mut session = session(SessionConfig::default());
    let input = session.add_volume(ultrasound(9)).unwrap();

    let elapsed = session.apply().unwrap();

    assert_eq!(elapsed, 0.042);
    assert_eq!(session.runtime_label(), "0.042 s.");
    let (vector, algorithm, seen) = &session.engine().calls[0];
    assert_eq!(vector, &vec![3.0, 0.4, 6.0, 5.0, 5.0, 60.0]);
    assert_eq!(algorithm, "Foroughi2007");
    assert_eq!(*seen, ScalarType::Double);
    assert_eq!(session.scene().get(input).unwrap().scalar_type(), ScalarType::Double);
}

#[test]
fn reject_policy_never_calls_the_engine() {
    let mut session = session(SessionConfig {
        cast_policy: CastPolicy::Reject,
        ..SessionConfig::default()
    });
    session.add_volume(ultrasound(9)).unwrap();

    let err = session.apply().unwrap_err();
    assert!(matches!(
        err,
        Error::ScalarTypePrecondition { found: ScalarType::U8, .. }
    ));
    assert!(session.engine().calls.is_empty());
    assert_eq!(session.apply_state(), ActionState::Idle);
}

#[test]
fn output_volume_keeps_its_identity_across_runs() {
    let mut session = session(SessionConfig::default());
    session.add_volume(ultrasound(1)).unwrap();

    session.apply().unwrap();
    let output = session.output_volume().unwrap();
    let first_generation = session.scene().get(output).unwrap().generation();

    session.parameters_mut().set_value("Shadow Sigma", 2.0).unwrap();
    session.apply().unwrap();

    assert_eq!(session.output_volume(), Some(output));
    let result = session.scene().get(output).unwrap();
    assert_eq!(result.name(), "BoneEnhancedImage");
    assert!(result.generation() > first_generation);
    assert_eq!(result.spacing(), (0.3, 0.3, 0.6));
    assert_eq!(result.origin(), (10.0, 20.0, 30.0));
    assert_eq!(result.samples().unwrap()[[3, 4, 5]], 2.0);
    assert_eq!(session.engine().calls[1].0[2], 2.0);
}

#[test]
fn panes_show_input_above_and_result_below() {
    let mut session = session(SessionConfig::default());
    let input = session.add_volume(ultrasound(3)).unwrap();
    session.apply().unwrap();
    let output = session.output_volume().unwrap();

    let layouts = session.layouts();
    for pane in ["Red", "Yellow", "Green"] {
        assert_eq!(layouts.pane(pane).unwrap().volume, Some(input));
        assert!(!layouts.is_stale(pane, session.scene()));
    }
    for pane in ["RedBone", "YellowBone", "GreenBone"] {
        assert_eq!(layouts.pane(pane).unwrap().volume, Some(output));
    }
    let fit = layouts.pane("Red").unwrap().fit.unwrap();
    assert_eq!(fit.slice_index, 2);
    assert!((fit.field_of_view.0 - 1.8).abs() < 1e-9);
    assert!((fit.field_of_view.1 - 1.5).abs() < 1e-9);
}

#[test]
fn layout_must_be_registered_before_activation() {
    let mut registry = ViewLayoutRegistry::new();
    assert!(matches!(registry.activate(501), Err(Error::UnknownLayout(501))));

    registry
        .register_layout(501, LayoutDescriptor::comparison())
        .unwrap();
    registry
        .register_layout(501, LayoutDescriptor::comparison())
        .unwrap();
    registry.activate(501).unwrap();
    assert!(matches!(
        registry.register_layout(501, LayoutDescriptor::new("Other")),
        Err(Error::LayoutConflict(501))
    ));
}

#[test]
fn casting_a_volume_onto_itself_stays_disabled() {
    let mut session = session(SessionConfig::default());
    let volume = session.add_volume(ultrasound(0)).unwrap();
    session.select_output(Some(volume));

    assert!(!session.can_cast());
    assert!(matches!(session.cast_selected(None), Err(Error::SameVolume(_))));
    assert_eq!(session.scene().get(volume).unwrap().scalar_type(), ScalarType::U8);
}

#[test]
fn full_scene_fails_apply_and_leaves_panes_unbound() {
    let mut session = session(SessionConfig {
        max_scene_volumes: Some(1),
        ..SessionConfig::default()
    });
    session.add_volume(ultrasound(0)).unwrap();

    let err = session.apply().unwrap_err();
    assert!(matches!(err, Error::Allocation(_)));
    assert!(!err.is_user_recoverable());
    assert!(session.engine().calls.is_empty());
    assert_eq!(session.layouts().pane("Red").unwrap().volume, None);
    assert_eq!(session.apply_state(), ActionState::Idle);
}
