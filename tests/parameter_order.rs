use bone_enhancer::{AlgorithmCatalog, AlgorithmDescriptor, Error, Parameter, ParameterSet};

fn parameter(key: &str, decimals: u32, step: f64, min: f64, max: f64, default: f64) -> Parameter {
    Parameter::new(key, decimals, step, min, max, default, format!("{key} ToolTip")).unwrap()
}

#[test]
fn two_parameter_catalog_serializes_in_key_order() {
    let descriptor = AlgorithmDescriptor::new(
        "Foroughi2007",
        "",
        "",
        "Extract Bone Features",
        [
            parameter("Transducer Margin", 0, 1.0, 0.0, 100.0, 60.0),
            parameter("Smoothing Sigma", 1, 1.0, 1.0, 10.0, 5.0),
        ],
    )
    .unwrap();

    assert_eq!(descriptor.ordered_keys(), ["Smoothing Sigma", "Transducer Margin"]);
    assert_eq!(ParameterSet::new(&descriptor).serialize(), vec![5.0, 60.0]);
}

#[test]
fn declaration_order_does_not_matter() {
    let keys = ["beta", "Alpha", "gamma", "Delta"];
    let forward = AlgorithmDescriptor::new(
        "A",
        "",
        "",
        "Run",
        keys.iter().map(|key| parameter(key, 0, 1.0, 0.0, 1.0, 0.0)),
    )
    .unwrap();
    let backward = AlgorithmDescriptor::new(
        "A",
        "",
        "",
        "Run",
        keys.iter().rev().map(|key| parameter(key, 0, 1.0, 0.0, 1.0, 0.0)),
    )
    .unwrap();

    assert_eq!(forward.ordered_keys(), ["Alpha", "beta", "Delta", "gamma"]);
    assert_eq!(forward.ordered_keys(), backward.ordered_keys());
}

#[test]
fn keys_equal_up_to_case_are_refused() {
    let result = AlgorithmDescriptor::new(
        "A",
        "",
        "",
        "Run",
        [
            parameter("Sigma", 0, 1.0, 0.0, 1.0, 0.0),
            parameter("sigma", 0, 1.0, 0.0, 1.0, 0.0),
        ],
    );
    assert!(matches!(result, Err(Error::DuplicateKey { .. })));
}

// The engine reads the vector positionally; this order must not drift.
#[test]
fn builtin_foroughi_vector_is_pinned() {
    let catalog = AlgorithmCatalog::builtin().unwrap();
    let foroughi = catalog.get("Foroughi2007").unwrap();
    assert_eq!(
        foroughi.ordered_keys(),
        [
            "Blurred vs. BLoG",
            "Bone Threshold",
            "Shadow Sigma",
            "Shadow vs. Intensity",
            "Smoothing Sigma",
            "Transducer Margin",
        ]
    );

    let mut values = ParameterSet::new(foroughi);
    assert_eq!(values.serialize(), vec![3.0, 0.4, 6.0, 5.0, 5.0, 60.0]);

    values.set_value("Bone Threshold", 0.75).unwrap();
    values.set_value_clamped("Transducer Margin", 250.0).unwrap();
    assert_eq!(values.serialize(), vec![3.0, 0.8, 6.0, 5.0, 5.0, 100.0]);
}

#[test]
fn out_of_range_value_is_rejected_without_change() {
    let catalog = AlgorithmCatalog::builtin().unwrap();
    let mut values = ParameterSet::new(catalog.get("Foroughi2007").unwrap());
    let err = values.set_value("Smoothing Sigma", 11.0).unwrap_err();
    assert!(matches!(err, Error::OutOfRange { .. }));
    assert_eq!(values.value("Smoothing Sigma").unwrap(), 5.0);
}
