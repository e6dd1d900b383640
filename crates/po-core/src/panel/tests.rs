//! Tests for the panel normalization layer

use approx::assert_abs_diff_eq;
use ndarray::{Array2, Array3, array};
use proptest::prelude::*;

use super::*;
use crate::data::{DataFrame, Series};
use crate::error::PanelError;

// ==================== Test Fixtures ====================

/// Two variables over 2 entities x 3 periods, rows shuffled
fn shuffled_frame() -> DataFrame {
    DataFrame::from_columns(vec![
        ("firm", Series::string(&["b", "a", "b", "a", "a", "b"])),
        ("year", Series::int(vec![2, 1, 1, 3, 2, 3])),
        ("x", Series::float(vec![5.0, 1.0, 4.0, 3.0, 2.0, 6.0])),
        ("z", Series::int(vec![50, 10, 40, 30, 20, 60])),
    ])
    .unwrap()
}

fn labels<T: Into<Label> + Clone>(values: &[T]) -> Vec<Label> {
    values.iter().cloned().map(Into::into).collect()
}

// ==================== Index ====================

#[test]
fn test_index_canonical_order() {
    let keys = vec![
        (Label::from("b"), Label::from(1)),
        (Label::from("a"), Label::from(2)),
        (Label::from("a"), Label::from(1)),
    ];
    let (index, order) = PanelIndex::from_keys(&keys).unwrap();

    assert_eq!(index.len(), 3);
    assert_eq!(index.entities(), &labels(&["a", "b"])[..]);
    assert_eq!(index.times(), &labels(&[1, 2])[..]);
    assert_eq!(order, vec![2, 1, 0]);
    assert_eq!(index.key(0), Some((&Label::from("a"), &Label::from(1))));
    assert_eq!(index.position(&Label::from("b"), &Label::from(1)), Some(2));
    assert_eq!(index.position(&Label::from("b"), &Label::from(2)), None);
    assert!(!index.is_balanced());
}

#[test]
fn test_index_rejects_duplicate_keys() {
    let keys = vec![
        (Label::from(1), Label::from(1)),
        (Label::from(1), Label::from(1)),
    ];
    let err = PanelIndex::from_keys(&keys).unwrap_err();
    assert_eq!(
        err,
        PanelError::DuplicateKey {
            entity: Label::from(1),
            time: Label::from(1)
        }
    );
    assert!(err.is_shape_error());
}

#[test]
fn test_index_groups_and_subset() {
    let (index, _) = PanelIndex::cross(&labels(&[0, 1]), &labels(&[0, 1, 2])).unwrap();
    assert!(index.is_balanced());
    assert_eq!(index.entity_groups(), vec![vec![0, 1, 2], vec![3, 4, 5]]);
    assert_eq!(index.time_groups(), vec![vec![0, 3], vec![1, 4], vec![2, 5]]);

    let sub = index.subset(&[0, 1, 3]).unwrap();
    assert_eq!(sub.len(), 3);
    assert_eq!(sub.times(), &labels(&[0, 1])[..]);
    assert_eq!(sub.time_codes(), &[0, 1, 0]);

    assert!(index.subset(&[10]).is_err());
}

#[test]
fn test_label_ordering_puts_integers_first() {
    let mut values = vec![Label::from("a"), Label::from(10), Label::from(-2)];
    values.sort();
    assert_eq!(values, vec![Label::from(-2), Label::from(10), Label::from("a")]);
    assert_eq!(Label::from("firm").to_string(), "firm");
}

// ==================== Shape Adapter ====================

#[test]
fn test_tabular_adapter_sorts_rows() {
    let panel = PanelInput::tabular(shuffled_frame(), "firm", "year")
        .unwrap()
        .into_panel("exog")
        .unwrap();

    assert_eq!(panel.names(), vec!["x", "z"]);
    assert_eq!(panel.len(), 6);
    assert_eq!(panel.index().entities(), &labels(&["a", "b"])[..]);

    match panel.get("x").unwrap().column() {
        PanelColumn::Numeric(values) => {
            assert_eq!(values.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
        }
        other => panic!("unexpected column {:?}", other),
    }
    assert_eq!(panel.value("z", &Label::from("b"), &Label::from(2)), Some(50.0));
}

#[test]
fn test_tabular_duplicate_key_is_shape_error() {
    let df = DataFrame::from_columns(vec![
        ("id", Series::int(vec![1, 1])),
        ("t", Series::int(vec![5, 5])),
        ("x", Series::float(vec![0.0, 1.0])),
    ])
    .unwrap();
    let err = PanelInput::tabular(df, "id", "t")
        .unwrap()
        .into_panel("exog")
        .unwrap_err();
    assert!(err.is_shape_error());
}

#[test]
fn test_tabular_key_validation() {
    let df = shuffled_frame();
    assert!(PanelInput::tabular(df.clone(), "firm", "firm").is_err());
    assert!(PanelInput::tabular(df.clone(), "firm", "quarter").is_err());

    let float_keys = DataFrame::from_columns(vec![
        ("id", Series::float(vec![1.0])),
        ("t", Series::int(vec![1])),
        ("x", Series::float(vec![1.0])),
    ])
    .unwrap();
    let err = PanelInput::tabular(float_keys, "id", "t")
        .unwrap()
        .into_panel("exog")
        .unwrap_err();
    assert!(matches!(err, PanelError::Shape { .. }));

    let keys_only = df.select(["firm", "year"]).unwrap();
    let err = PanelInput::tabular(keys_only, "firm", "year")
        .unwrap()
        .into_panel("exog")
        .unwrap_err();
    assert!(matches!(err, PanelError::Shape { .. }));
}

#[test]
fn test_split_dependent() {
    let table = TabularPanel::new(shuffled_frame(), "firm", "year").unwrap();
    let (dep, exog) = table.clone().split_dependent("z").unwrap();

    let dep = dep.into_panel("dependent").unwrap();
    let exog = exog.into_panel("exog").unwrap();
    assert_eq!(dep.names(), vec!["z"]);
    assert_eq!(exog.names(), vec!["x"]);

    assert!(table.clone().split_dependent("firm").is_err());
    assert!(table.split_dependent("w").is_err());
}

#[test]
fn test_array_adapter_names_and_layout() {
    // [variable, time, entity]
    let mut cube = Array3::zeros((2, 3, 2));
    for t in 0..3 {
        for e in 0..2 {
            cube[[0, t, e]] = (10 * e + t) as f64;
            cube[[1, t, e]] = -((10 * e + t) as f64);
        }
    }
    let panel = PanelInput::array3(cube).into_panel("exog").unwrap();
    assert_eq!(panel.names(), vec!["exog.0", "exog.1"]);
    assert_eq!(panel.value("exog.0", &Label::from(1), &Label::from(2)), Some(12.0));
    assert_eq!(panel.value("exog.1", &Label::from(0), &Label::from(1)), Some(-1.0));

    let single = PanelInput::array2(array![[1.0, 2.0], [3.0, 4.0]])
        .into_panel("dependent")
        .unwrap();
    assert_eq!(single.names(), vec!["dependent"]);
    // time 1, entity 0
    assert_eq!(single.value("dependent", &Label::from(0), &Label::from(1)), Some(3.0));

    let named = PanelInput::from(ArrayPanel::from_slice(array![[1.0]]).with_name("wage"))
        .into_panel("dependent")
        .unwrap();
    assert_eq!(named.names(), vec!["wage"]);
}

#[test]
fn test_array_adapter_rejects_empty_axes() {
    let err = PanelInput::array3(Array3::zeros((0, 2, 2)))
        .into_panel("exog")
        .unwrap_err();
    assert!(err.is_shape_error());

    let err = PanelInput::array2(Array2::zeros((0, 3)))
        .into_panel("exog")
        .unwrap_err();
    assert!(err.is_shape_error());
}

#[test]
fn test_labelled_array_validation() {
    let values = Array3::zeros((1, 2, 2));
    let times = labels(&[2000, 2001]);
    let entities = labels(&["a", "b"]);

    assert!(
        LabelledArray::new(values.clone(), vec!["x".into()], times.clone(), entities.clone())
            .is_ok()
    );
    assert!(
        LabelledArray::new(values.clone(), vec!["x".into(), "y".into()], times.clone(), entities.clone())
            .unwrap_err()
            .is_shape_error()
    );
    assert!(
        LabelledArray::new(values.clone(), vec!["x".into()], labels(&[2000, 2000]), entities)
            .unwrap_err()
            .is_shape_error()
    );
    assert!(
        LabelledArray::new(values, vec!["x".into()], times, labels(&["a"]))
            .unwrap_err()
            .is_shape_error()
    );
}

#[test]
fn test_encodings_yield_identical_panels() {
    // one variable, entities {0, 1}, periods {0, 1, 2}
    let slice = array![[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]];

    let from_array = PanelInput::array2(slice.clone()).into_panel("x").unwrap();
    let from_labelled = PanelInput::labelled(
        LabelledArray::from_slice("x", slice, labels(&[0, 1, 2]), labels(&[0, 1])).unwrap(),
    )
    .into_panel("ignored")
    .unwrap();
    let frame = DataFrame::from_columns(vec![
        ("e", Series::int(vec![1, 0, 1, 0, 1, 0])),
        ("t", Series::int(vec![0, 0, 1, 1, 2, 2])),
        ("x", Series::float(vec![4.0, 1.0, 5.0, 2.0, 6.0, 3.0])),
    ])
    .unwrap();
    let from_table = PanelInput::tabular(frame, "e", "t")
        .unwrap()
        .into_panel("ignored")
        .unwrap();

    assert_eq!(from_array, from_labelled);
    assert_eq!(from_array, from_table);
}

// ==================== Alignment ====================

#[test]
fn test_align_drops_missing_pairwise() {
    let dep = PanelInput::array2(array![[1.0, f64::NAN], [2.0, 4.0]])
        .into_panel("y")
        .unwrap();
    let exog = PanelInput::array2(array![[1.0, 1.0], [f64::NAN, 3.0]])
        .into_panel("x")
        .unwrap();

    let aligned = align(dep, exog).unwrap();
    assert_eq!(aligned.n_obs(), 2);
    assert_eq!(aligned.n_dropped(), 2);
    assert_eq!(aligned.dependent().to_vec(), vec![1.0, 4.0]);
    assert_eq!(aligned.index().key(1), Some((&Label::from(1), &Label::from(1))));
    assert_eq!(aligned.dependent_name(), "y");
}

#[test]
fn test_align_disjoint_indexes_is_insufficient_data() {
    let dep = PanelInput::labelled(
        LabelledArray::from_slice("y", array![[1.0, 2.0]], labels(&[1]), labels(&["a", "b"])).unwrap(),
    )
    .into_panel("y")
    .unwrap();
    let exog = PanelInput::labelled(
        LabelledArray::from_slice("x", array![[1.0, 2.0]], labels(&[1]), labels(&["c", "d"])).unwrap(),
    )
    .into_panel("x")
    .unwrap();

    let err = align(dep, exog).unwrap_err();
    assert!(matches!(err, PanelError::InsufficientData { .. }));
}

#[test]
fn test_align_rejects_bad_dependent() {
    let two_vars = PanelInput::array3(Array3::ones((2, 2, 2))).into_panel("y").unwrap();
    let exog = PanelInput::array2(Array2::ones((2, 2))).into_panel("x").unwrap();
    assert!(align(two_vars, exog.clone()).unwrap_err().is_shape_error());

    let frame = DataFrame::from_columns(vec![
        ("e", Series::int(vec![0, 1])),
        ("t", Series::int(vec![0, 0])),
        ("y", Series::string(&["u", "v"])),
    ])
    .unwrap();
    let categorical_dep = PanelInput::tabular(frame, "e", "t")
        .unwrap()
        .into_panel("y")
        .unwrap();
    assert!(align(categorical_dep, exog).unwrap_err().is_shape_error());
}

#[test]
fn test_align_unobserved_categorical_is_degenerate() {
    let frame = DataFrame::from_columns(vec![
        ("e", Series::int(vec![0, 1])),
        ("t", Series::int(vec![0, 0])),
        ("y", Series::float(vec![1.0, 2.0])),
        ("g", Series::string_opt::<&str>(&[None, None])),
    ])
    .unwrap();
    let (dep, exog) = TabularPanel::new(frame, "e", "t")
        .unwrap()
        .split_dependent("y")
        .unwrap();
    let err = align(dep.into_panel("y").unwrap(), exog.into_panel("x").unwrap()).unwrap_err();
    assert_eq!(
        err,
        PanelError::DegenerateVariable {
            variable: "g".into()
        }
    );
}

#[test]
fn test_align_rejects_infinite_values() {
    let dep = PanelInput::array2(array![[1.0, 2.0], [3.0, 4.0]]).into_panel("y").unwrap();
    let exog = PanelInput::array2(array![[1.0, f64::INFINITY], [2.0, 3.0]])
        .into_panel("x")
        .unwrap();
    assert!(align(dep.clone(), exog).unwrap_err().is_shape_error());

    let bad_dep = PanelInput::array2(array![[1.0, f64::NEG_INFINITY], [3.0, 4.0]])
        .into_panel("y")
        .unwrap();
    let exog = PanelInput::array2(array![[1.0, 2.0], [2.0, 3.0]]).into_panel("x").unwrap();
    assert!(align(bad_dep, exog).unwrap_err().is_shape_error());
}

// ==================== Categorical Expander ====================

fn categorical(name: &str, values: &[&str]) -> EntityContainer {
    EntityContainer::categorical(name, values.iter().map(|v| Some(v.to_string())).collect())
}

#[test]
fn test_expansion_drops_first_seen_level() {
    let vars = vec![
        EntityContainer::numeric("x", vec![1.0, 2.0, 3.0, 4.0]),
        categorical("g", &["b", "a", "c", "a"]),
    ];
    let design = CategoricalExpander::new().expand(4, &vars).unwrap();

    assert_eq!(design.names(), &["x", "g.a", "g.c"]);
    assert_eq!(design.matrix().column(1).to_vec(), vec![0.0, 1.0, 0.0, 1.0]);
    assert_eq!(design.matrix().column(2).to_vec(), vec![0.0, 0.0, 1.0, 0.0]);
    let summary = &design.report().categoricals[0];
    assert_eq!(summary.reference.as_deref(), Some("b"));
    assert_eq!(summary.levels, vec!["b", "a", "c"]);
}

#[test]
fn test_expansion_sorted_order() {
    let vars = vec![categorical("g", &["b", "a", "c", "a"])];
    let design = CategoricalExpander::new()
        .with_order(LevelOrder::Sorted)
        .expand(4, &vars)
        .unwrap();
    assert_eq!(design.names(), &["g.b", "g.c"]);
}

#[test]
fn test_expansion_keep_all_levels() {
    let vars = vec![categorical("g", &["b", "a"])];
    let design = CategoricalExpander::new()
        .with_drop_first(false)
        .expand(2, &vars)
        .unwrap();
    assert_eq!(design.names(), &["g.b", "g.a"]);
    assert_eq!(design.report().categoricals[0].reference, None);
    let row_sums = design.matrix().sum_axis(ndarray::Axis(1));
    assert_abs_diff_eq!(row_sums, array![1.0, 1.0]);
}

#[test]
fn test_single_level_expands_to_nothing() {
    let vars = vec![
        EntityContainer::numeric("x", vec![1.0, 2.0]),
        categorical("g", &["only", "only"]),
    ];
    let design = CategoricalExpander::new().expand(2, &vars).unwrap();
    assert_eq!(design.ncols(), 1);
    assert_eq!(design.report().degenerate, vec!["g".to_string()]);
}

#[test]
fn test_expansion_without_levels_is_degenerate() {
    let vars = vec![EntityContainer::categorical("g", vec![None, None])];
    let err = CategoricalExpander::new().expand(2, &vars).unwrap_err();
    assert!(matches!(err, PanelError::DegenerateVariable { .. }));
}

#[test]
fn test_expansion_length_mismatch() {
    let vars = vec![EntityContainer::numeric("x", vec![1.0, 2.0])];
    assert!(CategoricalExpander::new().expand(3, &vars).unwrap_err().is_shape_error());
}

#[test]
fn test_expansion_rejects_colliding_names() {
    let vars = vec![
        categorical("g", &["a", "b", "a"]),
        EntityContainer::numeric("g.b", vec![1.0, 2.0, 3.0]),
    ];
    let err = CategoricalExpander::new().expand(3, &vars).unwrap_err();
    assert!(err.is_shape_error());
}

proptest! {
    #[test]
    fn prop_expansion_has_levels_minus_one_columns(codes in prop::collection::vec(0u8..6, 1..60)) {
        let values: Vec<Option<String>> = codes.iter().map(|c| Some(format!("l{}", c))).collect();
        let n_levels = codes.iter().collect::<std::collections::HashSet<_>>().len();
        let vars = vec![EntityContainer::categorical("g", values)];
        let expander = CategoricalExpander::new();

        let first = expander.expand(codes.len(), &vars).unwrap();
        let second = expander.expand(codes.len(), &vars).unwrap();

        prop_assert_eq!(first.ncols(), n_levels - 1);
        prop_assert_eq!(&first, &second);
        let reference = format!("l{}", codes[0]);
        prop_assert_eq!(first.report().categoricals[0].reference.as_deref(), Some(reference.as_str()));
    }
}
