//! Integration test: canonical cycle reports.

mod common;

use code_assert_core::extract::ExtractedClass;
use code_assert_core::{CycleDetector, CycleScope, Finding, Model};
use common::{build, write_classes, ClassBuilder};

fn ring_classes() -> Vec<ClassBuilder> {
    vec![
        ClassBuilder::new("p1.A").uses("p2.B"),
        ClassBuilder::new("p2.B").uses("p3.C"),
        ClassBuilder::new("p3.C").uses("p1.A"),
        ClassBuilder::new("p4.D").uses("p1.A"),
        ClassBuilder::new("x.X").uses("y.Y"),
        ClassBuilder::new("y.Y").extends("x.X"),
    ]
}

#[test]
fn ring_is_one_cycle_and_tail_stays_out() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_classes(dir.path(), &ring_classes());
    let model = build(dir.path()).model;

    let report = CycleDetector::packages(&model).detect();
    let members: Vec<Vec<&str>> = report
        .cycles
        .iter()
        .map(|c| c.members.iter().map(String::as_str).collect())
        .collect();
    assert_eq!(members, [vec!["p1", "p2", "p3"], vec!["x", "y"]]);

    let text: String = report
        .cycles
        .iter()
        .map(|c| Finding::cycle(c, CycleScope::Packages).format())
        .collect();
    insta::assert_snapshot!("package_cycles", text);
}

#[test]
fn cycle_output_is_independent_of_input_order() {
    let edges = [("p1.A", "p2.B"), ("p2.B", "p3.C"), ("p3.C", "p1.A"), ("p4.D", "p1.A")];
    let classes = |order: &[usize]| -> Vec<ExtractedClass> {
        order
            .iter()
            .map(|&i| ExtractedClass::new(edges[i].0).with_reference(edges[i].1, 1))
            .collect()
    };

    let forward = Model::from_extracted(classes(&[0, 1, 2, 3]));
    let backward = Model::from_extracted(classes(&[3, 2, 1, 0]));
    let shuffled = Model::from_extracted(classes(&[2, 0, 3, 1]));

    let expected = CycleDetector::packages(&forward).detect();
    assert_eq!(CycleDetector::packages(&backward).detect(), expected);
    assert_eq!(CycleDetector::packages(&shuffled).detect(), expected);
    assert_eq!(expected.cycles.len(), 1);
}

#[test]
fn allowed_groups_suppress_cycles_and_stale_groups_are_reported() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_classes(dir.path(), &ring_classes());
    let model = build(dir.path()).model;

    let report = CycleDetector::packages(&model)
        .except([vec!["x", "y", "z"], vec!["q", "r"]])
        .detect();
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].members, ["p1", "p2", "p3"]);
    assert_eq!(report.unused_exceptions, [vec!["q".to_string(), "r".to_string()]]);
}

#[test]
fn class_scope_follows_class_edges() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_classes(dir.path(), &ring_classes());
    let model = build(dir.path()).model;

    let report = CycleDetector::classes(&model).detect();
    let members: Vec<&Vec<String>> = report.cycles.iter().map(|c| &c.members).collect();
    assert_eq!(
        members,
        [
            &vec!["p1.A".to_string(), "p2.B".to_string(), "p3.C".to_string()],
            &vec!["x.X".to_string(), "y.Y".to_string()],
        ]
    );
}
