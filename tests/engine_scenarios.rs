//! End-to-end scenarios over synthetic registries: minimal generation,
//! biasing, mutation sampling, discretization, and evaluation working
//! together.

mod common;

use common::construct_registry;
use progspace::bias::BiaserSet;
use progspace::custom::CustomRegistry;
use progspace::eval::{Evaluator, JsonHost};
use progspace::extract::extract_distributions;
use progspace::generate::{Generator, GeneratorOptions};
use progspace::model::DistributionModel;
use progspace::mutate::{Mutator, MutatorOptions};
use progspace::random::Rng;
use progspace::statements::{discretize, Statement};
use progspace::typereg::{FieldDef, StructDef, TypeRef, TypeRegistry};
use progspace::value::{PrimitiveValue, Value};

fn biased_model() -> DistributionModel {
    extract_distributions(
        &construct_registry(),
        &BiaserSet::with_defaults(vec!["M.IConstruct".to_string()]),
    )
    .unwrap()
}

fn minimal(model: &mut DistributionModel, fqn: &str, seed: u64) -> Value {
    let customs = CustomRegistry::with_defaults();
    let mut rng = Rng::seeded(seed);
    Generator::new(model, &customs, &mut rng, GeneratorOptions::default())
        .minimal(fqn)
        .unwrap()
}

/// Scenario: minimal construct generation with the biaser active. The
/// `(scope, id)` shape produces a scope placeholder and a generated id.
#[test]
fn test_minimal_stack_with_biaser() {
    let mut model = biased_model();
    let value = minimal(&mut model, "M.Stack", 1);
    let Value::ClassInstantiation {
        fqn,
        parameter_names,
        arguments,
        ..
    } = &value
    else {
        panic!("expected class instantiation, got {:?}", value);
    };
    assert_eq!(fqn, "M.Stack");
    assert_eq!(parameter_names, &["scope", "id", "props"]);
    assert_eq!(arguments.len(), 3);
    assert!(matches!(arguments[0], Value::Scope { .. }));
    assert!(matches!(
        &arguments[1],
        Value::Primitive {
            value: PrimitiveValue::String(_),
            ..
        }
    ));
    // The optional props trail off as an absent placeholder.
    assert!(arguments[2].is_no_value());
}

/// Scenario: without the biaser, the scope argument is grown from the
/// interface's only implementation.
#[test]
fn test_minimal_stack_unbiased_builds_app() {
    let mut model =
        extract_distributions(&construct_registry(), &BiaserSet::empty()).unwrap();
    let value = minimal(&mut model, "M.Stack", 1);
    let Value::ClassInstantiation { arguments, .. } = &value else {
        panic!("expected class instantiation");
    };
    let Value::ClassInstantiation { fqn, .. } = &arguments[0] else {
        panic!("expected nested instantiation for scope, got {:?}", arguments[0]);
    };
    assert_eq!(fqn, "M.App");
}

/// Scenario: struct minimal omits optional fields.
#[test]
fn test_minimal_props_omits_count() {
    let mut model = biased_model();
    let value = minimal(&mut model, "M.Props", 2);
    let Value::StructLiteral { entries, .. } = &value else {
        panic!("expected struct literal");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "name");
}

/// Scenario: enum minimal is the first member.
#[test]
fn test_minimal_enum_member() {
    let mut model = biased_model();
    let value = minimal(&mut model, "M.E", 3);
    assert_eq!(format!("{}", value), "M.E.A");
}

/// Scenario: mutation sampling with k=1 yields exactly one variant that
/// differs from the original at exactly one point.
#[test]
fn test_single_mutation_differs_at_one_point() {
    let mut model = biased_model();
    let value = minimal(&mut model, "M.Stack", 1);
    let customs = CustomRegistry::with_defaults();
    let mut rng = Rng::seeded(4);
    let variants = Mutator::new(&model, &customs, &mut rng, MutatorOptions { variants: 1 })
        .mutate(&value)
        .unwrap();
    assert_eq!(variants.len(), 1);
    assert_eq!(divergent_subtrees(&value, &variants[0]), 1);
}

/// Count maximal divergent subtrees between two values. A single-point
/// edit must produce exactly one.
fn divergent_subtrees(a: &Value, b: &Value) -> usize {
    if a == b {
        return 0;
    }
    match (a, b) {
        (
            Value::ClassInstantiation {
                fqn: fa,
                arguments: aa,
                ..
            },
            Value::ClassInstantiation {
                fqn: fb,
                arguments: ab,
                ..
            },
        ) if fa == fb && aa.len() == ab.len() => {
            aa.iter().zip(ab).map(|(x, y)| divergent_subtrees(x, y)).sum()
        }
        (
            Value::StructLiteral { entries: ea, .. },
            Value::StructLiteral { entries: eb, .. },
        ) if ea.len() == eb.len()
            && ea.iter().zip(eb.iter()).all(|(x, y)| x.0 == y.0) =>
        {
            ea.iter()
                .zip(eb)
                .map(|((_, x), (_, y))| divergent_subtrees(x, y))
                .sum()
        }
        (
            Value::ArrayValue { elements: ea, .. },
            Value::ArrayValue { elements: eb, .. },
        ) if ea.len() == eb.len() => {
            ea.iter().zip(eb).map(|(x, y)| divergent_subtrees(x, y)).sum()
        }
        // Different shape or payload: one divergence here.
        _ => 1,
    }
}

/// Scenario: recursion break. A struct referencing itself through an
/// optional field generates with the slot absent.
#[test]
fn test_self_referential_struct_generates() {
    let registry = TypeRegistry {
        structs: vec![StructDef {
            fqn: "M.Node".to_string(),
            interfaces: vec![],
            fields: vec![FieldDef {
                name: "child".to_string(),
                type_ref: TypeRef::named("M.Node"),
                optional: true,
            }],
        }],
        ..Default::default()
    };
    let mut model = extract_distributions(&registry, &BiaserSet::empty()).unwrap();
    let value = minimal(&mut model, "M.Node", 5);
    let Value::StructLiteral { entries, .. } = &value else {
        panic!("expected struct literal");
    };
    assert!(entries.is_empty());
}

/// Scenario: discretize extraction. A nested instantiation becomes an
/// assignment followed by the top-level expression.
#[test]
fn test_discretize_unbiased_stack() {
    let mut model =
        extract_distributions(&construct_registry(), &BiaserSet::empty()).unwrap();
    let value = minimal(&mut model, "M.Stack", 1);
    let statements = discretize(&value);
    assert_eq!(statements.len(), 2);
    let Statement::Assignment { name, .. } = &statements[0] else {
        panic!("expected assignment first");
    };
    assert_eq!(name, "app1");
    let Statement::Expression { value } = &statements[1] else {
        panic!("expected trailing expression");
    };
    let Value::ClassInstantiation { arguments, .. } = value else {
        panic!("expected instantiation");
    };
    assert_eq!(
        arguments[0],
        Value::Variable {
            name: "app1".to_string()
        }
    );
}

/// Full pipeline: generate, discretize, evaluate against the built-in
/// host, and round-trip the value through JSON on the way.
#[test]
fn test_pipeline_round_trip_and_evaluation() {
    let registry = construct_registry();
    let mut model = extract_distributions(&registry, &BiaserSet::empty()).unwrap();
    let value = minimal(&mut model, "M.Stack", 7);

    let json = serde_json::to_string(&value).unwrap();
    let reparsed: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value, reparsed);

    let artifact_direct = Evaluator::new(JsonHost::new(registry.clone()))
        .run(&discretize(&value))
        .unwrap();
    let artifact_reparsed = Evaluator::new(JsonHost::new(registry))
        .run(&discretize(&reparsed))
        .unwrap();
    assert_eq!(artifact_direct, artifact_reparsed);
    assert_eq!(artifact_direct["$type"], "M.Stack");
}

/// Determinism across the whole pipeline for a fixed (model, seed).
#[test]
fn test_generation_and_mutation_deterministic() {
    let run = || {
        let mut model = biased_model();
        let value = minimal(&mut model, "M.Stack", 99);
        let customs = CustomRegistry::with_defaults();
        let mut rng = Rng::seeded(100);
        let variants =
            Mutator::new(&model, &customs, &mut rng, MutatorOptions { variants: 3 })
                .mutate(&value)
                .unwrap();
        (value, variants)
    };
    let (value_a, variants_a) = run();
    let (value_b, variants_b) = run();
    assert_eq!(value_a, value_b);
    assert_eq!(variants_a, variants_b);
}

/// Model persistence: extraction output survives a JSON round-trip and
/// keeps generating identical values.
#[test]
fn test_model_round_trip_preserves_generation() {
    let model = biased_model();
    let mut reloaded = DistributionModel::from_json(&model.to_json()).unwrap();
    let mut original = model.clone();
    let a = minimal(&mut original, "M.Stack", 13);
    let b = minimal(&mut reloaded, "M.Stack", 13);
    assert_eq!(a, b);
}
