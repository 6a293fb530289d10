//! Statistical properties of the mutation sampler.

use progspace::bias::BiaserSet;
use progspace::custom::CustomRegistry;
use progspace::extract::extract_distributions;
use progspace::generate::{Generator, GeneratorOptions};
use progspace::model::DistributionModel;
use progspace::mutate::{Mutator, MutatorOptions};
use progspace::random::Rng;
use progspace::typereg::{FieldDef, StructDef, TypeRef, TypeRegistry};
use progspace::value::{PrimitiveValue, Value};

/// A struct of three booleans enumerates exactly three single-point
/// proposals (one negation per field) and no others.
fn three_bool_registry() -> TypeRegistry {
    TypeRegistry {
        structs: vec![StructDef {
            fqn: "M.Flags".to_string(),
            interfaces: vec![],
            fields: ["a", "b", "c"]
                .iter()
                .map(|name| FieldDef {
                    name: name.to_string(),
                    type_ref: TypeRef::primitive("boolean"),
                    optional: false,
                })
                .collect(),
        }],
        ..Default::default()
    }
}

fn flags_fixture() -> (DistributionModel, CustomRegistry, Value) {
    let mut model =
        extract_distributions(&three_bool_registry(), &BiaserSet::empty()).unwrap();
    let customs = CustomRegistry::with_defaults();
    let mut rng = Rng::seeded(0);
    let value = Generator::new(&mut model, &customs, &mut rng, GeneratorOptions::default())
        .minimal("M.Flags")
        .unwrap();
    (model, customs, value)
}

fn negated_field(variant: &Value) -> usize {
    let Value::StructLiteral { entries, .. } = variant else {
        panic!("expected struct literal");
    };
    entries
        .iter()
        .position(|(_, v)| {
            matches!(
                v,
                Value::Primitive {
                    value: PrimitiveValue::Boolean(true),
                    ..
                }
            )
        })
        .expect("one field must be negated")
}

/// Reservoir sampling with k=1 must be observationally equivalent to a
/// uniform draw over the proposal stream. Chi-squared test over fixed
/// seeds, 2 degrees of freedom; the bound sits beyond the p=0.001
/// critical value (13.8), so a correct sampler never trips it.
#[test]
fn test_k1_selection_uniform_chi_squared() {
    let (model, customs, value) = flags_fixture();

    const RUNS: usize = 600;
    let mut counts = [0usize; 3];
    for seed in 0..RUNS as u64 {
        let mut rng = Rng::seeded(1000 + seed);
        let variants = Mutator::new(&model, &customs, &mut rng, MutatorOptions { variants: 1 })
            .mutate(&value)
            .unwrap();
        assert_eq!(variants.len(), 1);
        counts[negated_field(&variants[0])] += 1;
    }

    let expected = RUNS as f64 / 3.0;
    let chi_squared: f64 = counts
        .iter()
        .map(|&observed| {
            let delta = observed as f64 - expected;
            delta * delta / expected
        })
        .sum();
    assert!(
        chi_squared < 13.8,
        "chi-squared {} too high for counts {:?}",
        chi_squared,
        counts
    );
}

/// Larger reservoirs keep at most k variants and every variant is a real
/// proposal (a struct with exactly one negated field).
#[test]
fn test_reservoir_contents_are_proposals() {
    let (model, customs, value) = flags_fixture();
    for seed in 0..50u64 {
        let mut rng = Rng::seeded(seed);
        let variants = Mutator::new(&model, &customs, &mut rng, MutatorOptions { variants: 2 })
            .mutate(&value)
            .unwrap();
        assert!(!variants.is_empty());
        assert!(variants.len() <= 2);
        for variant in &variants {
            // Exactly one negation: membership in the enumerated stream.
            negated_field(variant);
            assert_ne!(variant, &value);
        }
    }
}

/// With k=2 and three proposals, both reservoir slots fill on some seeds.
#[test]
fn test_reservoir_slot_occupancy_varies() {
    let (model, customs, value) = flags_fixture();
    let mut seen_lengths = std::collections::HashSet::new();
    for seed in 0..200u64 {
        let mut rng = Rng::seeded(seed);
        let variants = Mutator::new(&model, &customs, &mut rng, MutatorOptions { variants: 2 })
            .mutate(&value)
            .unwrap();
        seen_lengths.insert(variants.len());
    }
    assert!(seen_lengths.contains(&2), "two survivors never observed");
}
