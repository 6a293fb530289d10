//! Distribution extractor: normalized type registry in, distribution model
//! out.
//!
//! The walk is two-phase: every declaration contributes its FQN sources
//! (constructors, static members, value objects, enum members), and each
//! source is indexed under the producing FQN plus the supertypes that can
//! stand in for it.
//! Each freshly built source passes through the [`BiaserSet`] before it is
//! indexed, so all supertype entries share the biased shape.

use crate::bias::BiaserSet;
use crate::errors::Failure;
use crate::model::{DistributionModel, FieldSource, FqnSource, ParameterSource, ValueSource};
use crate::typereg::{ClassDef, StructDef, TypeRef, TypeRegistry};
use crate::value::DistRef;
use tracing::{debug, warn};

/// Convert a type registry into a distribution model.
pub fn extract_distributions(
    registry: &TypeRegistry,
    biasers: &BiaserSet,
) -> Result<DistributionModel, Failure> {
    let mut model = DistributionModel::new();

    for class in &registry.classes {
        extract_class(registry, class, biasers, &mut model)?;
    }
    for struct_def in &registry.structs {
        extract_struct(registry, struct_def, &mut model)?;
    }
    for enum_def in &registry.enums {
        for member in &enum_def.members {
            model.add_fqn_source(
                &enum_def.fqn,
                FqnSource::StaticPropertyAccess {
                    fqn: enum_def.fqn.clone(),
                    static_property: member.clone(),
                    target_fqn: enum_def.fqn.clone(),
                },
            );
        }
    }

    debug!(stats = %model.stats(), "extracted distribution model");
    Ok(model)
}

fn extract_class(
    registry: &TypeRegistry,
    class: &ClassDef,
    biasers: &BiaserSet,
    model: &mut DistributionModel,
) -> Result<(), Failure> {
    if let (true, Some(ctor)) = (class.is_instantiable(), &class.constructor) {
        let parameters = parameter_sources(registry, &ctor.parameters, model)?;
        let source = biasers.apply(
            FqnSource::ClassInstantiation {
                fqn: class.fqn.clone(),
                parameters,
            },
            model,
        )?;
        model.add_fqn_source(&class.fqn, source.clone());
        for supertype in registry.supertype_closure(&class.fqn) {
            model.add_fqn_source(&supertype, source.clone());
        }
    }

    for method in &class.static_methods {
        // Only methods returning a declared named type become factories.
        let TypeRef::Named { fqn: return_fqn } = &method.returns else {
            continue;
        };
        let parameters = parameter_sources(registry, &method.parameters, model)?;
        let source = biasers.apply(
            FqnSource::StaticMethodCall {
                fqn: class.fqn.clone(),
                static_method: method.name.clone(),
                target_fqn: return_fqn.clone(),
                parameters,
            },
            model,
        )?;
        // Indexed under the declared return type and, when that type is a
        // class, its ancestors. Interfaces of the return type do not
        // receive the source.
        model.add_fqn_source(return_fqn, source.clone());
        for ancestor in registry.class_ancestors(return_fqn) {
            model.add_fqn_source(&ancestor, source.clone());
        }
    }

    for property in &class.static_properties {
        let TypeRef::Named { fqn: type_fqn } = &property.type_ref else {
            continue;
        };
        model.add_fqn_source(
            type_fqn,
            FqnSource::StaticPropertyAccess {
                fqn: class.fqn.clone(),
                static_property: property.name.clone(),
                target_fqn: type_fqn.clone(),
            },
        );
    }

    Ok(())
}

fn extract_struct(
    registry: &TypeRegistry,
    struct_def: &StructDef,
    model: &mut DistributionModel,
) -> Result<(), Failure> {
    let mut fields = Vec::new();
    for field in &struct_def.fields {
        if !representable(registry, &field.type_ref) {
            if field.optional {
                warn!(
                    fqn = struct_def.fqn.as_str(),
                    field = field.name.as_str(),
                    "dropping optional field with unrepresentable type"
                );
                continue;
            }
            // A required field we cannot fill makes the whole literal
            // unbuildable.
            warn!(
                fqn = struct_def.fqn.as_str(),
                field = field.name.as_str(),
                "dropping struct: required field has unrepresentable type"
            );
            return Ok(());
        }
        let dist = distribution_for(registry, &field.type_ref, field.optional, model)?;
        fields.push(FieldSource {
            name: field.name.clone(),
            dist,
        });
    }
    let source = FqnSource::ValueObject {
        fqn: struct_def.fqn.clone(),
        fields,
    };
    model.add_fqn_source(&struct_def.fqn, source.clone());
    for supertype in registry.supertype_closure(&struct_def.fqn) {
        model.add_fqn_source(&supertype, source.clone());
    }
    Ok(())
}

fn parameter_sources(
    registry: &TypeRegistry,
    params: &[crate::typereg::ParamDef],
    model: &mut DistributionModel,
) -> Result<Vec<ParameterSource>, Failure> {
    params
        .iter()
        .map(|param| {
            let dist = distribution_for(registry, &param.type_ref, param.optional, model)?;
            Ok(ParameterSource {
                name: param.name.clone(),
                dist,
            })
        })
        .collect()
}

/// Build (and record) the value distribution for a parameter or field of
/// the given type. Optional positions lead with the no-value alternative
/// so minimal generation picks absence first.
fn distribution_for(
    registry: &TypeRegistry,
    type_ref: &TypeRef,
    optional: bool,
    model: &mut DistributionModel,
) -> Result<DistRef, Failure> {
    let mut sources = Vec::new();
    if optional {
        sources.push(ValueSource::NoValue);
    }
    push_type_sources(registry, type_ref, &mut sources, model)?;
    model.record_distribution(sources)
}

fn push_type_sources(
    registry: &TypeRegistry,
    type_ref: &TypeRef,
    sources: &mut Vec<ValueSource>,
    model: &mut DistributionModel,
) -> Result<(), Failure> {
    match type_ref {
        TypeRef::Primitive { name } => sources.push(ValueSource::Primitive { name: name.clone() }),
        TypeRef::Array { element } => {
            let element = distribution_for(registry, element, false, model)?;
            sources.push(ValueSource::Array { element });
        }
        TypeRef::Map { value } => {
            let value = distribution_for(registry, value, false, model)?;
            sources.push(ValueSource::Map { value });
        }
        TypeRef::Union { alternatives } => {
            for alternative in alternatives {
                push_type_sources(registry, alternative, sources, model)?;
            }
        }
        TypeRef::Named { fqn } => {
            if !registry.declares(fqn) {
                warn!(fqn = fqn.as_str(), "type reference to undeclared fqn");
            }
            sources.push(ValueSource::FqnRef { fqn: fqn.clone() });
        }
    }
    Ok(())
}

/// Whether the extractor can express the type at all. Used only for the
/// struct-field culling rule; constructor parameters keep their refs and
/// fail at generation time instead.
fn representable(registry: &TypeRegistry, type_ref: &TypeRef) -> bool {
    match type_ref {
        TypeRef::Primitive { .. } => true,
        TypeRef::Array { element } => representable(registry, element),
        TypeRef::Map { value } => representable(registry, value),
        TypeRef::Union { alternatives } => {
            alternatives.iter().any(|a| representable(registry, a))
        }
        TypeRef::Named { fqn } => registry.declares(fqn),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typereg::{
        ConstructorDef, EnumDef, FieldDef, InterfaceDef, ParamDef, StaticMethodDef,
        StaticPropertyDef, StructDef,
    };

    fn registry_with_stack() -> TypeRegistry {
        TypeRegistry {
            classes: vec![
                ClassDef {
                    fqn: "m.App".to_string(),
                    is_abstract: false,
                    bases: vec![],
                    interfaces: vec!["m.IConstruct".to_string()],
                    constructor: Some(ConstructorDef {
                        protected: false,
                        parameters: vec![],
                    }),
                    static_methods: vec![],
                    static_properties: vec![],
                },
                ClassDef {
                    fqn: "m.Stack".to_string(),
                    is_abstract: false,
                    bases: vec![],
                    interfaces: vec!["m.IConstruct".to_string()],
                    constructor: Some(ConstructorDef {
                        protected: false,
                        parameters: vec![
                            ParamDef {
                                name: "scope".to_string(),
                                type_ref: TypeRef::named("m.IConstruct"),
                                optional: false,
                            },
                            ParamDef {
                                name: "id".to_string(),
                                type_ref: TypeRef::primitive("string"),
                                optional: false,
                            },
                        ],
                    }),
                    static_methods: vec![],
                    static_properties: vec![],
                },
            ],
            structs: vec![],
            enums: vec![],
            interfaces: vec![InterfaceDef {
                fqn: "m.IConstruct".to_string(),
                bases: vec![],
            }],
        }
    }

    #[test]
    fn test_class_contributes_to_self_and_supertypes() {
        let registry = registry_with_stack();
        let model = extract_distributions(&registry, &BiaserSet::empty()).unwrap();
        assert!(model.lookup_fqn("m.Stack").is_some());
        let iface_sources = model.lookup_fqn("m.IConstruct").unwrap();
        // Both m.App and m.Stack implement the interface.
        assert_eq!(iface_sources.len(), 2);
    }

    #[test]
    fn test_protected_and_abstract_contribute_nothing() {
        let registry = TypeRegistry {
            classes: vec![
                ClassDef {
                    fqn: "m.Abstract".to_string(),
                    is_abstract: true,
                    bases: vec![],
                    interfaces: vec![],
                    constructor: Some(ConstructorDef {
                        protected: false,
                        parameters: vec![],
                    }),
                    static_methods: vec![],
                    static_properties: vec![],
                },
                ClassDef {
                    fqn: "m.Protected".to_string(),
                    is_abstract: false,
                    bases: vec![],
                    interfaces: vec![],
                    constructor: Some(ConstructorDef {
                        protected: true,
                        parameters: vec![],
                    }),
                    static_methods: vec![],
                    static_properties: vec![],
                },
            ],
            ..Default::default()
        };
        let model = extract_distributions(&registry, &BiaserSet::empty()).unwrap();
        assert!(model.lookup_fqn("m.Abstract").is_none());
        assert!(model.lookup_fqn("m.Protected").is_none());
    }

    #[test]
    fn test_static_method_indexed_under_return_type_and_ancestors() {
        let registry = TypeRegistry {
            classes: vec![
                ClassDef {
                    fqn: "m.Base".to_string(),
                    is_abstract: true,
                    bases: vec![],
                    interfaces: vec!["m.IBase".to_string()],
                    constructor: None,
                    static_methods: vec![],
                    static_properties: vec![],
                },
                ClassDef {
                    fqn: "m.Derived".to_string(),
                    is_abstract: true,
                    bases: vec!["m.Base".to_string()],
                    interfaces: vec![],
                    constructor: None,
                    static_methods: vec![StaticMethodDef {
                        name: "of".to_string(),
                        parameters: vec![ParamDef {
                            name: "value".to_string(),
                            type_ref: TypeRef::primitive("number"),
                            optional: false,
                        }],
                        returns: TypeRef::named("m.Derived"),
                    }],
                    static_properties: vec![],
                },
            ],
            interfaces: vec![InterfaceDef {
                fqn: "m.IBase".to_string(),
                bases: vec![],
            }],
            ..Default::default()
        };
        let model = extract_distributions(&registry, &BiaserSet::empty()).unwrap();
        assert!(matches!(
            model.lookup_fqn("m.Derived").unwrap()[0],
            FqnSource::StaticMethodCall { .. }
        ));
        // Propagates to the ancestor class...
        assert!(model.lookup_fqn("m.Base").is_some());
        // ...but not to the ancestor's interfaces.
        assert!(model.lookup_fqn("m.IBase").is_none());
    }

    #[test]
    fn test_static_property_indexed_under_declared_type() {
        let registry = TypeRegistry {
            classes: vec![ClassDef {
                fqn: "m.Token".to_string(),
                is_abstract: true,
                bases: vec![],
                interfaces: vec![],
                constructor: None,
                static_methods: vec![],
                static_properties: vec![StaticPropertyDef {
                    name: "DEFAULT".to_string(),
                    type_ref: TypeRef::named("m.Token"),
                }],
            }],
            ..Default::default()
        };
        let model = extract_distributions(&registry, &BiaserSet::empty()).unwrap();
        match &model.lookup_fqn("m.Token").unwrap()[0] {
            FqnSource::StaticPropertyAccess {
                fqn,
                static_property,
                target_fqn,
            } => {
                assert_eq!(fqn, "m.Token");
                assert_eq!(static_property, "DEFAULT");
                assert_eq!(target_fqn, "m.Token");
            }
            other => panic!("expected static property source, got {:?}", other),
        }
    }

    #[test]
    fn test_enum_members_become_property_accesses() {
        let registry = TypeRegistry {
            enums: vec![EnumDef {
                fqn: "m.E".to_string(),
                members: vec!["A".to_string(), "B".to_string()],
            }],
            ..Default::default()
        };
        let model = extract_distributions(&registry, &BiaserSet::empty()).unwrap();
        let sources = model.lookup_fqn("m.E").unwrap();
        assert_eq!(sources.len(), 2);
        match &sources[0] {
            FqnSource::StaticPropertyAccess {
                static_property, ..
            } => assert_eq!(static_property, "A"),
            other => panic!("expected property source, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_field_leads_with_no_value() {
        let registry = TypeRegistry {
            structs: vec![StructDef {
                fqn: "m.Props".to_string(),
                interfaces: vec![],
                fields: vec![
                    FieldDef {
                        name: "name".to_string(),
                        type_ref: TypeRef::primitive("string"),
                        optional: false,
                    },
                    FieldDef {
                        name: "count".to_string(),
                        type_ref: TypeRef::primitive("number"),
                        optional: true,
                    },
                ],
            }],
            ..Default::default()
        };
        let model = extract_distributions(&registry, &BiaserSet::empty()).unwrap();
        let FqnSource::ValueObject { fields, .. } = &model.lookup_fqn("m.Props").unwrap()[0]
        else {
            panic!("expected value object");
        };
        let count_sources = model.lookup_dist(&fields[1].dist).unwrap();
        assert_eq!(count_sources[0], ValueSource::NoValue);
        assert_eq!(
            count_sources[1],
            ValueSource::Primitive {
                name: "number".to_string()
            }
        );
    }

    #[test]
    fn test_required_unrepresentable_field_drops_struct() {
        let registry = TypeRegistry {
            structs: vec![StructDef {
                fqn: "m.Broken".to_string(),
                interfaces: vec![],
                fields: vec![FieldDef {
                    name: "payload".to_string(),
                    type_ref: TypeRef::named("external.Unknown"),
                    optional: false,
                }],
            }],
            ..Default::default()
        };
        let model = extract_distributions(&registry, &BiaserSet::empty()).unwrap();
        assert!(model.lookup_fqn("m.Broken").is_none());
    }

    #[test]
    fn test_optional_unrepresentable_field_dropped_individually() {
        let registry = TypeRegistry {
            structs: vec![StructDef {
                fqn: "m.Partial".to_string(),
                interfaces: vec![],
                fields: vec![
                    FieldDef {
                        name: "name".to_string(),
                        type_ref: TypeRef::primitive("string"),
                        optional: false,
                    },
                    FieldDef {
                        name: "extra".to_string(),
                        type_ref: TypeRef::named("external.Unknown"),
                        optional: true,
                    },
                ],
            }],
            ..Default::default()
        };
        let model = extract_distributions(&registry, &BiaserSet::empty()).unwrap();
        let FqnSource::ValueObject { fields, .. } = &model.lookup_fqn("m.Partial").unwrap()[0]
        else {
            panic!("expected value object");
        };
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "name");
    }

    #[test]
    fn test_union_splats_alternatives() {
        let registry = TypeRegistry {
            classes: vec![ClassDef {
                fqn: "m.Widget".to_string(),
                is_abstract: false,
                bases: vec![],
                interfaces: vec![],
                constructor: Some(ConstructorDef {
                    protected: false,
                    parameters: vec![ParamDef {
                        name: "size".to_string(),
                        type_ref: TypeRef::Union {
                            alternatives: vec![
                                TypeRef::primitive("number"),
                                TypeRef::primitive("string"),
                            ],
                        },
                        optional: false,
                    }],
                }),
                static_methods: vec![],
                static_properties: vec![],
            }],
            ..Default::default()
        };
        let model = extract_distributions(&registry, &BiaserSet::empty()).unwrap();
        let FqnSource::ClassInstantiation { parameters, .. } =
            &model.lookup_fqn("m.Widget").unwrap()[0]
        else {
            panic!("expected class instantiation");
        };
        let sources = model.lookup_dist(&parameters[0].dist).unwrap();
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn test_biased_source_shared_across_supertypes() {
        let registry = registry_with_stack();
        let model = extract_distributions(&registry, &BiaserSet::default()).unwrap();
        let stack_source = model
            .lookup_fqn("m.Stack")
            .unwrap()
            .iter()
            .find(|s| s.fqn() == "m.Stack")
            .unwrap();
        let iface_source = model
            .lookup_fqn("m.IConstruct")
            .unwrap()
            .iter()
            .find(|s| s.fqn() == "m.Stack")
            .unwrap();
        assert_eq!(stack_source, iface_source);
        let FqnSource::ClassInstantiation { parameters, .. } = stack_source else {
            panic!("expected class instantiation");
        };
        assert_eq!(
            model.lookup_dist(&parameters[0].dist).unwrap(),
            &[ValueSource::Custom {
                name: "scope".to_string()
            }]
        );
    }
}
