//! Shared synthetic registries for integration tests.

use progspace::typereg::{
    ClassDef, ConstructorDef, EnumDef, FieldDef, InterfaceDef, ParamDef, StructDef, TypeRef,
    TypeRegistry,
};

/// A small composable-resource library: `M.App` and `M.Stack` implement
/// `M.IConstruct`, `M.Stack` takes the classic `(scope, id)` constructor,
/// plus a value-object struct and an enum.
pub fn construct_registry() -> TypeRegistry {
    TypeRegistry {
        classes: vec![
            ClassDef {
                fqn: "M.App".to_string(),
                is_abstract: false,
                bases: vec![],
                interfaces: vec!["M.IConstruct".to_string()],
                constructor: Some(ConstructorDef {
                    protected: false,
                    parameters: vec![],
                }),
                static_methods: vec![],
                static_properties: vec![],
            },
            ClassDef {
                fqn: "M.Stack".to_string(),
                is_abstract: false,
                bases: vec![],
                interfaces: vec!["M.IConstruct".to_string()],
                constructor: Some(ConstructorDef {
                    protected: false,
                    parameters: vec![
                        ParamDef {
                            name: "scope".to_string(),
                            type_ref: TypeRef::named("M.IConstruct"),
                            optional: false,
                        },
                        ParamDef {
                            name: "id".to_string(),
                            type_ref: TypeRef::primitive("string"),
                            optional: false,
                        },
                        ParamDef {
                            name: "props".to_string(),
                            type_ref: TypeRef::named("M.Props"),
                            optional: true,
                        },
                    ],
                }),
                static_methods: vec![],
                static_properties: vec![],
            },
        ],
        structs: vec![StructDef {
            fqn: "M.Props".to_string(),
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
        enums: vec![EnumDef {
            fqn: "M.E".to_string(),
            members: vec!["A".to_string(), "B".to_string()],
        }],
        interfaces: vec![InterfaceDef {
            fqn: "M.IConstruct".to_string(),
            bases: vec![],
        }],
    }
}
