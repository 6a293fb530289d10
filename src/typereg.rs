//! Normalized type registry consumed by the distribution extractor.
//!
//! The registry is the language-agnostic description of a class library:
//! classes with constructor signatures and static members, value-object
//! structs, enums, and non-data interfaces. Producing it from a real
//! assembly format is the job of an external loader; the engine only ever
//! sees this normalized form, persisted as JSON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Reference to a type in a parameter, field, or return position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeRef {
    /// One of `string`, `number`, `boolean`, `date`, `json`, `any`.
    Primitive { name: String },
    Array { element: Box<TypeRef> },
    /// String-keyed map with homogeneous values.
    Map { value: Box<TypeRef> },
    Union { alternatives: Vec<TypeRef> },
    /// A class, struct, enum, or interface by FQN.
    Named { fqn: String },
}

impl TypeRef {
    pub fn primitive(name: &str) -> Self {
        TypeRef::Primitive {
            name: name.to_string(),
        }
    }

    pub fn named(fqn: &str) -> Self {
        TypeRef::Named {
            fqn: fqn.to_string(),
        }
    }

    pub fn array_of(element: TypeRef) -> Self {
        TypeRef::Array {
            element: Box::new(element),
        }
    }

    pub fn map_of(value: TypeRef) -> Self {
        TypeRef::Map {
            value: Box::new(value),
        }
    }
}

/// A constructor or method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default)]
    pub optional: bool,
}

/// A class constructor signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDef {
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub parameters: Vec<ParamDef>,
}

/// A static factory method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMethodDef {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParamDef>,
    pub returns: TypeRef,
}

/// A static readonly property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticPropertyDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
}

/// A class: optionally abstract, with bases, implemented interfaces,
/// a constructor, and static members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub fqn: String,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Ancestor class FQNs, nearest first.
    #[serde(default)]
    pub bases: Vec<String>,
    /// Implemented interface FQNs.
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor: Option<ConstructorDef>,
    #[serde(default)]
    pub static_methods: Vec<StaticMethodDef>,
    #[serde(default)]
    pub static_properties: Vec<StaticPropertyDef>,
}

impl ClassDef {
    /// Whether `new` is callable on this class from outside.
    pub fn is_instantiable(&self) -> bool {
        !self.is_abstract
            && self
                .constructor
                .as_ref()
                .map(|c| !c.protected)
                .unwrap_or(false)
    }
}

/// A field of a value-object struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default)]
    pub optional: bool,
}

/// A value-object struct (data interface): bag of named fields in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    pub fqn: String,
    /// Interface FQNs this struct satisfies.
    #[serde(default)]
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDef>,
}

/// An enum with named members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    pub fqn: String,
    pub members: Vec<String>,
}

/// A non-data (behavioral) interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDef {
    pub fqn: String,
    #[serde(default)]
    pub bases: Vec<String>,
}

/// The normalized registry: everything the extractor needs to know about
/// a class library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRegistry {
    #[serde(default)]
    pub classes: Vec<ClassDef>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub enums: Vec<EnumDef>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceDef>,
}

impl TypeRegistry {
    pub fn class(&self, fqn: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.fqn == fqn)
    }

    pub fn struct_def(&self, fqn: &str) -> Option<&StructDef> {
        self.structs.iter().find(|s| s.fqn == fqn)
    }

    pub fn enum_def(&self, fqn: &str) -> Option<&EnumDef> {
        self.enums.iter().find(|e| e.fqn == fqn)
    }

    pub fn interface(&self, fqn: &str) -> Option<&InterfaceDef> {
        self.interfaces.iter().find(|i| i.fqn == fqn)
    }

    /// Whether any declaration carries this FQN.
    pub fn declares(&self, fqn: &str) -> bool {
        self.class(fqn).is_some()
            || self.struct_def(fqn).is_some()
            || self.enum_def(fqn).is_some()
            || self.interface(fqn).is_some()
    }

    /// Transitive supertypes of an FQN: base classes, implemented
    /// interfaces, and interface bases, nearest first, deduplicated.
    pub fn supertype_closure(&self, fqn: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: Vec<String> = self.direct_supertypes(fqn);
        while let Some(next) = queue.first().cloned() {
            queue.remove(0);
            if !seen.insert(next.clone()) {
                continue;
            }
            queue.extend(self.direct_supertypes(&next));
            out.push(next);
        }
        out
    }

    /// Ancestor *classes* of a class FQN (no interfaces), nearest first.
    pub fn class_ancestors(&self, fqn: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = fqn.to_string();
        while let Some(class) = self.class(&current) {
            match class.bases.first() {
                Some(base) if !out.contains(base) => {
                    out.push(base.clone());
                    current = base.clone();
                }
                _ => break,
            }
        }
        out
    }

    fn direct_supertypes(&self, fqn: &str) -> Vec<String> {
        if let Some(class) = self.class(fqn) {
            let mut supers = class.bases.clone();
            supers.extend(class.interfaces.iter().cloned());
            return supers;
        }
        if let Some(struct_def) = self.struct_def(fqn) {
            return struct_def.interfaces.clone();
        }
        if let Some(interface) = self.interface(fqn) {
            return interface.bases.clone();
        }
        Vec::new()
    }

    /// Merge another registry into this one (multi-file extraction).
    /// Later declarations win on FQN clashes.
    pub fn merge(&mut self, other: TypeRegistry) {
        for class in other.classes {
            self.classes.retain(|c| c.fqn != class.fqn);
            self.classes.push(class);
        }
        for struct_def in other.structs {
            self.structs.retain(|s| s.fqn != struct_def.fqn);
            self.structs.push(struct_def);
        }
        for enum_def in other.enums {
            self.enums.retain(|e| e.fqn != enum_def.fqn);
            self.enums.push(enum_def);
        }
        for interface in other.interfaces {
            self.interfaces.retain(|i| i.fqn != interface.fqn);
            self.interfaces.push(interface);
        }
    }

    /// Read a registry from a normalized-registry JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading type registry {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing type registry {}", path.display()))
    }
}
