//! Immutable focus into a [`Value`] tree with functional update.
//!
//! A [`Zipper`] is a stack of location frames (innermost last). Each frame
//! snapshots its parent compound node together with a locator inside it,
//! so [`Zipper::set`] and [`Zipper::delete`] are pure functions of the
//! zipper: they rebuild the path from the focus up to the root, preserving
//! siblings, and never touch the tree they were derived from.

use crate::value::Value;

/// Position of a focus inside its parent node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Argument slot of a class instantiation or static method call.
    Argument(usize),
    /// Named field of a struct literal.
    Field(String),
    /// Keyed entry of a map literal.
    Key(String),
    /// Indexed element of an array.
    Element(usize),
}

/// One frame of the focus path: a parent snapshot plus a locator within it.
#[derive(Debug, Clone)]
pub enum ValueLoc {
    ClassArgument { parent: Value, index: usize },
    StaticArgument { parent: Value, index: usize },
    StructField { parent: Value, field: String },
    MapEntry { parent: Value, key: String },
    ArrayElement { parent: Value, index: usize },
}

impl ValueLoc {
    fn locator(&self) -> Locator {
        match self {
            ValueLoc::ClassArgument { index, .. } | ValueLoc::StaticArgument { index, .. } => {
                Locator::Argument(*index)
            }
            ValueLoc::StructField { field, .. } => Locator::Field(field.clone()),
            ValueLoc::MapEntry { key, .. } => Locator::Key(key.clone()),
            ValueLoc::ArrayElement { index, .. } => Locator::Element(*index),
        }
    }

    /// Parent snapshot with the focused slot replaced by `child`.
    /// An index one past the end appends (used for append proposals).
    fn with_child(&self, child: Value) -> Value {
        match self {
            ValueLoc::ClassArgument { parent, index }
            | ValueLoc::StaticArgument { parent, index } => {
                let mut parent = parent.clone();
                match &mut parent {
                    Value::ClassInstantiation { arguments, .. }
                    | Value::StaticMethodCall { arguments, .. } => {
                        if *index < arguments.len() {
                            arguments[*index] = child;
                        } else {
                            arguments.push(child);
                        }
                    }
                    _ => unreachable!("argument frame on a non-call parent"),
                }
                parent
            }
            ValueLoc::StructField { parent, field } => {
                let mut parent = parent.clone();
                match &mut parent {
                    Value::StructLiteral { entries, .. } => {
                        match entries.iter_mut().find(|(name, _)| name == field) {
                            Some((_, slot)) => *slot = child,
                            None => entries.push((field.clone(), child)),
                        }
                    }
                    _ => unreachable!("field frame on a non-struct parent"),
                }
                parent
            }
            ValueLoc::MapEntry { parent, key } => {
                let mut parent = parent.clone();
                match &mut parent {
                    Value::MapLiteral { entries, .. } => {
                        match entries.iter_mut().find(|(k, _)| k == key) {
                            Some((_, slot)) => *slot = child,
                            None => entries.push((key.clone(), child)),
                        }
                    }
                    _ => unreachable!("key frame on a non-map parent"),
                }
                parent
            }
            ValueLoc::ArrayElement { parent, index } => {
                let mut parent = parent.clone();
                match &mut parent {
                    Value::ArrayValue { elements, .. } => {
                        if *index < elements.len() {
                            elements[*index] = child;
                        } else {
                            elements.push(child);
                        }
                    }
                    _ => unreachable!("element frame on a non-array parent"),
                }
                parent
            }
        }
    }

    /// Parent snapshot with the focused slot removed. Arrays and argument
    /// lists re-index; structs and maps drop the entry.
    fn without_child(&self) -> Value {
        match self {
            ValueLoc::ClassArgument { parent, index }
            | ValueLoc::StaticArgument { parent, index } => {
                let mut parent = parent.clone();
                match &mut parent {
                    Value::ClassInstantiation { arguments, .. }
                    | Value::StaticMethodCall { arguments, .. } => {
                        if *index < arguments.len() {
                            arguments.remove(*index);
                        }
                    }
                    _ => unreachable!("argument frame on a non-call parent"),
                }
                parent
            }
            ValueLoc::StructField { parent, field } => {
                let mut parent = parent.clone();
                match &mut parent {
                    Value::StructLiteral { entries, .. } => {
                        entries.retain(|(name, _)| name != field)
                    }
                    _ => unreachable!("field frame on a non-struct parent"),
                }
                parent
            }
            ValueLoc::MapEntry { parent, key } => {
                let mut parent = parent.clone();
                match &mut parent {
                    Value::MapLiteral { entries, .. } => entries.retain(|(k, _)| k != key),
                    _ => unreachable!("key frame on a non-map parent"),
                }
                parent
            }
            ValueLoc::ArrayElement { parent, index } => {
                let mut parent = parent.clone();
                match &mut parent {
                    Value::ArrayValue { elements, .. } => {
                        if *index < elements.len() {
                            elements.remove(*index);
                        }
                    }
                    _ => unreachable!("element frame on a non-array parent"),
                }
                parent
            }
        }
    }
}

/// Immutable focus path from the root down to one slot.
#[derive(Debug, Clone, Default)]
pub struct Zipper {
    /// Frames from outermost to innermost.
    frames: Vec<ValueLoc>,
}

impl Zipper {
    /// A focus on the root itself.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Push a frame focusing `locator` inside `parent`.
    pub fn descend(&self, parent: &Value, locator: Locator) -> Zipper {
        let frame = match (parent, locator) {
            (Value::ClassInstantiation { .. }, Locator::Argument(index)) => {
                ValueLoc::ClassArgument {
                    parent: parent.clone(),
                    index,
                }
            }
            (Value::StaticMethodCall { .. }, Locator::Argument(index)) => {
                ValueLoc::StaticArgument {
                    parent: parent.clone(),
                    index,
                }
            }
            (Value::StructLiteral { .. }, Locator::Field(field)) => ValueLoc::StructField {
                parent: parent.clone(),
                field,
            },
            (Value::MapLiteral { .. }, Locator::Key(key)) => ValueLoc::MapEntry {
                parent: parent.clone(),
                key,
            },
            (Value::ArrayValue { .. }, Locator::Element(index)) => ValueLoc::ArrayElement {
                parent: parent.clone(),
                index,
            },
            (parent, locator) => {
                unreachable!("locator {:?} does not address into {:?}", locator, parent)
            }
        };
        let mut frames = self.frames.clone();
        frames.push(frame);
        Zipper { frames }
    }

    /// New root with the focused slot replaced by `value`. On the empty
    /// zipper this is `value` itself.
    pub fn set(&self, value: Value) -> Value {
        let mut current = value;
        for frame in self.frames.iter().rev() {
            current = frame.with_child(current);
        }
        current
    }

    /// New root with the focused slot removed.
    pub fn delete(&self) -> Value {
        let innermost = self
            .frames
            .last()
            .expect("cannot delete at the zipper root");
        let mut current = innermost.without_child();
        for frame in self.frames[..self.frames.len() - 1].iter().rev() {
            current = frame.with_child(current);
        }
        current
    }

    /// The locator path from the root to the focus.
    pub fn path(&self) -> Vec<Locator> {
        self.frames.iter().map(|f| f.locator()).collect()
    }
}

/// Navigate `root` along a locator path.
pub fn read_path<'a>(root: &'a Value, path: &[Locator]) -> Option<&'a Value> {
    let mut current = root;
    for locator in path {
        current = match (current, locator) {
            (
                Value::ClassInstantiation { arguments, .. }
                | Value::StaticMethodCall { arguments, .. },
                Locator::Argument(index),
            ) => arguments.get(*index)?,
            (Value::StructLiteral { entries, .. }, Locator::Field(field)) => {
                entries.iter().find(|(name, _)| name == field).map(|(_, v)| v)?
            }
            (Value::MapLiteral { entries, .. }, Locator::Key(key)) => {
                entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)?
            }
            (Value::ArrayValue { elements, .. }, Locator::Element(index)) => {
                elements.get(*index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{DistPtr, DistRef, PrimitiveValue, Value};

    fn ptr(id: &str) -> DistPtr {
        DistPtr::new(DistRef(id.to_string()), 0)
    }

    fn string_value(s: &str) -> Value {
        Value::Primitive {
            value: PrimitiveValue::String(s.to_string()),
            dist_ptr: ptr("p"),
        }
    }

    fn sample_call() -> Value {
        Value::ClassInstantiation {
            fqn: "m.Stack".to_string(),
            parameter_names: vec!["scope".to_string(), "id".to_string()],
            arguments: vec![Value::Scope { dist_ptr: ptr("s") }, string_value("MyStack")],
            dist_ptr: ptr("c"),
        }
    }

    #[test]
    fn test_set_at_root() {
        let z = Zipper::empty();
        let v = string_value("x");
        assert_eq!(z.set(v.clone()), v);
    }

    #[test]
    fn test_set_then_read_at_same_path() {
        let call = sample_call();
        let z = Zipper::empty().descend(&call, Locator::Argument(1));
        let replacement = string_value("Renamed");
        let new_root = z.set(replacement.clone());
        let read = read_path(&new_root, &z.path()).unwrap();
        assert_eq!(read, &replacement);
    }

    #[test]
    fn test_set_does_not_mutate_input_root() {
        let call = sample_call();
        let snapshot = call.clone();
        let z = Zipper::empty().descend(&call, Locator::Argument(0));
        let _ = z.set(string_value("replaced"));
        let _ = z.delete();
        assert_eq!(call, snapshot);
    }

    #[test]
    fn test_set_preserves_siblings() {
        let call = sample_call();
        let z = Zipper::empty().descend(&call, Locator::Argument(1));
        let new_root = z.set(string_value("Renamed"));
        match &new_root {
            Value::ClassInstantiation { arguments, .. } => {
                assert!(matches!(arguments[0], Value::Scope { .. }));
                assert_eq!(arguments[1], string_value("Renamed"));
            }
            _ => panic!("expected class instantiation"),
        }
    }

    #[test]
    fn test_nested_set_rebuilds_path_only() {
        let inner = Value::ArrayValue {
            elements: vec![string_value("a"), string_value("b")],
            dist_ptr: ptr("arr"),
        };
        let outer = Value::StructLiteral {
            fqn: "m.Props".to_string(),
            entries: vec![
                ("names".to_string(), inner.clone()),
                ("other".to_string(), string_value("keep")),
            ],
            dist_ptr: ptr("st"),
        };
        let z = Zipper::empty()
            .descend(&outer, Locator::Field("names".to_string()))
            .descend(&inner, Locator::Element(1));
        let new_root = z.set(string_value("B"));
        let read = read_path(
            &new_root,
            &[Locator::Field("names".to_string()), Locator::Element(1)],
        )
        .unwrap();
        assert_eq!(read, &string_value("B"));
        let untouched = read_path(&new_root, &[Locator::Field("other".to_string())]).unwrap();
        assert_eq!(untouched, &string_value("keep"));
    }

    #[test]
    fn test_array_delete_reindexes() {
        let arr = Value::ArrayValue {
            elements: vec![string_value("a"), string_value("b"), string_value("c")],
            dist_ptr: ptr("arr"),
        };
        let z = Zipper::empty().descend(&arr, Locator::Element(1));
        let new_root = z.delete();
        match &new_root {
            Value::ArrayValue { elements, .. } => {
                assert_eq!(elements.len(), 2);
                assert_eq!(elements[0], string_value("a"));
                assert_eq!(elements[1], string_value("c"));
            }
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn test_argument_delete_reindexes() {
        let call = sample_call();
        let z = Zipper::empty().descend(&call, Locator::Argument(0));
        let new_root = z.delete();
        match &new_root {
            Value::ClassInstantiation { arguments, .. } => {
                assert_eq!(arguments.len(), 1);
                assert_eq!(arguments[0], string_value("MyStack"));
            }
            _ => panic!("expected class instantiation"),
        }
    }

    #[test]
    fn test_struct_delete_removes_entry() {
        let lit = Value::StructLiteral {
            fqn: "m.Props".to_string(),
            entries: vec![
                ("name".to_string(), string_value("a")),
                ("count".to_string(), string_value("b")),
            ],
            dist_ptr: ptr("st"),
        };
        let z = Zipper::empty().descend(&lit, Locator::Field("name".to_string()));
        let new_root = z.delete();
        match &new_root {
            Value::StructLiteral { entries, .. } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].0, "count");
            }
            _ => panic!("expected struct literal"),
        }
    }

    #[test]
    fn test_delete_then_set_equivalent_to_set_alone() {
        // Sequential composition: delete at an address, then descend into
        // the deleted tree at the same address and set. For structs the
        // result matches a bare set on the original.
        let lit = Value::StructLiteral {
            fqn: "m.Props".to_string(),
            entries: vec![
                ("name".to_string(), string_value("a")),
                ("count".to_string(), string_value("b")),
            ],
            dist_ptr: ptr("st"),
        };
        let z = Zipper::empty().descend(&lit, Locator::Field("count".to_string()));
        let deleted = z.delete();
        let restored = Zipper::empty()
            .descend(&deleted, Locator::Field("count".to_string()))
            .set(string_value("B"));
        assert_eq!(restored, z.set(string_value("B")));

        // For arrays, setting at the deleted slot's address re-inserts an
        // element in order, restoring the original length.
        let arr = Value::ArrayValue {
            elements: vec![string_value("a"), string_value("b"), string_value("c")],
            dist_ptr: ptr("arr"),
        };
        let z = Zipper::empty().descend(&arr, Locator::Element(2));
        let deleted = z.delete();
        let restored = Zipper::empty()
            .descend(&deleted, Locator::Element(2))
            .set(string_value("C"));
        assert_eq!(restored, z.set(string_value("C")));
        match &restored {
            Value::ArrayValue { elements, .. } => {
                assert_eq!(elements.len(), 3);
                assert_eq!(elements[2], string_value("C"));
            }
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn test_set_appends_past_end() {
        let arr = Value::ArrayValue {
            elements: vec![string_value("a")],
            dist_ptr: ptr("arr"),
        };
        let z = Zipper::empty().descend(&arr, Locator::Element(1));
        let new_root = z.set(string_value("b"));
        match &new_root {
            Value::ArrayValue { elements, .. } => {
                assert_eq!(elements.len(), 2);
                assert_eq!(elements[1], string_value("b"));
            }
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn test_map_set_new_key_appends() {
        let map = Value::MapLiteral {
            entries: vec![("k1".to_string(), string_value("a"))],
            dist_ptr: ptr("map"),
        };
        let z = Zipper::empty().descend(&map, Locator::Key("k2".to_string()));
        let new_root = z.set(string_value("b"));
        match &new_root {
            Value::MapLiteral { entries, .. } => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[1], ("k2".to_string(), string_value("b")));
            }
            _ => panic!("expected map literal"),
        }
    }
}
