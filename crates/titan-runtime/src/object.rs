//! Runtime values
//!
//! Arrays carry their shape: `items` holds the leaves in row-major order
//! and `segments` records each dimension, so `items.len()` is always the
//! product of `segments`.

use crate::types::{BaseType, Vtd};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Object {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Float(f64),
    String(String),
    Array { segments: Vec<u64>, items: Vec<Object> },
    UserDefined { object_id: u64 },
    /// Boxed slot holding another object
    Var(Box<Object>),
    Nil,
}

impl Object {
    /// Zero value for a declared type
    ///
    /// Arrays are filled with zeroed scalars of the base type.
    pub fn zeroed(vtd: &Vtd) -> Object {
        let scalar = match vtd.base {
            BaseType::Float => Object::Float(0.0),
            BaseType::String => Object::String(String::new()),
            BaseType::UserDefined => Object::UserDefined { object_id: 0 },
            BaseType::Array | BaseType::Undef | BaseType::Nil => Object::Nil,
            int => Object::from_int(int, 0).unwrap_or(Object::Nil),
        };
        if vtd.is_array() {
            Object::Array {
                segments: vtd.segments.clone(),
                items: vec![scalar; vtd.depth as usize],
            }
        } else {
            scalar
        }
    }

    /// Build an integer object of `kind`, wrapping `value` into its range
    pub fn from_int(kind: BaseType, value: i128) -> Option<Object> {
        Some(match kind {
            BaseType::U8 => Object::U8(value as u8),
            BaseType::U16 => Object::U16(value as u16),
            BaseType::U32 => Object::U32(value as u32),
            BaseType::U64 => Object::U64(value as u64),
            BaseType::I8 => Object::I8(value as i8),
            BaseType::I16 => Object::I16(value as i16),
            BaseType::I32 => Object::I32(value as i32),
            BaseType::I64 => Object::I64(value as i64),
            _ => return None,
        })
    }

    /// One-dimensional array of the given elements
    ///
    /// When every element is an array of the same shape the result gains a
    /// dimension; otherwise the leaves are laid out flat.
    pub fn array_from(elements: Vec<Object>) -> Object {
        let count = elements.len() as u64;
        let inner_shape = match elements.first() {
            Some(Object::Array { segments, .. }) => Some(segments.clone()),
            _ => None,
        };

        let mut items = Vec::new();
        let mut uniform = true;
        for element in elements {
            match element.unwrap_var() {
                Object::Array { segments, items: leaves } => {
                    uniform &= inner_shape.as_ref() == Some(&segments);
                    items.extend(leaves);
                }
                other => {
                    uniform &= inner_shape.is_none();
                    items.push(other);
                }
            }
        }

        let segments = match inner_shape {
            Some(inner) if uniform => std::iter::once(count).chain(inner).collect(),
            _ => vec![items.len() as u64],
        };
        Object::Array { segments, items }
    }

    /// Strip any `Var` wrappers
    pub fn unwrap_var(self) -> Object {
        match self {
            Object::Var(inner) => inner.unwrap_var(),
            other => other,
        }
    }

    /// Borrow through any `Var` wrappers
    pub fn inner(&self) -> &Object {
        match self {
            Object::Var(inner) => inner.inner(),
            other => other,
        }
    }

    pub(crate) fn inner_mut(&mut self) -> &mut Object {
        match self {
            Object::Var(inner) => inner.inner_mut(),
            other => other,
        }
    }

    pub fn base_type(&self) -> BaseType {
        match self.inner() {
            Object::U8(_) => BaseType::U8,
            Object::U16(_) => BaseType::U16,
            Object::U32(_) => BaseType::U32,
            Object::U64(_) => BaseType::U64,
            Object::I8(_) => BaseType::I8,
            Object::I16(_) => BaseType::I16,
            Object::I32(_) => BaseType::I32,
            Object::I64(_) => BaseType::I64,
            Object::Float(_) => BaseType::Float,
            Object::String(_) => BaseType::String,
            Object::Array { .. } => BaseType::Array,
            Object::UserDefined { .. } => BaseType::UserDefined,
            Object::Var(_) | Object::Nil => BaseType::Nil,
        }
    }

    /// Integer value, for the integer kinds only
    pub fn as_i128(&self) -> Option<i128> {
        match *self.inner() {
            Object::U8(v) => Some(v as i128),
            Object::U16(v) => Some(v as i128),
            Object::U32(v) => Some(v as i128),
            Object::U64(v) => Some(v as i128),
            Object::I8(v) => Some(v as i128),
            Object::I16(v) => Some(v as i128),
            Object::I32(v) => Some(v as i128),
            Object::I64(v) => Some(v as i128),
            _ => None,
        }
    }

    /// Numeric value, for integers and floats
    pub fn as_f64(&self) -> Option<f64> {
        match self.inner() {
            Object::Float(v) => Some(*v),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    /// Truth value used by conditions
    pub fn is_truthy(&self) -> bool {
        match self.inner() {
            Object::Float(v) => *v != 0.0,
            Object::String(s) => !s.is_empty(),
            Object::Array { items, .. } => !items.is_empty(),
            Object::UserDefined { .. } => true,
            Object::Nil | Object::Var(_) => false,
            int => int.as_i128().is_some_and(|v| v != 0),
        }
    }

    pub fn boolean(value: bool) -> Object {
        Object::U8(value as u8)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.inner(), Object::Nil)
    }

    /// Index into the leading dimension of an array
    ///
    /// A one-dimensional array yields a clone of the element; a deeper one
    /// yields the row as a new array.
    pub fn row(&self, index: usize) -> Option<Object> {
        let Object::Array { segments, items } = self.inner() else {
            return None;
        };
        let (&outer, rest) = segments.split_first()?;
        if index as u64 >= outer {
            return None;
        }
        if rest.is_empty() {
            return items.get(index).cloned();
        }
        let width = rest.iter().product::<u64>() as usize;
        let start = index * width;
        let leaves = items.get(start..start + width)?;
        Some(Object::Array {
            segments: rest.to_vec(),
            items: leaves.to_vec(),
        })
    }

    /// Best-effort coercion of `src` into this object's kind
    ///
    /// Integers convert to each other (wrapping) and to and from floats, any
    /// scalar converts to a string, and arrays copy leaf by leaf. A scalar
    /// copied into an array lands in its first element. Returns false when no
    /// conversion applies; a scalar destination is then left unchanged.
    pub fn copy_to(&mut self, src: &Object) -> bool {
        let src = src.inner();
        let dest = self.inner_mut();
        match dest {
            Object::Nil => src.is_nil(),
            Object::Float(v) => match src.as_f64() {
                Some(f) => {
                    *v = f;
                    true
                }
                None => false,
            },
            Object::String(s) => match src {
                Object::Array { .. } | Object::UserDefined { .. } => false,
                other => {
                    *s = other.to_string();
                    true
                }
            },
            Object::Array { items, .. } => match src {
                Object::Array { items: from, .. } => items
                    .iter_mut()
                    .zip(from)
                    .all(|(to, from)| to.copy_to(from)),
                scalar => items.first_mut().is_some_and(|first| first.copy_to(scalar)),
            },
            Object::UserDefined { object_id } => match src {
                Object::UserDefined { object_id: from } => {
                    *object_id = *from;
                    true
                }
                _ => false,
            },
            Object::Var(_) => false,
            int => {
                let kind = int.base_type();
                let value = match src {
                    Object::Float(f) => Some(*f as i128),
                    other => other.as_i128(),
                };
                match value.and_then(|v| Object::from_int(kind, v)) {
                    Some(converted) => {
                        *int = converted;
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Static type of this value
    pub fn vtd(&self) -> Vtd {
        match self.inner() {
            Object::Array { segments, items } => {
                let base = items.first().map_or(BaseType::Nil, Object::base_type);
                Vtd::array(base, segments.clone())
            }
            other => Vtd::scalar(other.base_type()),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::U8(v) => write!(f, "{}", v),
            Object::U16(v) => write!(f, "{}", v),
            Object::U32(v) => write!(f, "{}", v),
            Object::U64(v) => write!(f, "{}", v),
            Object::I8(v) => write!(f, "{}", v),
            Object::I16(v) => write!(f, "{}", v),
            Object::I32(v) => write!(f, "{}", v),
            Object::I64(v) => write!(f, "{}", v),
            Object::Float(v) => write!(f, "{}", v),
            Object::String(s) => f.write_str(s),
            Object::Array { segments, items } => write_rows(f, segments, items),
            Object::UserDefined { object_id } => write!(f, "<user-defined #{}>", object_id),
            Object::Var(inner) => write!(f, "{}", inner),
            Object::Nil => f.write_str("nil"),
        }
    }
}

/// Render nested brackets following the array shape
fn write_rows(f: &mut fmt::Formatter<'_>, segments: &[u64], items: &[Object]) -> fmt::Result {
    let width = match segments.split_first() {
        Some((_, rest)) if !rest.is_empty() => rest.iter().product::<u64>() as usize,
        _ => 1,
    };
    f.write_str("[")?;
    if width <= 1 || segments.len() < 2 {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", item)?;
        }
    } else {
        for (i, row) in items.chunks(width).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_rows(f, &segments[1..], row)?;
        }
    }
    f.write_str("]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_zeroed_array_is_row_major() {
        let obj = Object::zeroed(&Vtd::array(BaseType::I16, vec![2, 3]));
        let Object::Array { segments, items } = &obj else {
            panic!("expected array");
        };
        assert_eq!(segments, &vec![2, 3]);
        assert_eq!(items.len(), 6);
        assert!(items.iter().all(|i| *i == Object::I16(0)));
    }

    #[test]
    fn test_clone_is_deep() {
        let original = Object::Var(Box::new(Object::array_from(vec![Object::U8(1)])));
        let mut copy = original.clone();
        copy.copy_to(&Object::array_from(vec![Object::U8(9)]));
        assert_eq!(original.to_string(), "[1]");
        assert_eq!(copy.to_string(), "[9]");
    }

    #[rstest]
    #[case(Object::U8(0), Object::I32(300), Object::U8(44))]
    #[case(Object::I8(0), Object::U8(200), Object::I8(-56))]
    #[case(Object::I32(0), Object::Float(2.9), Object::I32(2))]
    #[case(Object::Float(0.0), Object::I16(-3), Object::Float(-3.0))]
    #[case(Object::String(String::new()), Object::U8(7), Object::String("7".into()))]
    fn test_copy_to_coerces(#[case] mut dest: Object, #[case] src: Object, #[case] expected: Object) {
        assert!(dest.copy_to(&src));
        assert_eq!(dest, expected);
    }

    #[test]
    fn test_copy_to_refuses_string_into_int() {
        let mut dest = Object::U8(3);
        assert!(!dest.copy_to(&Object::String("x".into())));
        assert_eq!(dest, Object::U8(3));
    }

    #[test]
    fn test_copy_to_array_elementwise() {
        let mut dest = Object::zeroed(&Vtd::array(BaseType::I64, vec![2, 2]));
        let src = Object::array_from(vec![
            Object::array_from(vec![Object::U8(1), Object::U8(2)]),
            Object::array_from(vec![Object::U8(3), Object::U8(4)]),
        ]);
        assert!(dest.copy_to(&src));
        assert_eq!(dest.to_string(), "[[1, 2], [3, 4]]");
        assert_eq!(dest.row(1).map(|r| r.to_string()), Some("[3, 4]".into()));
    }

    #[test]
    fn test_array_literal_shape() {
        let nested = Object::array_from(vec![
            Object::array_from(vec![Object::U8(1), Object::U8(2), Object::U8(3)]),
            Object::array_from(vec![Object::U8(4), Object::U8(5), Object::U8(6)]),
        ]);
        assert_eq!(nested.vtd(), Vtd::array(BaseType::U8, vec![2, 3]));

        let ragged = Object::array_from(vec![
            Object::array_from(vec![Object::U8(1)]),
            Object::U8(2),
        ]);
        assert_eq!(ragged.vtd().segments, vec![2]);
    }

    #[test]
    fn test_row_bounds() {
        let arr = Object::array_from(vec![Object::U8(1), Object::U8(2)]);
        assert_eq!(arr.row(1), Some(Object::U8(2)));
        assert_eq!(arr.row(2), None);
        assert_eq!(Object::U8(1).row(0), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(Object::I8(-1).is_truthy());
        assert!(!Object::U64(0).is_truthy());
        assert!(!Object::Nil.is_truthy());
        assert!(Object::String("x".into()).is_truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Object::Nil.to_string(), "nil");
        assert_eq!(Object::Float(1.5).to_string(), "1.5");
        assert_eq!(Object::Var(Box::new(Object::I32(5))).to_string(), "5");
    }
}
