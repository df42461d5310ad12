/*!
 * Struct Shape Builder
 * Explicit field registration standing in for runtime struct introspection
 */

use super::access::Projection;
use super::{FieldFlags, FieldShape, Reflect, ShapeKind, StructShape, TransparentShape};
use std::any::Any;
use std::marker::PhantomData;

/// Declares the fields of struct `S` in wire order
///
/// ```ignore
/// impl Reflect for Point {
///     fn shape() -> &'static Shape {
///         Shape::register::<Self>(|| {
///             StructBuilder::<Self>::new()
///                 .field("x", |p| &p.x)
///                 .omit_empty("label", |p| &p.label)
///                 .build()
///         })
///     }
/// }
/// ```
pub struct StructBuilder<S> {
    fields: Vec<FieldShape>,
    _owner: PhantomData<fn() -> S>,
}

impl<S: Any> Default for StructBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Any> StructBuilder<S> {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            _owner: PhantomData,
        }
    }

    /// Plain field
    pub fn field<F: Reflect>(self, key: &'static str, project: fn(&S) -> &F) -> Self {
        self.declare(key, key, project, FieldFlags::NONE)
    }

    /// Field dropped from the output when empty
    pub fn omit_empty<F: Reflect>(self, key: &'static str, project: fn(&S) -> &F) -> Self {
        self.declare(key, key, project, FieldFlags::NONE.omit_empty())
    }

    /// Embedded struct whose fields are promoted into this one
    pub fn inline<F: Reflect>(self, name: &'static str, project: fn(&S) -> &F) -> Self {
        self.declare(name, name, project, FieldFlags::NONE.inline())
    }

    /// Field that is never encoded
    pub fn skip<F: Reflect>(self, name: &'static str, project: fn(&S) -> &F) -> Self {
        self.declare(name, name, project, FieldFlags::NONE.skip())
    }

    /// Field with an explicit Rust name, wire key and flags
    pub fn declare<F: Reflect>(
        mut self,
        name: &'static str,
        key: &'static str,
        project: fn(&S) -> &F,
        flags: FieldFlags,
    ) -> Self {
        self.fields.push(FieldShape {
            name,
            key,
            shape: F::shape,
            access: Box::new(Projection::new(project)),
            flags,
        });
        self
    }

    pub fn build(self) -> ShapeKind {
        ShapeKind::Struct(StructShape {
            fields: self.fields,
        })
    }
}

/// Newtype encoded exactly like the value it wraps
pub fn transparent<S: Any, F: Reflect>(project: fn(&S) -> &F) -> ShapeKind {
    ShapeKind::Transparent(TransparentShape {
        inner: F::shape,
        access: Box::new(Projection::new(project)),
    })
}

#[doc(hidden)]
#[macro_export]
macro_rules! __reflect_key {
    ($field:ident) => {
        stringify!($field)
    };
    ($field:ident, $key:literal) => {
        $key
    };
}

/// Implement `Reflect` for a struct by listing its fields
///
/// Each field may carry a wire key (defaults to the field name) and a
/// bracketed flag list out of `omit_empty`, `inline` and `skip`:
///
/// ```ignore
/// reflect_struct!(Payload {
///     id: "ID",
///     tags [omit_empty],
///     base [inline],
///     secret [skip],
/// });
/// ```
#[macro_export]
macro_rules! reflect_struct {
    ($ty:ty { $($field:ident $(: $key:literal)? $([$($flag:ident),* $(,)?])?),* $(,)? }) => {
        impl $crate::Reflect for $ty {
            fn shape() -> &'static $crate::Shape {
                $crate::Shape::register::<Self>(|| {
                    $crate::StructBuilder::<Self>::new()
                        $(
                            .declare(
                                stringify!($field),
                                $crate::__reflect_key!($field $(, $key)?),
                                |value: &Self| &value.$field,
                                $crate::FieldFlags::NONE $($(.$flag())*)?,
                            )
                        )*
                        .build()
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::shape::{Reflect, Shape, ShapeKind};

    struct Account {
        id: u64,
        email: String,
        notes: Vec<String>,
        token: String,
    }

    crate::reflect_struct!(Account {
        id: "ID",
        email,
        notes [omit_empty],
        token [skip],
    });

    #[test]
    fn test_macro_declares_fields_in_order() {
        let shape = Account::shape();
        let ShapeKind::Struct(st) = shape.kind() else {
            panic!("expected struct shape");
        };
        let keys: Vec<_> = st.fields.iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["ID", "email", "notes", "token"]);
        assert!(st.fields[2].flags.omit_empty);
        assert!(st.fields[3].flags.skip);
        assert_eq!(st.fields[0].name, "id");
        assert!(std::ptr::eq((st.fields[1].shape)(), Shape::of::<String>()));
    }

    #[test]
    fn test_field_access_reads_value() {
        let account = Account {
            id: 9,
            email: "a@b".into(),
            notes: vec![],
            token: "t".into(),
        };
        let ShapeKind::Struct(st) = Account::shape().kind() else {
            panic!("expected struct shape");
        };
        let id = st.fields[0].access.get(&account).and_then(|v| v.downcast_ref::<u64>());
        assert_eq!(id, Some(&9));
        assert_eq!(account.token, "t");
    }
}
