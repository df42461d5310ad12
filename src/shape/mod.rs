/*!
 * Shape Model
 *
 * Ahead-of-time description of a type's structure for encoding. A shape is
 * derived once per type (through `Reflect`), leaked into the process-wide
 * registry and referenced as `&'static Shape` from then on.
 *
 * # Recursion
 * Child shapes are referenced through `fn() -> &'static Shape` rather than
 * direct references, so deriving a self-referential type never recurses.
 */

pub mod access;
mod builder;
mod impls;
mod json;

pub use access::{
    BytesAccess, CustomEncode, FieldAccess, InterfaceAccess, MapAccess, PointerAccess,
    SequenceAccess, StringAccess, Text,
};
pub use builder::{transparent, StructBuilder};
pub use impls::AnyValue;
pub use json::RawJson;

use crate::core::limits::SHAPE_REGISTRY_INITIAL_CAPACITY;
use ahash::RandomState;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::OnceLock;
use tracing::trace;

/// Lazy reference to another shape
pub type ShapeFn = fn() -> &'static Shape;

/// Types that can describe their own shape
///
/// Implement through [`StructBuilder`], the [`reflect_struct!`](crate::reflect_struct)
/// macro, or by registering a [`ShapeKind`] directly with [`Shape::register`].
pub trait Reflect: Any + Send + Sync {
    fn shape() -> &'static Shape;
}

/// Object-safe face of `Reflect`, used for dynamically typed values
pub trait Dynamic: Any + Send + Sync + 'static {
    fn dyn_shape(&self) -> &'static Shape;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Reflect> Dynamic for T {
    #[inline]
    fn dyn_shape(&self) -> &'static Shape {
        T::shape()
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Primitive value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Unit,
    Bool,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    Char,
}

impl ScalarKind {
    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            ScalarKind::Unit | ScalarKind::Bool | ScalarKind::F32 | ScalarKind::F64 | ScalarKind::Char
        )
    }
}

/// Per-field encoding flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldFlags {
    /// Skip the field when its value is empty
    pub omit_empty: bool,
    /// Splice the fields of an embedded struct into the parent
    pub inline: bool,
    /// Never encode the field
    pub skip: bool,
}

impl FieldFlags {
    pub const NONE: FieldFlags = FieldFlags {
        omit_empty: false,
        inline: false,
        skip: false,
    };

    pub const fn omit_empty(mut self) -> Self {
        self.omit_empty = true;
        self
    }

    pub const fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub const fn skip(mut self) -> Self {
        self.skip = true;
        self
    }
}

/// One declared struct field
pub struct FieldShape {
    /// Rust-side name, for diagnostics
    pub name: &'static str,
    /// Wire key
    pub key: &'static str,
    pub shape: ShapeFn,
    pub access: Box<dyn FieldAccess>,
    pub flags: FieldFlags,
}

pub struct StructShape {
    pub fields: Vec<FieldShape>,
}

pub struct TransparentShape {
    pub inner: ShapeFn,
    pub access: Box<dyn FieldAccess>,
}

pub struct SequenceShape {
    pub element: ShapeFn,
    /// Length of fixed-size arrays
    pub fixed_len: Option<usize>,
    pub access: Box<dyn SequenceAccess>,
}

pub struct MapShape {
    pub key: ShapeFn,
    pub value: ShapeFn,
    pub access: Box<dyn MapAccess>,
}

pub struct PointerShape {
    pub target: ShapeFn,
    pub access: Box<dyn PointerAccess>,
    /// Target lives at its own heap address (tracked for cycle detection)
    pub identity: bool,
}

pub struct InterfaceShape {
    pub access: Box<dyn InterfaceAccess>,
}

pub struct CustomShape {
    pub hook: Box<dyn CustomEncode>,
}

/// Structural kind of a shape
pub enum ShapeKind {
    Scalar(ScalarKind),
    String(Box<dyn StringAccess>),
    Bytes(Box<dyn BytesAccess>),
    Struct(StructShape),
    Transparent(TransparentShape),
    Sequence(SequenceShape),
    Map(MapShape),
    Pointer(PointerShape),
    Interface(InterfaceShape),
    Custom(CustomShape),
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Scalar(_) => "scalar",
            ShapeKind::String(_) => "string",
            ShapeKind::Bytes(_) => "bytes",
            ShapeKind::Struct(_) => "struct",
            ShapeKind::Transparent(_) => "transparent",
            ShapeKind::Sequence(_) => "sequence",
            ShapeKind::Map(_) => "map",
            ShapeKind::Pointer(_) => "pointer",
            ShapeKind::Interface(_) => "interface",
            ShapeKind::Custom(_) => "custom",
        }
    }
}

/// Static description of one type
pub struct Shape {
    type_id: TypeId,
    type_name: &'static str,
    kind: ShapeKind,
}

static REGISTRY: OnceLock<DashMap<TypeId, &'static Shape, RandomState>> = OnceLock::new();

fn registry() -> &'static DashMap<TypeId, &'static Shape, RandomState> {
    REGISTRY.get_or_init(|| {
        DashMap::with_capacity_and_hasher(SHAPE_REGISTRY_INITIAL_CAPACITY, RandomState::new())
    })
}

impl Shape {
    /// Build an unregistered shape for `T`
    pub fn new<T: Any>(kind: ShapeKind) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            kind,
        }
    }

    /// Shape of a reflected type
    #[inline]
    pub fn of<T: Reflect>() -> &'static Shape {
        T::shape()
    }

    /// Look up or derive the registered shape for `T`
    ///
    /// `build` runs outside the registry lock; when two threads race, the
    /// first stored shape wins and the other is leaked.
    pub fn register<T: Any>(build: impl FnOnce() -> ShapeKind) -> &'static Shape {
        let id = TypeId::of::<T>();
        let registry = registry();
        if let Some(shape) = registry.get(&id) {
            return *shape;
        }

        let built: &'static Shape = Box::leak(Box::new(Shape::new::<T>(build())));
        trace!(type_name = built.type_name, kind = built.kind.name(), "Derived shape");
        *registry.entry(id).or_insert(built)
    }

    /// Leak a one-off shape without registering it
    ///
    /// Useful for shapes that must not replace a type's registered shape.
    pub fn leak(shape: Shape) -> &'static Shape {
        Box::leak(Box::new(shape))
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Emptiness test used by omit-empty fields
    ///
    /// False, zero numbers, empty strings/bytes/sequences/maps, null pointers
    /// and null interfaces are empty. Structs and custom values never are.
    pub fn is_empty_value(&self, value: &dyn Any) -> bool {
        match &self.kind {
            ShapeKind::Scalar(kind) => scalar_is_zero(*kind, value),
            ShapeKind::String(access) => access.text(value).is_some_and(|t| t.is_empty()),
            ShapeKind::Bytes(access) => access.bytes(value).is_some_and(|b| b.is_empty()),
            ShapeKind::Struct(_) | ShapeKind::Custom(_) => false,
            ShapeKind::Transparent(t) => t
                .access
                .get(value)
                .is_some_and(|inner| (t.inner)().is_empty_value(inner)),
            ShapeKind::Sequence(s) => s.access.len(value) == Some(0),
            ShapeKind::Map(m) => m.access.len(value) == Some(0),
            ShapeKind::Pointer(p) => matches!(p.access.deref(value), Some(None)),
            ShapeKind::Interface(i) => matches!(i.access.resolve(value), Some(None)),
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind.name())
            .finish()
    }
}

fn scalar_is_zero(kind: ScalarKind, value: &dyn Any) -> bool {
    macro_rules! zero {
        ($t:ty, $zero:expr) => {
            value.downcast_ref::<$t>().is_some_and(|v| *v == $zero)
        };
    }

    match kind {
        ScalarKind::Unit => true,
        ScalarKind::Bool => zero!(bool, false),
        ScalarKind::I8 => zero!(i8, 0),
        ScalarKind::I16 => zero!(i16, 0),
        ScalarKind::I32 => zero!(i32, 0),
        ScalarKind::I64 => zero!(i64, 0),
        ScalarKind::I128 => zero!(i128, 0),
        ScalarKind::Isize => zero!(isize, 0),
        ScalarKind::U8 => zero!(u8, 0),
        ScalarKind::U16 => zero!(u16, 0),
        ScalarKind::U32 => zero!(u32, 0),
        ScalarKind::U64 => zero!(u64, 0),
        ScalarKind::U128 => zero!(u128, 0),
        ScalarKind::Usize => zero!(usize, 0),
        ScalarKind::F32 => zero!(f32, 0.0),
        ScalarKind::F64 => zero!(f64, 0.0),
        ScalarKind::Char => zero!(char, '\0'),
    }
}
