/*!
 * Built-in Shapes
 * `Reflect` for primitives, strings, containers and pointers
 */

use super::access::{
    InterfaceView, IterMap, IterSequence, PointerView, RawView, SliceSequence, StrView,
};
use super::{
    Dynamic, InterfaceShape, MapShape, PointerShape, Reflect, ScalarKind, SequenceShape, Shape,
    ShapeKind,
};
use bytes::{Bytes, BytesMut};
use smartstring::{LazyCompact, SmartString};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ffi::OsString;
use std::hash::BuildHasher;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

// ============================================================================
// Scalars
// ============================================================================

macro_rules! reflect_scalar {
    ($($t:ty => $kind:ident),* $(,)?) => {
        $(
            impl Reflect for $t {
                fn shape() -> &'static Shape {
                    Shape::register::<Self>(|| ShapeKind::Scalar(ScalarKind::$kind))
                }
            }
        )*
    };
}

reflect_scalar! {
    () => Unit,
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    char => Char,
}

// ============================================================================
// Strings and Bytes
// ============================================================================

fn as_str<T: AsRef<str>>(value: &T) -> &str {
    value.as_ref()
}

macro_rules! reflect_str {
    ($($t:ty),* $(,)?) => {
        $(
            impl Reflect for $t {
                fn shape() -> &'static Shape {
                    Shape::register::<Self>(|| {
                        ShapeKind::String(Box::new(StrView::<Self>::new(as_str::<Self>)))
                    })
                }
            }
        )*
    };
}

reflect_str!(
    String,
    &'static str,
    Box<str>,
    Arc<str>,
    Cow<'static, str>,
    SmartString<LazyCompact>,
);

// Platform strings may hold bytes that are not UTF-8; the encoder coerces them.
fn path_bytes(path: &PathBuf) -> &[u8] {
    path.as_os_str().as_encoded_bytes()
}

fn os_bytes(value: &OsString) -> &[u8] {
    value.as_encoded_bytes()
}

impl Reflect for PathBuf {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| ShapeKind::String(Box::new(RawView::new(path_bytes))))
    }
}

impl Reflect for OsString {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| ShapeKind::String(Box::new(RawView::new(os_bytes))))
    }
}

fn bytes_view(value: &Bytes) -> &[u8] {
    value
}

fn bytes_mut_view(value: &BytesMut) -> &[u8] {
    value
}

impl Reflect for Bytes {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| ShapeKind::Bytes(Box::new(RawView::new(bytes_view))))
    }
}

impl Reflect for BytesMut {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| ShapeKind::Bytes(Box::new(RawView::new(bytes_mut_view))))
    }
}

// ============================================================================
// Sequences
// ============================================================================

fn sequence<C: Reflect, E: Reflect>(view: fn(&C) -> &[E], fixed_len: Option<usize>) -> ShapeKind {
    ShapeKind::Sequence(SequenceShape {
        element: E::shape,
        fixed_len,
        access: Box::new(SliceSequence::new(view)),
    })
}

fn boxed_slice<T>(value: &Box<[T]>) -> &[T] {
    value
}

fn array_slice<T, const N: usize>(value: &[T; N]) -> &[T] {
    value
}

impl<T: Reflect> Reflect for Vec<T> {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| sequence::<Self, T>(Vec::as_slice, None))
    }
}

impl<T: Reflect> Reflect for Box<[T]> {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| sequence::<Self, T>(boxed_slice, None))
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| sequence::<Self, T>(array_slice::<T, N>, Some(N)))
    }
}

impl<T: Reflect> Reflect for VecDeque<T> {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| {
            ShapeKind::Sequence(SequenceShape {
                element: T::shape,
                fixed_len: None,
                access: Box::new(IterSequence::<Self, T>::new(VecDeque::len)),
            })
        })
    }
}

// ============================================================================
// Maps
// ============================================================================

impl<K, V, S> Reflect for HashMap<K, V, S>
where
    K: Reflect,
    V: Reflect,
    S: BuildHasher + Send + Sync + 'static,
{
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| {
            ShapeKind::Map(MapShape {
                key: K::shape,
                value: V::shape,
                access: Box::new(IterMap::<Self, K, V>::new(HashMap::len)),
            })
        })
    }
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| {
            ShapeKind::Map(MapShape {
                key: K::shape,
                value: V::shape,
                access: Box::new(IterMap::<Self, K, V>::new(BTreeMap::len)),
            })
        })
    }
}

// ============================================================================
// Pointers
// ============================================================================

fn pointer<P: Reflect, T: Reflect>(view: fn(&P) -> Option<&T>, identity: bool) -> ShapeKind {
    ShapeKind::Pointer(PointerShape {
        target: T::shape,
        access: Box::new(PointerView::new(view)),
        identity,
    })
}

#[allow(clippy::borrowed_box)]
fn boxed<T>(value: &Box<T>) -> Option<&T> {
    Some(&**value)
}

fn shared<T>(value: &Arc<T>) -> Option<&T> {
    Some(&**value)
}

fn borrowed<'a, T>(value: &'a &'static T) -> Option<&'a T> {
    Some(*value)
}

impl<T: Reflect> Reflect for Option<T> {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| pointer::<Self, T>(Option::as_ref, false))
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| pointer::<Self, T>(boxed, true))
    }
}

impl<T: Reflect> Reflect for Arc<T> {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| pointer::<Self, T>(shared, true))
    }
}

impl<T: Reflect> Reflect for &'static T {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| pointer::<Self, T>(borrowed, true))
    }
}

impl<T: Reflect> Reflect for OnceLock<T> {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| pointer::<Self, T>(OnceLock::get, false))
    }
}

// ============================================================================
// Interfaces
// ============================================================================

#[allow(clippy::borrowed_box)]
fn boxed_dynamic(value: &Box<dyn Dynamic>) -> Option<&dyn Dynamic> {
    Some(&**value)
}

fn shared_dynamic(value: &Arc<dyn Dynamic>) -> Option<&dyn Dynamic> {
    Some(&**value)
}

impl Reflect for Box<dyn Dynamic> {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| {
            ShapeKind::Interface(InterfaceShape {
                access: Box::new(InterfaceView::new(boxed_dynamic)),
            })
        })
    }
}

impl Reflect for Arc<dyn Dynamic> {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| {
            ShapeKind::Interface(InterfaceShape {
                access: Box::new(InterfaceView::new(shared_dynamic)),
            })
        })
    }
}

/// Nullable interface slot; `None` encodes as `null`
pub type AnyValue = Option<Box<dyn Dynamic>>;
