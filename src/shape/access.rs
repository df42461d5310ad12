/*!
 * Shape Accessors
 *
 * Type-erased readers that let a compiled plan reach into a live value
 * without knowing its concrete type. Each accessor downcasts once and
 * projects through plain function pointers, so accessors are `Send + Sync`
 * and live as long as the shape that owns them.
 */

use super::Dynamic;
use crate::core::errors::EncodeResult;
use std::any::{Any, TypeId};
use std::marker::PhantomData;

use crate::core::Sink;

/// Text view of a string-like value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text<'a> {
    /// Guaranteed UTF-8
    Utf8(&'a str),
    /// Arbitrary bytes that are usually, but not necessarily, UTF-8
    Raw(&'a [u8]),
}

impl<'a> Text<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        match *self {
            Text::Utf8(s) => s.as_bytes(),
            Text::Raw(b) => b,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

// ============================================================================
// Accessor Traits
// ============================================================================

/// Reads one field (or the wrapped value of a newtype) out of its parent
pub trait FieldAccess: Send + Sync {
    fn get<'a>(&self, parent: &'a dyn Any) -> Option<&'a dyn Any>;
}

/// Reads string-like values
pub trait StringAccess: Send + Sync {
    fn text<'a>(&self, value: &'a dyn Any) -> Option<Text<'a>>;
}

/// Reads opaque byte buffers
pub trait BytesAccess: Send + Sync {
    fn bytes<'a>(&self, value: &'a dyn Any) -> Option<&'a [u8]>;
}

/// Walks the elements of a sequence
///
/// `visit` returns `None` when the value is not of the expected type and
/// otherwise the first error produced by the callback.
pub trait SequenceAccess: Send + Sync {
    fn len(&self, value: &dyn Any) -> Option<usize>;

    fn visit<'a>(
        &self,
        value: &'a dyn Any,
        f: &mut dyn FnMut(&'a dyn Any) -> EncodeResult<()>,
    ) -> Option<EncodeResult<()>>;
}

/// Walks the entries of a map in the map's own iteration order
pub trait MapAccess: Send + Sync {
    fn len(&self, value: &dyn Any) -> Option<usize>;

    fn visit<'a>(
        &self,
        value: &'a dyn Any,
        f: &mut dyn FnMut(&'a dyn Any, &'a dyn Any) -> EncodeResult<()>,
    ) -> Option<EncodeResult<()>>;
}

/// Follows a nullable indirection
///
/// `Some(None)` is a null pointer, `None` is a type mismatch.
pub trait PointerAccess: Send + Sync {
    fn deref<'a>(&self, value: &'a dyn Any) -> Option<Option<&'a dyn Any>>;
}

/// Unboxes a dynamically typed value
pub trait InterfaceAccess: Send + Sync {
    fn resolve<'a>(&self, value: &'a dyn Any) -> Option<Option<&'a dyn Dynamic>>;
}

/// Value-specific encoder that writes its own JSON
pub trait CustomEncode: Send + Sync {
    /// The exact type this hook accepts
    fn target(&self) -> TypeId;

    fn encode(&self, value: &dyn Any, sink: &mut dyn Sink) -> EncodeResult<()>;
}

// ============================================================================
// Generic Implementations
// ============================================================================

/// Field projection `&S -> &F`
pub struct Projection<S, F> {
    project: fn(&S) -> &F,
}

impl<S, F> Projection<S, F> {
    pub const fn new(project: fn(&S) -> &F) -> Self {
        Self { project }
    }
}

impl<S: Any, F: Any> FieldAccess for Projection<S, F> {
    #[inline]
    fn get<'a>(&self, parent: &'a dyn Any) -> Option<&'a dyn Any> {
        parent
            .downcast_ref::<S>()
            .map(|s| (self.project)(s) as &dyn Any)
    }
}

/// UTF-8 string view
pub struct StrView<T> {
    view: fn(&T) -> &str,
}

impl<T> StrView<T> {
    pub const fn new(view: fn(&T) -> &str) -> Self {
        Self { view }
    }
}

impl<T: Any> StringAccess for StrView<T> {
    #[inline]
    fn text<'a>(&self, value: &'a dyn Any) -> Option<Text<'a>> {
        value.downcast_ref::<T>().map(|v| Text::Utf8((self.view)(v)))
    }
}

/// Byte-string view (may hold invalid UTF-8)
pub struct RawView<T> {
    view: fn(&T) -> &[u8],
}

impl<T> RawView<T> {
    pub const fn new(view: fn(&T) -> &[u8]) -> Self {
        Self { view }
    }
}

impl<T: Any> StringAccess for RawView<T> {
    #[inline]
    fn text<'a>(&self, value: &'a dyn Any) -> Option<Text<'a>> {
        value.downcast_ref::<T>().map(|v| Text::Raw((self.view)(v)))
    }
}

impl<T: Any> BytesAccess for RawView<T> {
    #[inline]
    fn bytes<'a>(&self, value: &'a dyn Any) -> Option<&'a [u8]> {
        value.downcast_ref::<T>().map(|v| (self.view)(v))
    }
}

/// Contiguous sequence viewed as a slice
pub struct SliceSequence<C, E> {
    view: fn(&C) -> &[E],
}

impl<C, E> SliceSequence<C, E> {
    pub const fn new(view: fn(&C) -> &[E]) -> Self {
        Self { view }
    }
}

impl<C: Any, E: Any> SequenceAccess for SliceSequence<C, E> {
    #[inline]
    fn len(&self, value: &dyn Any) -> Option<usize> {
        value.downcast_ref::<C>().map(|c| (self.view)(c).len())
    }

    fn visit<'a>(
        &self,
        value: &'a dyn Any,
        f: &mut dyn FnMut(&'a dyn Any) -> EncodeResult<()>,
    ) -> Option<EncodeResult<()>> {
        let items = (self.view)(value.downcast_ref::<C>()?);
        for item in items {
            if let Err(err) = f(item) {
                return Some(Err(err));
            }
        }
        Some(Ok(()))
    }
}

/// Any sequence that iterates by reference
pub struct IterSequence<C, E> {
    len: fn(&C) -> usize,
    _element: PhantomData<fn() -> E>,
}

impl<C, E> IterSequence<C, E> {
    pub const fn new(len: fn(&C) -> usize) -> Self {
        Self {
            len,
            _element: PhantomData,
        }
    }
}

impl<C, E> SequenceAccess for IterSequence<C, E>
where
    C: Any,
    E: Any,
    for<'a> &'a C: IntoIterator<Item = &'a E>,
{
    #[inline]
    fn len(&self, value: &dyn Any) -> Option<usize> {
        value.downcast_ref::<C>().map(|c| (self.len)(c))
    }

    fn visit<'a>(
        &self,
        value: &'a dyn Any,
        f: &mut dyn FnMut(&'a dyn Any) -> EncodeResult<()>,
    ) -> Option<EncodeResult<()>> {
        let items = value.downcast_ref::<C>()?;
        for item in items {
            if let Err(err) = f(item) {
                return Some(Err(err));
            }
        }
        Some(Ok(()))
    }
}

/// Any map that iterates `(&K, &V)` by reference
pub struct IterMap<M, K, V> {
    len: fn(&M) -> usize,
    _entry: PhantomData<fn() -> (K, V)>,
}

impl<M, K, V> IterMap<M, K, V> {
    pub const fn new(len: fn(&M) -> usize) -> Self {
        Self {
            len,
            _entry: PhantomData,
        }
    }
}

impl<M, K, V> MapAccess for IterMap<M, K, V>
where
    M: Any,
    K: Any,
    V: Any,
    for<'a> &'a M: IntoIterator<Item = (&'a K, &'a V)>,
{
    #[inline]
    fn len(&self, value: &dyn Any) -> Option<usize> {
        value.downcast_ref::<M>().map(|m| (self.len)(m))
    }

    fn visit<'a>(
        &self,
        value: &'a dyn Any,
        f: &mut dyn FnMut(&'a dyn Any, &'a dyn Any) -> EncodeResult<()>,
    ) -> Option<EncodeResult<()>> {
        let entries = value.downcast_ref::<M>()?;
        for (key, item) in entries {
            if let Err(err) = f(key, item) {
                return Some(Err(err));
            }
        }
        Some(Ok(()))
    }
}

/// Nullable indirection `&P -> Option<&T>`
pub struct PointerView<P, T> {
    view: fn(&P) -> Option<&T>,
}

impl<P, T> PointerView<P, T> {
    pub const fn new(view: fn(&P) -> Option<&T>) -> Self {
        Self { view }
    }
}

impl<P: Any, T: Any> PointerAccess for PointerView<P, T> {
    #[inline]
    fn deref<'a>(&self, value: &'a dyn Any) -> Option<Option<&'a dyn Any>> {
        value
            .downcast_ref::<P>()
            .map(|p| (self.view)(p).map(|t| t as &dyn Any))
    }
}

/// Dynamic value holder `&T -> Option<&dyn Dynamic>`
pub struct InterfaceView<T> {
    view: fn(&T) -> Option<&dyn Dynamic>,
}

impl<T> InterfaceView<T> {
    pub const fn new(view: fn(&T) -> Option<&dyn Dynamic>) -> Self {
        Self { view }
    }
}

impl<T: Any> InterfaceAccess for InterfaceView<T> {
    #[inline]
    fn resolve<'a>(&self, value: &'a dyn Any) -> Option<Option<&'a dyn Dynamic>> {
        value.downcast_ref::<T>().map(|v| (self.view)(v))
    }
}

/// Custom hook bound to one concrete type
pub struct RawHook<T> {
    write: fn(&T, &mut dyn Sink) -> EncodeResult<()>,
}

impl<T> RawHook<T> {
    pub const fn new(write: fn(&T, &mut dyn Sink) -> EncodeResult<()>) -> Self {
        Self { write }
    }
}

impl<T: Any> CustomEncode for RawHook<T> {
    fn target(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn encode(&self, value: &dyn Any, sink: &mut dyn Sink) -> EncodeResult<()> {
        match value.downcast_ref::<T>() {
            Some(v) => (self.write)(v, sink),
            None => Err(crate::core::ValueError::TypeMismatch {
                expected: std::any::type_name::<T>(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        left: u32,
        right: String,
    }

    #[test]
    fn test_projection_downcasts() {
        let pair = Pair {
            left: 7,
            right: "r".into(),
        };
        let left = Projection::new(|p: &Pair| &p.left);
        let right = Projection::new(|p: &Pair| &p.right);

        let value = left.get(&pair).and_then(|v| v.downcast_ref::<u32>());
        assert_eq!(value, Some(&7));
        let value = right.get(&pair).and_then(|v| v.downcast_ref::<String>());
        assert_eq!(value.map(String::as_str), Some("r"));

        // wrong parent type
        assert!(left.get(&3u8).is_none());
    }

    #[test]
    fn test_slice_sequence_visit_stops_on_error() {
        fn as_slice(v: &Vec<u8>) -> &[u8] {
            v
        }
        let access = SliceSequence::<Vec<u8>, u8>::new(as_slice);
        let items = vec![1u8, 2, 3];
        assert_eq!(access.len(&items), Some(3));

        let mut seen = 0;
        let result = access.visit(&items, &mut |_| {
            seen += 1;
            if seen == 2 {
                Err(crate::core::ValueError::TypeMismatch { expected: "stop" }.into())
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Some(Err(_))));
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_pointer_view_null_and_mismatch() {
        let access = PointerView::<Option<u8>, u8>::new(Option::as_ref);
        assert!(matches!(access.deref(&None::<u8>), Some(None)));
        assert!(matches!(access.deref(&Some(1u8)), Some(Some(_))));
        assert!(access.deref(&1u8).is_none());
    }
}
