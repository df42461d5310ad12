/*!
 * Encode Context
 *
 * Per-call state for executing a plan: the sink, the options, the cache used
 * to resolve dynamic values, the nesting depth and the stack of pointer
 * targets currently being encoded.
 */

use super::{base64, escape, number};
use crate::core::{EncodeError, EncodeOptions, EncodeResult, Sink, ValueError};
use crate::plan::{
    DerefOp, FieldOp, Instruction, MapKey, MapOp, PathStep, Plan, PlanCache, SequenceOp,
};
use crate::shape::{InterfaceAccess, ScalarKind, Text};
use std::any::{Any, TypeId};
use std::ops::Range;

/// Heap identity of a pointer target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Identity {
    address: usize,
    type_id: TypeId,
}

pub(crate) struct EncodeContext<'e, S: Sink + ?Sized> {
    sink: &'e mut S,
    options: &'e EncodeOptions,
    cache: &'e PlanCache,
    depth: usize,
    active: Vec<Identity>,
}

#[inline]
fn mismatch(plan: &Plan) -> EncodeError {
    ValueError::TypeMismatch {
        expected: plan.shape().type_name(),
    }
    .into()
}

impl<'e, S: Sink + ?Sized> EncodeContext<'e, S> {
    pub(crate) fn new(sink: &'e mut S, options: &'e EncodeOptions, cache: &'e PlanCache) -> Self {
        Self {
            sink,
            options,
            cache,
            depth: 0,
            active: Vec::new(),
        }
    }

    pub(crate) fn run(&mut self, plan: &Plan, value: &dyn Any) -> EncodeResult<()> {
        if !plan.nests() {
            return self.execute(plan, value);
        }
        self.descend()?;
        let result = self.execute(plan, value);
        self.depth -= 1;
        result
    }

    fn descend(&mut self) -> EncodeResult<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(EncodeError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        Ok(())
    }

    /// Run `plan` on a pointee while its identity sits on the active stack
    fn tracked(&mut self, plan: &Plan, target: &dyn Any) -> EncodeResult<()> {
        // Zero-sized values share addresses, so they carry no identity
        if std::mem::size_of_val(target) == 0 {
            return self.run(plan, target);
        }

        let identity = Identity {
            address: target as *const dyn Any as *const () as usize,
            type_id: target.type_id(),
        };
        if self.active.contains(&identity) {
            return Err(EncodeError::Cycle {
                type_name: plan.shape().type_name(),
            });
        }
        self.active.push(identity);
        let result = self.run(plan, target);
        self.active.pop();
        result
    }

    fn execute(&mut self, plan: &Plan, value: &dyn Any) -> EncodeResult<()> {
        let mut first = true;
        for instruction in plan.instructions() {
            match instruction {
                Instruction::Literal(bytes) => self.sink.write_bytes(bytes)?,
                Instruction::Field(op) => self.field(op, value, &mut first)?,
                Instruction::Scalar(kind) => self.scalar(*kind, value, plan)?,
                Instruction::String(access) => {
                    let text = access.text(value).ok_or_else(|| mismatch(plan))?;
                    escape::write_text(
                        &mut *self.sink,
                        text,
                        self.options.html_escaping,
                        self.options.utf8_coercion,
                    )?;
                }
                Instruction::Bytes(access) => {
                    let bytes = access.bytes(value).ok_or_else(|| mismatch(plan))?;
                    base64::write_base64(&mut *self.sink, bytes)?;
                }
                Instruction::Recurse(op) => {
                    let inner = op.access.get(value).ok_or_else(|| mismatch(plan))?;
                    self.run(op.plan.resolve()?, inner)?;
                }
                Instruction::Sequence(op) => self.sequence(op, value, plan)?,
                Instruction::Map(op) => self.map(op, value, plan)?,
                Instruction::Deref(op) => self.deref(op, value, plan)?,
                Instruction::Interface(access) => self.interface(*access, value, plan)?,
                Instruction::Custom(hook) => hook.encode(value, &mut self.sink)?,
            }
        }
        Ok(())
    }

    fn field(&mut self, op: &FieldOp, parent: &dyn Any, first: &mut bool) -> EncodeResult<()> {
        let mut current = parent;
        for step in op.path.iter() {
            current = match step {
                PathStep::Field(access) => access.get(current),
                PathStep::Deref(access) => match access.deref(current) {
                    // null embedded pointer: its fields are absent
                    Some(None) => return Ok(()),
                    Some(Some(target)) => Some(target),
                    None => None,
                },
            }
            .ok_or(ValueError::TypeMismatch {
                expected: op.plan.shape().type_name(),
            })?;
        }

        let plan = op.plan.resolve()?;
        if (op.omit_empty || self.options.omit_empty_default)
            && plan.shape().is_empty_value(current)
        {
            return Ok(());
        }

        if !*first {
            self.sink.write_byte(b',')?;
        }
        *first = false;
        let key = if self.options.html_escaping {
            &op.key_html
        } else {
            &op.key_plain
        };
        self.sink.write_bytes(key)?;
        self.run(plan, current)
    }

    fn scalar(&mut self, kind: ScalarKind, value: &dyn Any, plan: &Plan) -> EncodeResult<()> {
        match kind {
            ScalarKind::Unit => self.sink.write_bytes(b"null")?,
            ScalarKind::Bool => {
                let b = value.downcast_ref::<bool>().ok_or_else(|| mismatch(plan))?;
                let literal: &[u8] = if *b { b"true" } else { b"false" };
                self.sink.write_bytes(literal)?;
            }
            ScalarKind::F32 => {
                let v = value.downcast_ref::<f32>().ok_or_else(|| mismatch(plan))?;
                number::write_f32(&mut *self.sink, *v)?;
            }
            ScalarKind::F64 => {
                let v = value.downcast_ref::<f64>().ok_or_else(|| mismatch(plan))?;
                number::write_f64(&mut *self.sink, *v)?;
            }
            ScalarKind::Char => {
                let c = value.downcast_ref::<char>().ok_or_else(|| mismatch(plan))?;
                let mut buf = [0u8; 4];
                escape::write_text(
                    &mut *self.sink,
                    Text::Utf8(c.encode_utf8(&mut buf)),
                    self.options.html_escaping,
                    false,
                )?;
            }
            integer => {
                write_integer_kind(&mut *self.sink, integer, value).ok_or_else(|| mismatch(plan))??
            }
        }
        Ok(())
    }

    fn sequence(&mut self, op: &SequenceOp, value: &dyn Any, plan: &Plan) -> EncodeResult<()> {
        let element = op.element.resolve()?;
        self.sink.write_byte(b'[')?;
        let mut first = true;
        op.access
            .visit(value, &mut |item| {
                if !first {
                    self.sink.write_byte(b',')?;
                }
                first = false;
                self.run(element, item)
            })
            .ok_or_else(|| mismatch(plan))??;
        self.sink.write_byte(b']')?;
        Ok(())
    }

    fn map(&mut self, op: &MapOp, value: &dyn Any, plan: &Plan) -> EncodeResult<()> {
        let value_plan = op.value.resolve()?;
        let html = self.options.html_escaping;
        let coerce = self.options.utf8_coercion;
        self.sink.write_byte(b'{')?;

        if self.options.sort_map_keys {
            // Escaped key bodies share one buffer; entries index into it
            let mut keys: Vec<u8> = Vec::new();
            let mut entries: Vec<(Range<usize>, &dyn Any)> =
                Vec::with_capacity(op.access.len(value).unwrap_or(0));
            op.access
                .visit(value, &mut |key, item| {
                    let start = keys.len();
                    write_map_key(&mut keys, op.key, key, html, coerce, plan)?;
                    entries.push((start..keys.len(), item));
                    Ok(())
                })
                .ok_or_else(|| mismatch(plan))??;

            entries.sort_by(|a, b| keys[a.0.clone()].cmp(&keys[b.0.clone()]));
            for (i, (range, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    self.sink.write_byte(b',')?;
                }
                self.sink.write_byte(b'"')?;
                self.sink.write_bytes(&keys[range])?;
                self.sink.write_bytes(b"\":")?;
                self.run(value_plan, item)?;
            }
        } else {
            let mut first = true;
            op.access
                .visit(value, &mut |key, item| {
                    if !first {
                        self.sink.write_byte(b',')?;
                    }
                    first = false;
                    self.sink.write_byte(b'"')?;
                    write_map_key(&mut *self.sink, op.key, key, html, coerce, plan)?;
                    self.sink.write_bytes(b"\":")?;
                    self.run(value_plan, item)
                })
                .ok_or_else(|| mismatch(plan))??;
        }

        self.sink.write_byte(b'}')?;
        Ok(())
    }

    fn deref(&mut self, op: &DerefOp, value: &dyn Any, plan: &Plan) -> EncodeResult<()> {
        let target = match op.access.deref(value) {
            Some(Some(target)) => target,
            Some(None) => {
                self.sink.write_bytes(b"null")?;
                return Ok(());
            }
            None => return Err(mismatch(plan)),
        };
        let target_plan = op.target.resolve()?;
        if op.identity {
            self.tracked(target_plan, target)
        } else {
            self.run(target_plan, target)
        }
    }

    fn interface(
        &mut self,
        access: &dyn InterfaceAccess,
        value: &dyn Any,
        plan: &Plan,
    ) -> EncodeResult<()> {
        match access.resolve(value) {
            Some(Some(dynamic)) => {
                let inner = self.cache.get_or_compile(dynamic.dyn_shape())?;
                if inner.nests() {
                    return self.tracked(&inner, dynamic.as_any());
                }
                // a hop onto a non-nesting target still counts as one level
                self.descend()?;
                let result = self.tracked(&inner, dynamic.as_any());
                self.depth -= 1;
                result
            }
            Some(None) => {
                self.sink.write_bytes(b"null")?;
                Ok(())
            }
            None => Err(mismatch(plan)),
        }
    }
}

/// Integer scalar of any width; `None` when `value` is not of that type
fn write_integer_kind<W: Sink + ?Sized>(
    sink: &mut W,
    kind: ScalarKind,
    value: &dyn Any,
) -> Option<EncodeResult<()>> {
    macro_rules! int {
        ($t:ty) => {
            value
                .downcast_ref::<$t>()
                .map(|v| number::write_integer(sink, *v))
        };
    }

    match kind {
        ScalarKind::I8 => int!(i8),
        ScalarKind::I16 => int!(i16),
        ScalarKind::I32 => int!(i32),
        ScalarKind::I64 => int!(i64),
        ScalarKind::I128 => int!(i128),
        ScalarKind::Isize => int!(isize),
        ScalarKind::U8 => int!(u8),
        ScalarKind::U16 => int!(u16),
        ScalarKind::U32 => int!(u32),
        ScalarKind::U64 => int!(u64),
        ScalarKind::U128 => int!(u128),
        ScalarKind::Usize => int!(usize),
        _ => None,
    }
}

/// Escaped body of a map key, without quotes
fn write_map_key<W: Sink + ?Sized>(
    sink: &mut W,
    kind: MapKey,
    key: &dyn Any,
    html: bool,
    coerce: bool,
    plan: &Plan,
) -> EncodeResult<()> {
    match kind {
        MapKey::Text(access) => {
            let text = access.text(key).ok_or_else(|| mismatch(plan))?;
            escape::escape_text(sink, text, html, coerce)
        }
        MapKey::Integer(int) => {
            write_integer_kind(sink, int, key).ok_or_else(|| mismatch(plan))?
        }
        MapKey::Char => {
            let c = key.downcast_ref::<char>().ok_or_else(|| mismatch(plan))?;
            let mut buf = [0u8; 4];
            escape::escape_body(sink, c.encode_utf8(&mut buf).as_bytes(), html)
        }
    }
}
