/*!
 * Encode Plans
 *
 * A plan is the compiled, immutable form of a shape: a flat list of encode
 * instructions whose children are reached through `PlanRef` slots. Plans are
 * owned by a `PlanCache` and shared across threads.
 *
 * # Recursion
 * A self-referential shape compiles to a plan whose slot points back at the
 * plan itself. Such plans stay alive for the life of the process, as every
 * cached plan does.
 */

pub mod cache;
mod compiler;

pub use cache::{CacheStats, PlanCache};

use crate::core::ShapeError;
use crate::shape::{
    BytesAccess, CustomEncode, FieldAccess, InterfaceAccess, MapAccess, PointerAccess,
    ScalarKind, SequenceAccess, Shape, StringAccess,
};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Compiled encoder for one shape
pub struct Plan {
    shape: &'static Shape,
    instructions: Box<[Instruction]>,
    nests: bool,
}

impl Plan {
    pub(crate) fn new(shape: &'static Shape, instructions: Vec<Instruction>, nests: bool) -> Self {
        Self {
            shape,
            instructions: instructions.into_boxed_slice(),
            nests,
        }
    }

    #[inline]
    pub fn shape(&self) -> &'static Shape {
        self.shape
    }

    #[inline]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Whether running this plan enters an object, array or map
    #[inline]
    pub fn nests(&self) -> bool {
        self.nests
    }

    /// Wire keys of the struct fields this plan emits, in order
    pub fn field_keys(&self) -> Vec<&'static str> {
        self.instructions
            .iter()
            .filter_map(|ins| match ins {
                Instruction::Field(op) => Some(op.key),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("type_name", &self.shape.type_name())
            .field("instructions", &self.instructions)
            .field("nests", &self.nests)
            .finish()
    }
}

/// Slot holding a child plan, possibly filled after it is referenced
#[derive(Clone)]
pub struct PlanRef {
    shape: &'static Shape,
    slot: Arc<OnceLock<Arc<Plan>>>,
}

impl PlanRef {
    pub(crate) fn pending(shape: &'static Shape) -> Self {
        Self {
            shape,
            slot: Arc::new(OnceLock::new()),
        }
    }

    pub(crate) fn ready(plan: Arc<Plan>) -> Self {
        let shape = plan.shape;
        let slot = OnceLock::new();
        let _ = slot.set(plan);
        Self {
            shape,
            slot: Arc::new(slot),
        }
    }

    pub(crate) fn fill(&self, plan: Arc<Plan>) {
        let _ = self.slot.set(plan);
    }

    pub fn shape(&self) -> &'static Shape {
        self.shape
    }

    #[inline]
    pub fn resolve(&self) -> Result<&Plan, ShapeError> {
        self.slot
            .get()
            .map(|plan| &**plan)
            .ok_or(ShapeError::Unresolved {
                type_name: self.shape.type_name(),
            })
    }

    pub(crate) fn arc(&self) -> Result<Arc<Plan>, ShapeError> {
        self.slot.get().cloned().ok_or(ShapeError::Unresolved {
            type_name: self.shape.type_name(),
        })
    }
}

impl fmt::Debug for PlanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlanRef({})", self.shape.type_name())
    }
}

// ============================================================================
// Instruction Set
// ============================================================================

/// One encode step
pub enum Instruction {
    /// Emit fixed bytes
    Literal(&'static [u8]),
    /// Emit a struct field name and its value
    Field(FieldOp),
    Scalar(ScalarKind),
    String(&'static dyn StringAccess),
    /// Base64 string
    Bytes(&'static dyn BytesAccess),
    /// Project a wrapped value and run its plan
    Recurse(RecurseOp),
    Sequence(SequenceOp),
    Map(MapOp),
    /// Follow a pointer or emit `null`
    Deref(DerefOp),
    /// Resolve a dynamic value's plan at run time
    Interface(&'static dyn InterfaceAccess),
    Custom(&'static dyn CustomEncode),
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Literal(_) => "literal",
            Instruction::Field(_) => "field",
            Instruction::Scalar(_) => "scalar",
            Instruction::String(_) => "string",
            Instruction::Bytes(_) => "bytes",
            Instruction::Recurse(_) => "recurse",
            Instruction::Sequence(_) => "sequence",
            Instruction::Map(_) => "map",
            Instruction::Deref(_) => "deref",
            Instruction::Interface(_) => "interface",
            Instruction::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Literal(bytes) => {
                write!(f, "Literal({:?})", String::from_utf8_lossy(bytes))
            }
            Instruction::Field(op) => write!(f, "Field({:?} -> {:?})", op.key, op.plan),
            Instruction::Scalar(kind) => write!(f, "Scalar({kind:?})"),
            Instruction::Recurse(op) => write!(f, "Recurse({:?})", op.plan),
            Instruction::Sequence(op) => write!(f, "Sequence({:?})", op.element),
            Instruction::Map(op) => write!(f, "Map({:?} -> {:?})", op.key, op.value),
            Instruction::Deref(op) => write!(f, "Deref({:?})", op.target),
            other => f.write_str(other.name()),
        }
    }
}

/// One hop from a struct to an (possibly inlined) field
#[derive(Clone, Copy)]
pub enum PathStep {
    Field(&'static dyn FieldAccess),
    /// Embedded pointer; a null pointer drops the field
    Deref(&'static dyn PointerAccess),
}

pub struct FieldOp {
    pub key: &'static str,
    /// `"key":` with HTML-sensitive characters escaped
    pub key_html: Box<[u8]>,
    pub key_plain: Box<[u8]>,
    pub path: Box<[PathStep]>,
    pub omit_empty: bool,
    pub plan: PlanRef,
}

pub struct RecurseOp {
    pub access: &'static dyn FieldAccess,
    pub plan: PlanRef,
}

pub struct SequenceOp {
    pub access: &'static dyn SequenceAccess,
    pub element: PlanRef,
}

/// How map keys become JSON object keys
#[derive(Clone, Copy)]
pub enum MapKey {
    Text(&'static dyn StringAccess),
    /// Quoted decimal
    Integer(ScalarKind),
    Char,
}

impl fmt::Debug for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Text(_) => f.write_str("Text"),
            MapKey::Integer(kind) => write!(f, "Integer({kind:?})"),
            MapKey::Char => f.write_str("Char"),
        }
    }
}

pub struct MapOp {
    pub access: &'static dyn MapAccess,
    pub key: MapKey,
    pub value: PlanRef,
}

pub struct DerefOp {
    pub access: &'static dyn PointerAccess,
    pub identity: bool,
    pub target: PlanRef,
}

/// Compile `shape` into a plan published in the process-wide cache
pub fn compile(shape: &'static Shape) -> Result<Arc<Plan>, ShapeError> {
    PlanCache::global().get_or_compile(shape)
}
