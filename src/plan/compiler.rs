/*!
 * Plan Compiler
 *
 * Turns a shape into a plan. One `Compiler` covers one compilation pass:
 * every shape it meets that the cache does not already hold gets a pending
 * slot before its own children are compiled, so recursive shapes terminate.
 * The pass hands back every plan it built; the cache publishes them together.
 */

use super::{
    DerefOp, FieldOp, Instruction, MapKey, MapOp, PathStep, Plan, PlanCache, PlanRef, RecurseOp,
    SequenceOp,
};
use crate::core::ShapeError;
use crate::encoder::escape::quoted_key;
use crate::shape::{ScalarKind, Shape, ShapeKind, StructShape};
use ahash::RandomState;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub(crate) struct Compiler<'c> {
    cache: &'c PlanCache,
    pending: HashMap<TypeId, PlanRef, RandomState>,
    compiled: Vec<Arc<Plan>>,
}

/// Output of a successful pass
pub(crate) struct Compiled {
    pub root: Arc<Plan>,
    pub plans: Vec<Arc<Plan>>,
}

/// A struct field before key conflicts are resolved
struct Candidate {
    key: &'static str,
    depth: usize,
    path: Vec<PathStep>,
    shape: &'static Shape,
    omit_empty: bool,
}

impl<'c> Compiler<'c> {
    pub(crate) fn new(cache: &'c PlanCache) -> Self {
        Self {
            cache,
            pending: HashMap::default(),
            compiled: Vec::new(),
        }
    }

    pub(crate) fn run(mut self, shape: &'static Shape) -> Result<Compiled, ShapeError> {
        let root = self.plan_ref(shape)?.arc()?;
        Ok(Compiled {
            root,
            plans: self.compiled,
        })
    }

    fn plan_ref(&mut self, shape: &'static Shape) -> Result<PlanRef, ShapeError> {
        let id = shape.type_id();
        if let Some(plan) = self.cache.lookup(id) {
            return Ok(PlanRef::ready(plan));
        }
        if let Some(slot) = self.pending.get(&id) {
            return Ok(slot.clone());
        }

        let slot = PlanRef::pending(shape);
        self.pending.insert(id, slot.clone());

        let plan = Arc::new(self.build(shape)?);
        debug!(
            type_name = shape.type_name(),
            kind = shape.kind().name(),
            instructions = plan.instructions().len(),
            "Compiled plan"
        );
        slot.fill(plan.clone());
        self.compiled.push(plan);
        Ok(slot)
    }

    fn build(&mut self, shape: &'static Shape) -> Result<Plan, ShapeError> {
        let plan = match shape.kind() {
            ShapeKind::Scalar(ScalarKind::Unit) => {
                Plan::new(shape, vec![Instruction::Literal(b"null")], false)
            }
            ShapeKind::Scalar(kind) => Plan::new(shape, vec![Instruction::Scalar(*kind)], false),
            ShapeKind::String(access) => {
                Plan::new(shape, vec![Instruction::String(&**access)], false)
            }
            ShapeKind::Bytes(access) => Plan::new(shape, vec![Instruction::Bytes(&**access)], false),
            ShapeKind::Struct(st) => {
                let mut instructions = vec![Instruction::Literal(b"{")];
                for field in self.struct_fields(shape, st)? {
                    instructions.push(Instruction::Field(field));
                }
                instructions.push(Instruction::Literal(b"}"));
                Plan::new(shape, instructions, true)
            }
            ShapeKind::Transparent(t) => {
                let plan = self.plan_ref((t.inner)())?;
                Plan::new(
                    shape,
                    vec![Instruction::Recurse(RecurseOp {
                        access: &*t.access,
                        plan,
                    })],
                    false,
                )
            }
            ShapeKind::Sequence(seq) => {
                let element = self.plan_ref((seq.element)())?;
                Plan::new(
                    shape,
                    vec![Instruction::Sequence(SequenceOp {
                        access: &*seq.access,
                        element,
                    })],
                    true,
                )
            }
            ShapeKind::Map(map) => {
                let key = map_key(shape, (map.key)())?;
                let value = self.plan_ref((map.value)())?;
                Plan::new(
                    shape,
                    vec![Instruction::Map(MapOp {
                        access: &*map.access,
                        key,
                        value,
                    })],
                    true,
                )
            }
            ShapeKind::Pointer(ptr) => {
                let target = self.plan_ref((ptr.target)())?;
                Plan::new(
                    shape,
                    vec![Instruction::Deref(DerefOp {
                        access: &*ptr.access,
                        identity: ptr.identity,
                        target,
                    })],
                    false,
                )
            }
            ShapeKind::Interface(iface) => {
                Plan::new(shape, vec![Instruction::Interface(&*iface.access)], false)
            }
            ShapeKind::Custom(custom) => {
                if custom.hook.target() != shape.type_id() {
                    return Err(ShapeError::HookMismatch {
                        type_name: shape.type_name(),
                    });
                }
                Plan::new(shape, vec![Instruction::Custom(&*custom.hook)], false)
            }
        };
        Ok(plan)
    }

    /// Resolve the flattened field list of a struct
    ///
    /// Inlined fields are promoted at their embedding depth. For each key the
    /// shallowest candidate wins; a tie at that depth is a duplicate.
    fn struct_fields(
        &mut self,
        shape: &'static Shape,
        st: &'static StructShape,
    ) -> Result<Vec<FieldOp>, ShapeError> {
        let mut candidates = Vec::new();
        let mut visiting = vec![shape.type_id()];
        collect_fields(shape, st, 0, &[], &mut visiting, &mut candidates)?;

        let mut chosen: Vec<&Candidate> = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let shallowest = candidates
                .iter()
                .filter(|c| c.key == candidate.key)
                .map(|c| c.depth)
                .min()
                .unwrap_or(candidate.depth);
            if candidate.depth != shallowest {
                continue;
            }
            if chosen.iter().any(|c| c.key == candidate.key) {
                return Err(ShapeError::DuplicateKey {
                    type_name: shape.type_name(),
                    key: candidate.key.to_string(),
                });
            }
            chosen.push(candidate);
        }

        let mut fields = Vec::with_capacity(chosen.len());
        for candidate in chosen {
            fields.push(FieldOp {
                key: candidate.key,
                key_html: quoted_key(candidate.key, true),
                key_plain: quoted_key(candidate.key, false),
                path: candidate.path.clone().into_boxed_slice(),
                omit_empty: candidate.omit_empty,
                plan: self.plan_ref(candidate.shape)?,
            });
        }
        Ok(fields)
    }
}

fn collect_fields(
    owner: &'static Shape,
    st: &'static StructShape,
    depth: usize,
    prefix: &[PathStep],
    visiting: &mut Vec<TypeId>,
    out: &mut Vec<Candidate>,
) -> Result<(), ShapeError> {
    for field in &st.fields {
        if field.flags.skip {
            continue;
        }
        let mut path = prefix.to_vec();
        path.push(PathStep::Field(&*field.access));
        let field_shape = (field.shape)();

        if !field.flags.inline {
            out.push(Candidate {
                key: field.key,
                depth,
                path,
                shape: field_shape,
                omit_empty: field.flags.omit_empty,
            });
            continue;
        }

        // Look through pointers down to the embedded struct
        let mut inner = field_shape;
        let embedded = loop {
            match inner.kind() {
                ShapeKind::Struct(embedded) => break embedded,
                ShapeKind::Pointer(ptr) => {
                    path.push(PathStep::Deref(&*ptr.access));
                    inner = (ptr.target)();
                }
                _ => {
                    return Err(ShapeError::InvalidInline {
                        type_name: owner.type_name(),
                        field: field.name,
                        inner: inner.type_name(),
                    })
                }
            }
        };

        // An embedding cycle contributes nothing past its first level
        if visiting.contains(&inner.type_id()) {
            continue;
        }
        visiting.push(inner.type_id());
        collect_fields(inner, embedded, depth + 1, &path, visiting, out)?;
        visiting.pop();
    }
    Ok(())
}

fn map_key(owner: &'static Shape, key: &'static Shape) -> Result<MapKey, ShapeError> {
    match key.kind() {
        ShapeKind::String(access) => Ok(MapKey::Text(&**access)),
        ShapeKind::Scalar(kind) if kind.is_integer() => Ok(MapKey::Integer(*kind)),
        ShapeKind::Scalar(ScalarKind::Char) => Ok(MapKey::Char),
        _ => Err(ShapeError::UnsupportedMapKey {
            type_name: owner.type_name(),
            key_type: key.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{FieldFlags, Reflect, StructBuilder};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct Base {
        id: u32,
        name: String,
    }

    crate::reflect_struct!(Base { id, name });

    struct Wrapper {
        base: Base,
        name: String,
        extra: bool,
    }

    crate::reflect_struct!(Wrapper {
        base [inline],
        name,
        extra [skip],
    });

    struct Node {
        value: i64,
        next: Option<Box<Node>>,
    }

    crate::reflect_struct!(Node { value, next });

    #[test]
    fn test_inline_shallowest_key_wins() {
        let compiled = Compiler::new(&PlanCache::new()).run(Wrapper::shape()).unwrap();
        assert_eq!(compiled.root.field_keys(), vec!["id", "name"]);

        let Instruction::Field(name) = &compiled.root.instructions()[2] else {
            panic!("expected field");
        };
        // the parent's own `name`, one hop deep
        assert_eq!(name.path.len(), 1);
    }

    #[test]
    fn test_recursive_shape_terminates() {
        let compiled = Compiler::new(&PlanCache::new()).run(Node::shape()).unwrap();
        assert_eq!(compiled.root.field_keys(), vec!["value", "next"]);
        // Node, i64, Option<Box<Node>>, Box<Node>
        assert_eq!(compiled.plans.len(), 4);
    }

    #[test]
    fn test_duplicate_key_at_same_depth() {
        let shape = Shape::leak(Shape::new::<Base>(
            StructBuilder::<Base>::new()
                .field("id", |b| &b.id)
                .declare("name", "id", |b| &b.name, FieldFlags::NONE)
                .build(),
        ));
        let err = Compiler::new(&PlanCache::new()).run(shape).err().unwrap();
        assert_eq!(
            err,
            ShapeError::DuplicateKey {
                type_name: std::any::type_name::<Base>(),
                key: "id".into(),
            }
        );
    }

    #[test]
    fn test_inline_non_struct_rejected() {
        let shape = Shape::leak(Shape::new::<Base>(
            StructBuilder::<Base>::new().inline("id", |b| &b.id).build(),
        ));
        let err = Compiler::new(&PlanCache::new()).run(shape).err().unwrap();
        assert!(matches!(err, ShapeError::InvalidInline { field: "id", inner: "u32", .. }));
    }

    #[test]
    fn test_map_key_kinds() {
        assert!(Compiler::new(&PlanCache::new())
            .run(HashMap::<u16, bool>::shape())
            .is_ok());
        let err = Compiler::new(&PlanCache::new())
            .run(HashMap::<bool, bool>::shape())
            .err()
            .unwrap();
        assert!(matches!(err, ShapeError::UnsupportedMapKey { key_type: "bool", .. }));
    }
}
