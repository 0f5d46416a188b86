use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    fmt,
};

use tracing::{debug, trace};

use crate::{error::LowerError, operation::Operation};

use super::{cpu, BufferArgs, Kernel};

type BuildFn = Box<dyn Fn(&dyn Operation, &BufferArgs) -> Result<Kernel, LowerError> + Send + Sync>;

struct BuilderEntry {
    name: &'static str,
    build: BuildFn,
}

/// Maps the concrete type of an operator to the routine that compiles it.
///
/// Registration takes `&mut self` and lookup `&self`, so every builder is in
/// place before the first kernel is built.
#[derive(Default)]
pub struct KernelRegistry {
    builders: HashMap<TypeId, BuilderEntry>,
}

impl fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.builders.values().map(|entry| entry.name).collect::<Vec<_>>();
        names.sort_unstable();
        f.debug_struct("KernelRegistry").field("builders", &names).finish()
    }
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every CPU builder.
    pub fn cpu() -> Self {
        let mut registry = Self::new();
        cpu::register_builders(&mut registry);
        registry
    }

    /// Replaces any builder previously registered for `T`.
    pub fn register<T, F>(&mut self, builder: F)
    where
        T: Operation,
        F: Fn(&T, &BufferArgs) -> Result<Kernel, LowerError> + Send + Sync + 'static,
    {
        let name = type_name::<T>();

        let build: BuildFn = Box::new(move |op, args| match op.downcast::<T>() {
            Some(op) => builder(op, args),
            None => Err(LowerError::UnsupportedOperator { op: op.opname() }),
        });

        if self.builders.insert(TypeId::of::<T>(), BuilderEntry { name, build }).is_some() {
            debug!(op = name, "replaced kernel builder");
        } else {
            debug!(op = name, "registered kernel builder");
        }
    }

    pub fn is_registered<T: Operation>(&self) -> bool {
        self.builders.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Looks up the builder for the concrete type of `op` and runs it.
    pub fn build(&self, op: &dyn Operation, args: &BufferArgs) -> Result<Kernel, LowerError> {
        let any: &dyn Any = op;

        let entry =
            self.builders.get(&any.type_id()).ok_or_else(|| LowerError::UnsupportedOperator { op: op.opname() })?;

        trace!(builder = entry.name, op = %op.opname(), "building kernel");

        (entry.build)(op, args)
    }
}
