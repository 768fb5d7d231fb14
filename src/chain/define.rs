//! The define step: a chain link introducing named intermediate expressions.

use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;

use super::error::{ChainError, ChainResult};
use super::resolve::Requirements;
use super::source::ChainSource;
use super::{ChainStep, FetchFn};
use crate::column::{Chunk, Datum, EvalResult};
use crate::expr::{self, is_identifier, CompiledExpr, ExprError, ExprSpec};

/// A chain link owning an ordered mapping of new names to compiled
/// expressions. Nothing is materialized until a traversal asks for one of
/// the names.
///
/// A defined name's sub-requirements always resolve against the previous
/// step, so a redefinition of an upstream name reads the upstream value and
/// cyclic requirement graphs cannot be expressed. Sibling definitions in one
/// step do not see each other; composition comes from chaining steps.
pub(crate) struct DefineStep {
    previous: Box<dyn ChainStep>,
    definitions: IndexMap<String, CompiledExpr>,
}

impl DefineStep {
    pub(crate) fn new(
        previous: Box<dyn ChainStep>,
        defs: Vec<(String, ExprSpec)>,
    ) -> ChainResult<Self> {
        let mut definitions = IndexMap::new();
        for (name, spec) in defs {
            if !is_identifier(&name) {
                return Err(ChainError::Expr(ExprError::InvalidName { name }));
            }
            let root = previous.root();
            let mut compiled = expr::compile(&spec, root.cache())?;
            compiled.eval = root.specializer().compile_eval(compiled.eval);
            debug!(
                "defined {} with requirements {:?}",
                name, compiled.requirements
            );
            definitions.insert(name, compiled);
        }
        Ok(DefineStep {
            previous,
            definitions,
        })
    }
}

impl ChainStep for DefineStep {
    fn resolve(&self, requirement: &str, requirements: &mut Requirements) -> ChainResult<()> {
        if let Some(definition) = self.definitions.get(requirement) {
            for sub in &definition.requirements {
                self.previous.resolve(sub, requirements)?;
            }
            return Ok(());
        }
        self.previous.resolve(requirement, requirements)
    }

    fn fetcher(&self, requirement: &str, requirements: &Requirements) -> ChainResult<FetchFn> {
        let definition = match self.definitions.get(requirement) {
            Some(definition) => definition,
            None => return self.previous.fetcher(requirement, requirements),
        };
        let args = definition
            .requirements
            .iter()
            .map(|sub| self.previous.fetcher(sub, requirements))
            .collect::<ChainResult<Vec<_>>>()?;
        let eval = Arc::clone(&definition.eval);
        let fetch: FetchFn = Arc::new(move |chunk: &Chunk| {
            let values = args
                .iter()
                .map(|fetch| fetch(chunk))
                .collect::<EvalResult<Vec<Datum>>>()?;
            eval(&values)
        });
        Ok(self.root().specializer().compile_fetch(fetch))
    }

    fn root(&self) -> &ChainSource {
        self.previous.root()
    }
}
