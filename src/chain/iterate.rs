//! The iteration driver.
//!
//! `build` resolves the requested outputs against the chain, compiles one
//! composed per-chunk evaluator per output, and returns a [`RecordIter`]
//! that streams chunks from the source and yields one record per chunk.
//!
//! Error surfacing is pipelined one chunk behind consumption: a chunk's
//! tasks are dispatched, the following chunk is pulled from the source
//! (overlapping compute and read under a threaded executor), and only then
//! are the dispatched outcomes joined. An output failure is yielded in place
//! of its chunk's record and fuses the iterator; a failure on the final
//! chunk surfaces at exhaustion.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;

use super::error::{ChainError, ChainResult};
use super::resolve::Requirements;
use super::source::SourceStream;
use super::{ChainStep, FetchFn};
use crate::column::{Datum, EvalResult};
use crate::exec::{CalcExecutor, Pending, SerialExecutor, Task};
use crate::expr::{self, is_identifier, Outputs};

/// The shape of the per-chunk aggregate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    /// Insertion-ordered display name → value mapping. Every output must
    /// carry a display name.
    Map,
    /// Positional values in declaration order. Callers wanting a custom
    /// container map over the iterator.
    List,
    /// Named-tuple-like container; every display name must be a legal
    /// identifier.
    Record,
}

/// A named-tuple-like record: a field-name table shared across all chunks
/// plus this chunk's positional values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Arc<[String]>,
    values: Vec<Datum>,
}

impl Record {
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn values(&self) -> &[Datum] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&Datum> {
        let index = self.fields.iter().position(|field| field == name)?;
        self.values.get(index)
    }
}

/// One chunk's results in the requested container shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Records {
    Map(IndexMap<String, Datum>),
    List(Vec<Datum>),
    Record(Record),
}

impl Records {
    pub fn as_map(&self) -> Option<&IndexMap<String, Datum>> {
        match self {
            Records::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Datum]> {
        match self {
            Records::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Records::Record(record) => Some(record),
            _ => None,
        }
    }
}

enum ContainerSpec {
    Map(Vec<String>),
    List,
    Record(Arc<[String]>),
}

/// Resolve, compile, and open the stream for one traversal.
pub(crate) fn build(
    step: &dyn ChainStep,
    outputs: Outputs,
    output_type: OutputType,
    executor: Option<Arc<dyn CalcExecutor>>,
) -> ChainResult<RecordIter> {
    let root = step.root();

    // Normalize the outputs into compiled (evaluator, requirements, name)
    // tuples; a caller-supplied name overrides the default display name.
    let mut compiled = Vec::with_capacity(outputs.len());
    for (name, spec) in outputs.items() {
        let mut output = expr::compile(spec, root.cache())?;
        if name.is_some() {
            output.name = name.clone();
        }
        compiled.push(output);
    }

    // Container naming is validated before anything is resolved or fetched.
    let container = match output_type {
        OutputType::List => ContainerSpec::List,
        OutputType::Map => {
            let names = display_names(&compiled)?;
            ContainerSpec::Map(names)
        }
        OutputType::Record => {
            let names = display_names(&compiled)?;
            for name in &names {
                if !is_identifier(name) {
                    return Err(ChainError::InvalidFieldName { name: name.clone() });
                }
            }
            ContainerSpec::Record(names.into())
        }
    };

    // Walk the chain to accumulate the raw columns every output needs.
    let mut requirements = Requirements::new();
    for output in &compiled {
        for requirement in &output.requirements {
            step.resolve(requirement, &mut requirements)?;
        }
    }
    debug!(
        "resolved {} outputs to {} raw columns {:?} (entry index: {})",
        compiled.len(),
        requirements.columns().len(),
        requirements.columns(),
        requirements.needs_entry_index(),
    );

    // One fetcher per distinct requirement, shared across outputs, composed
    // into one closed-over per-chunk evaluator per output. Both the leaf
    // fetchers and the composed evaluators go through the specializer.
    let mut fetchers: HashMap<String, FetchFn> = HashMap::new();
    let mut evaluators = Vec::with_capacity(compiled.len());
    for output in &compiled {
        let mut args = Vec::with_capacity(output.requirements.len());
        for requirement in &output.requirements {
            let fetch = match fetchers.get(requirement) {
                Some(fetch) => Arc::clone(fetch),
                None => {
                    let fetch = step.fetcher(requirement, &requirements)?;
                    fetchers.insert(requirement.clone(), Arc::clone(&fetch));
                    fetch
                }
            };
            args.push(fetch);
        }
        let eval = root.specializer().compile_eval(Arc::clone(&output.eval));
        let composed: FetchFn = Arc::new(move |chunk| {
            let values = args
                .iter()
                .map(|fetch| fetch(chunk))
                .collect::<EvalResult<Vec<Datum>>>()?;
            eval(&values)
        });
        evaluators.push(root.specializer().compile_fetch(composed));
    }

    let stream = root.stream(&requirements)?;
    Ok(RecordIter {
        stream,
        executor: executor.unwrap_or_else(|| Arc::new(SerialExecutor)),
        evaluators,
        container,
        pending: None,
        stashed: None,
        done: false,
    })
}

fn display_names(compiled: &[expr::CompiledExpr]) -> ChainResult<Vec<String>> {
    compiled
        .iter()
        .enumerate()
        .map(|(index, output)| {
            output
                .name
                .clone()
                .ok_or(ChainError::UnnamedOutput { index })
        })
        .collect()
}

/// The lazy, finite, non-restartable record sequence of one `iterate` call.
///
/// Fuses after yielding any error.
pub struct RecordIter {
    stream: SourceStream,
    executor: Arc<dyn CalcExecutor>,
    evaluators: Vec<FetchFn>,
    container: ContainerSpec,
    pending: Option<Pending>,
    stashed: Option<ChainError>,
    done: bool,
}

impl RecordIter {
    fn dispatch(&self, chunk: crate::column::Chunk) -> Pending {
        let chunk = Arc::new(chunk);
        let tasks: Vec<Task> = self
            .evaluators
            .iter()
            .map(|evaluator| {
                let evaluator = Arc::clone(evaluator);
                let chunk = Arc::clone(&chunk);
                Box::new(move || evaluator(&chunk)) as Task
            })
            .collect();
        self.executor.dispatch(tasks)
    }

    fn assemble(&self, values: Vec<Datum>) -> Records {
        match &self.container {
            ContainerSpec::List => Records::List(values),
            ContainerSpec::Map(names) => Records::Map(
                names.iter().cloned().zip(values).collect(),
            ),
            ContainerSpec::Record(fields) => Records::Record(Record {
                fields: Arc::clone(fields),
                values,
            }),
        }
    }
}

impl Iterator for RecordIter {
    type Item = ChainResult<Records>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(error) = self.stashed.take() {
            self.done = true;
            return Some(Err(error));
        }

        if self.pending.is_none() {
            match self.stream.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(error)) => {
                    self.done = true;
                    return Some(Err(error));
                }
                Some(Ok(chunk)) => self.pending = Some(self.dispatch(chunk)),
            }
        }

        // Pull the following chunk before joining the dispatched one, so a
        // threaded executor overlaps this chunk's evaluation with the next
        // read. A source error is stashed and surfaces after the record
        // already in flight, keeping chunk order.
        let mut following = None;
        match self.stream.next() {
            None => {}
            Some(Err(error)) => self.stashed = Some(error),
            Some(Ok(chunk)) => following = Some(chunk),
        }

        let outcomes = match self.pending.take() {
            Some(pending) => pending.join(),
            None => return None,
        };

        let mut values = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(value) => values.push(value),
                Err(error) => {
                    // First failing output in declaration order wins; the
                    // following chunk is never evaluated.
                    self.done = true;
                    return Some(Err(ChainError::Eval(error)));
                }
            }
        }

        if let Some(chunk) = following {
            self.pending = Some(self.dispatch(chunk));
        }
        Some(Ok(self.assemble(values)))
    }
}
