#![forbid(unsafe_code)]

//! Graph-op slice.
//!
//! Ops are stored under their immediately-enclosing graph. Loading one op
//! also stores the input and consumer ops the data source embedded in the
//! response, stripped of their own embedded data.

use std::collections::BTreeMap;

use dbgscope_core::{
    DataLoadState, GraphExecution, GraphOpConsumerSpec, GraphOpInfo, GraphOpInputSpec,
    GraphOpKey, ViewError, ViewResult,
};
use dbgscope_paging::PaginatedSequence;
use tracing::debug;

/// Graph ops of the active run.
#[derive(Debug, Clone, Default)]
pub struct GraphsState {
    ops: BTreeMap<String, BTreeMap<String, GraphOpInfo>>,
    loading_ops: BTreeMap<String, BTreeMap<String, DataLoadState>>,
    focused_op: Option<GraphOpKey>,
}

impl GraphsState {
    #[must_use]
    pub fn op(&self, graph_id: &str, op_name: &str) -> Option<&GraphOpInfo> {
        self.ops.get(graph_id).and_then(|g| g.get(op_name))
    }

    #[must_use]
    pub fn op_load_state(&self, key: &GraphOpKey) -> DataLoadState {
        self.loading_ops
            .get(&key.graph_id)
            .and_then(|g| g.get(&key.op_name))
            .copied()
            .unwrap_or_default()
    }

    /// Per-graph load states of requested ops.
    #[must_use]
    pub fn loading_ops(&self) -> &BTreeMap<String, BTreeMap<String, DataLoadState>> {
        &self.loading_ops
    }

    #[must_use]
    pub fn focused_op(&self) -> Option<&GraphOpKey> {
        self.focused_op.as_ref()
    }

    #[must_use]
    pub fn focused_op_info(&self) -> Option<&GraphOpInfo> {
        let key = self.focused_op.as_ref()?;
        self.op(&key.graph_id, &key.op_name)
    }

    /// Inputs of the focused op, each annotated with the input op when loaded.
    #[must_use]
    pub fn focused_op_inputs(&self) -> Option<Vec<GraphOpInputSpec>> {
        let key = self.focused_op.as_ref()?;
        let graph = self.ops.get(&key.graph_id)?;
        let op = graph.get(&key.op_name)?;
        Some(
            op.inputs
                .iter()
                .map(|input| GraphOpInputSpec {
                    data: graph.get(&input.op_name).cloned().map(Box::new),
                    ..input.clone()
                })
                .collect(),
        )
    }

    /// Consumers of the focused op per output slot, annotated like inputs.
    #[must_use]
    pub fn focused_op_consumers(&self) -> Option<Vec<Vec<GraphOpConsumerSpec>>> {
        let key = self.focused_op.as_ref()?;
        let graph = self.ops.get(&key.graph_id)?;
        let op = graph.get(&key.op_name)?;
        Some(
            op.consumers
                .iter()
                .map(|slot| {
                    slot.iter()
                        .map(|consumer| GraphOpConsumerSpec {
                            data: graph.get(&consumer.op_name).cloned().map(Box::new),
                            ..consumer.clone()
                        })
                        .collect()
                })
                .collect(),
        )
    }

    pub(crate) fn focus(&mut self, key: GraphOpKey) {
        self.focused_op = Some(key);
    }

    /// Mark `key` as loading. Returns `false` when it is already loading or
    /// loaded.
    pub(crate) fn request(&mut self, key: &GraphOpKey) -> bool {
        if self.op(&key.graph_id, &key.op_name).is_some() {
            return false;
        }
        let state = self
            .loading_ops
            .entry(key.graph_id.clone())
            .or_default()
            .entry(key.op_name.clone())
            .or_default();
        if *state == DataLoadState::Loading {
            return false;
        }
        *state = DataLoadState::Loading;
        true
    }

    pub(crate) fn on_failed(&mut self, key: &GraphOpKey) {
        if let Some(state) = self
            .loading_ops
            .get_mut(&key.graph_id)
            .and_then(|g| g.get_mut(&key.op_name))
        {
            *state = DataLoadState::Failed;
        }
    }

    /// Store a loaded op and the ops embedded in it. Returns its key.
    pub(crate) fn on_loaded(&mut self, op: GraphOpInfo) -> ViewResult<GraphOpKey> {
        let graph_id = op
            .immediate_graph_id()
            .ok_or_else(|| {
                ViewError::InvalidArgument(format!(
                    "graph op {} has no enclosing graph",
                    op.op_name
                ))
            })?
            .to_string();

        let embedded: Vec<GraphOpInfo> = op
            .inputs
            .iter()
            .filter_map(|i| i.data.as_deref())
            .chain(op.consumers.iter().flatten().filter_map(|c| c.data.as_deref()))
            .map(GraphOpInfo::stripped)
            .collect();

        let graph = self.ops.entry(graph_id.clone()).or_default();
        for neighbor in embedded {
            graph.insert(neighbor.op_name.clone(), neighbor);
        }
        let key = GraphOpKey::new(graph_id.clone(), op.op_name.clone());
        graph.insert(op.op_name.clone(), op.stripped());

        if let Some(state) = self
            .loading_ops
            .get_mut(&graph_id)
            .and_then(|g| g.get_mut(&key.op_name))
        {
            *state = DataLoadState::Loaded;
        }
        debug!(graph_id = %key.graph_id, op_name = %key.op_name, "graph op loaded");
        Ok(key)
    }
}

/// Best-effort intra-graph execution indices of the focused execution's
/// immediate inputs.
///
/// Walks back from `focus_index - 1` over at most `max_look_back` indices,
/// skipping unloaded entries, and matches each input by graph id, op name
/// and output slot. One execution satisfies every input it matches, so an
/// op reading the same tensor twice gets the same index twice. Returns
/// `None` without a loaded focused execution or focused op; an empty list
/// for an op without inputs.
#[must_use]
pub fn input_execution_indices(
    focus_index: Option<usize>,
    data: &PaginatedSequence<GraphExecution>,
    inputs: Option<&[GraphOpInputSpec]>,
    max_look_back: usize,
) -> Option<Vec<usize>> {
    let focus_index = focus_index?;
    let inputs = inputs?;
    let focused = data.get(focus_index)?;
    let mut found = vec![false; inputs.len()];
    let mut indices = Vec::new();
    if inputs.is_empty() {
        return Some(indices);
    }
    let limit = focus_index.saturating_sub(max_look_back);
    for (i, exec) in data.iter_back_from(limit..focus_index) {
        if exec.graph_id != focused.graph_id {
            continue;
        }
        for (j, input) in inputs.iter().enumerate() {
            if !found[j] && exec.op_name == input.op_name && exec.output_slot == input.output_slot {
                indices.push(i);
                found[j] = true;
            }
        }
        if indices.len() == inputs.len() {
            break;
        }
    }
    Some(indices)
}
