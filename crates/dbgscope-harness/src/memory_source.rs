#![forbid(unsafe_code)]

//! In-memory [`DataSource`].
//!
//! Holds every run's records in plain vectors and maps. Tests grow a run
//! between polls with the `push_*`/`insert_*` methods; totals therefore only
//! ever increase, which is what a live data source guarantees.

use std::collections::{BTreeMap, HashMap};

use dbgscope_core::{
    Alert, AlertType, Execution, ExecutionDigest, GraphExecution, GraphOpConsumerSpec,
    GraphOpInfo, GraphOpInputSpec, GraphOpKey, RunId, RunMetadata, SourceFileSpec, StackFrame,
    StackFrameId,
};
use dbgscope_runtime::{
    AlertsBreakdown, DataSource, PageResponse, TransportError, TransportResult,
};

/// Everything recorded for one run.
#[derive(Debug, Clone, Default)]
pub struct RunData {
    pub metadata: Option<RunMetadata>,
    pub executions: Vec<Execution>,
    pub graph_executions: Vec<GraphExecution>,
    pub stack_frames: HashMap<StackFrameId, StackFrame>,
    /// Ops by graph id, then op name. Stored without embedded neighbors.
    pub graph_ops: BTreeMap<String, BTreeMap<String, GraphOpInfo>>,
    pub source_files: BTreeMap<SourceFileSpec, Vec<String>>,
    pub alerts: Vec<Alert>,
}

impl RunData {
    fn alerts_of(&self, alert_type: AlertType) -> impl Iterator<Item = &Alert> + '_ {
        self.alerts
            .iter()
            .filter(move |a| a.alert_type() == alert_type)
    }

    fn breakdown(&self) -> AlertsBreakdown {
        let mut per_type = BTreeMap::new();
        for alert in &self.alerts {
            *per_type.entry(alert.alert_type()).or_insert(0) += 1;
        }
        AlertsBreakdown {
            num_alerts: self.alerts.len(),
            per_type,
        }
    }

    /// The op with its inputs and consumers embedded from the same graph.
    fn embedded_op(&self, key: &GraphOpKey) -> Option<GraphOpInfo> {
        let graph = self.graph_ops.get(&key.graph_id)?;
        let mut op = graph.get(&key.op_name)?.clone();
        let lookup = |name: &str| graph.get(name).map(|o| Box::new(o.stripped()));
        op.inputs = op
            .inputs
            .into_iter()
            .map(|input| GraphOpInputSpec {
                data: lookup(&input.op_name),
                ..input
            })
            .collect();
        op.consumers = op
            .consumers
            .into_iter()
            .map(|slot| {
                slot.into_iter()
                    .map(|consumer| GraphOpConsumerSpec {
                        data: lookup(&consumer.op_name),
                        ..consumer
                    })
                    .collect()
            })
            .collect();
        Some(op)
    }
}

/// A [`DataSource`] backed by memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    runs: BTreeMap<RunId, RunData>,
    offline: bool,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty run that started at `start_time`.
    #[must_use]
    pub fn with_run(mut self, run: impl Into<RunId>, start_time: f64) -> Self {
        self.add_run(run, start_time);
        self
    }

    pub fn add_run(&mut self, run: impl Into<RunId>, start_time: f64) -> &mut RunData {
        let data = self.runs.entry(run.into()).or_default();
        data.metadata = Some(RunMetadata { start_time });
        data
    }

    #[must_use]
    pub fn run(&self, run: &str) -> Option<&RunData> {
        self.runs.get(run)
    }

    pub fn run_mut(&mut self, run: &str) -> Option<&mut RunData> {
        self.runs.get_mut(run)
    }

    /// Make every call fail with [`TransportError::Unavailable`].
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn push_execution(&mut self, run: &str, execution: Execution) {
        if let Some(data) = self.runs.get_mut(run) {
            data.executions.push(execution);
        }
    }

    pub fn push_graph_execution(&mut self, run: &str, execution: GraphExecution) {
        if let Some(data) = self.runs.get_mut(run) {
            data.graph_executions.push(execution);
        }
    }

    pub fn insert_stack_frame(&mut self, run: &str, id: impl Into<StackFrameId>, frame: StackFrame) {
        if let Some(data) = self.runs.get_mut(run) {
            data.stack_frames.insert(id.into(), frame);
        }
    }

    /// Store `op` under its immediately-enclosing graph. Ops without a graph
    /// id are ignored.
    pub fn insert_graph_op(&mut self, run: &str, op: GraphOpInfo) {
        let Some(data) = self.runs.get_mut(run) else {
            return;
        };
        let Some(graph_id) = op.immediate_graph_id().map(str::to_owned) else {
            return;
        };
        data.graph_ops
            .entry(graph_id)
            .or_default()
            .insert(op.op_name.clone(), op.stripped());
    }

    pub fn add_source_file(&mut self, run: &str, file: SourceFileSpec, lines: Vec<String>) {
        if let Some(data) = self.runs.get_mut(run) {
            data.source_files.insert(file, lines);
        }
    }

    pub fn push_alert(&mut self, run: &str, alert: Alert) {
        if let Some(data) = self.runs.get_mut(run) {
            data.alerts.push(alert);
        }
    }

    fn data(&self, run: &str) -> TransportResult<&RunData> {
        if self.offline {
            return Err(TransportError::Unavailable("memory source is offline".into()));
        }
        self.runs
            .get(run)
            .ok_or_else(|| TransportError::NotFound(format!("run {run}")))
    }
}

/// The items of `[begin, end)` that exist, plus the current total.
fn page_of<T, U>(
    all: &[T],
    begin: usize,
    end: usize,
    map: impl Fn(&T) -> U,
) -> PageResponse<U> {
    let total = all.len();
    let end = end.min(total);
    let begin = begin.min(end);
    PageResponse {
        begin,
        end,
        items: all[begin..end].iter().map(map).collect(),
        total,
    }
}

impl DataSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn list_runs(&self) -> TransportResult<BTreeMap<RunId, RunMetadata>> {
        if self.offline {
            return Err(TransportError::Unavailable("memory source is offline".into()));
        }
        Ok(self
            .runs
            .iter()
            .filter_map(|(id, data)| data.metadata.map(|m| (id.clone(), m)))
            .collect())
    }

    fn num_executions(&self, run: &str) -> TransportResult<usize> {
        Ok(self.data(run)?.executions.len())
    }

    fn num_graph_executions(&self, run: &str) -> TransportResult<usize> {
        Ok(self.data(run)?.graph_executions.len())
    }

    fn execution_digests(
        &self,
        run: &str,
        begin: usize,
        end: usize,
    ) -> TransportResult<PageResponse<ExecutionDigest>> {
        Ok(page_of(&self.data(run)?.executions, begin, end, Execution::digest))
    }

    fn graph_executions(
        &self,
        run: &str,
        begin: usize,
        end: usize,
    ) -> TransportResult<PageResponse<GraphExecution>> {
        Ok(page_of(
            &self.data(run)?.graph_executions,
            begin,
            end,
            GraphExecution::clone,
        ))
    }

    fn executions(&self, run: &str, begin: usize, end: usize) -> TransportResult<Vec<Execution>> {
        let data = self.data(run)?;
        if begin > end || end > data.executions.len() {
            return Err(TransportError::NotFound(format!(
                "executions [{begin}, {end}) of {}",
                data.executions.len()
            )));
        }
        Ok(data.executions[begin..end].to_vec())
    }

    fn stack_frames(
        &self,
        run: &str,
        ids: &[StackFrameId],
    ) -> TransportResult<HashMap<StackFrameId, StackFrame>> {
        let data = self.data(run)?;
        ids.iter()
            .map(|id| {
                data.stack_frames
                    .get(id)
                    .map(|frame| (id.clone(), frame.clone()))
                    .ok_or_else(|| TransportError::NotFound(format!("stack frame {id}")))
            })
            .collect()
    }

    fn graph_op_info(&self, run: &str, key: &GraphOpKey) -> TransportResult<GraphOpInfo> {
        self.data(run)?.embedded_op(key).ok_or_else(|| {
            TransportError::NotFound(format!("op {} in graph {}", key.op_name, key.graph_id))
        })
    }

    fn source_file_list(&self, run: &str) -> TransportResult<Vec<SourceFileSpec>> {
        Ok(self.data(run)?.source_files.keys().cloned().collect())
    }

    fn source_file(&self, run: &str, file: &SourceFileSpec) -> TransportResult<Vec<String>> {
        self.data(run)?
            .source_files
            .get(file)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(format!("file {}", file.file_path)))
    }

    fn num_alerts_and_breakdown(&self, run: &str) -> TransportResult<AlertsBreakdown> {
        Ok(self.data(run)?.breakdown())
    }

    fn alerts_of_type(
        &self,
        run: &str,
        alert_type: AlertType,
        begin: usize,
        end: usize,
    ) -> TransportResult<Vec<Alert>> {
        let alerts: Vec<Alert> = self
            .data(run)?
            .alerts_of(alert_type)
            .skip(begin)
            .take(end.saturating_sub(begin))
            .cloned()
            .collect();
        if alerts.len() != end.saturating_sub(begin) {
            return Err(TransportError::NotFound(format!(
                "{alert_type} alerts [{begin}, {end})"
            )));
        }
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn pages_are_clamped_to_the_total() {
        let source = fixtures::linear_run("run_a", 25);
        let page = source.execution_digests("run_a", 20, 30).unwrap();
        assert_eq!((page.begin, page.end, page.total), (20, 25, 25));
        assert_eq!(page.items.len(), 5);

        let past = source.execution_digests("run_a", 40, 50).unwrap();
        assert!(past.items.is_empty());
        assert_eq!(past.begin, past.end);
    }

    #[test]
    fn unknown_run_is_not_found() {
        let source = MemorySource::new();
        assert!(matches!(
            source.num_executions("nope"),
            Err(TransportError::NotFound(_))
        ));
    }

    #[test]
    fn offline_source_fails_everything() {
        let mut source = fixtures::linear_run("run_a", 3);
        source.set_offline(true);
        assert!(matches!(
            source.list_runs(),
            Err(TransportError::Unavailable(_))
        ));
        assert!(source.num_executions("run_a").is_err());
    }

    #[test]
    fn graph_op_embeds_neighbors() {
        let mut source = MemorySource::new().with_run("run_a", 0.0);
        source.insert_graph_op("run_a", fixtures::graph_op("g1", "x", &[], &["y"]));
        source.insert_graph_op("run_a", fixtures::graph_op("g1", "y", &["x"], &[]));
        let op = source
            .graph_op_info("run_a", &GraphOpKey::new("g1", "y"))
            .unwrap();
        assert_eq!(op.inputs[0].data.as_ref().map(|d| d.op_name.as_str()), Some("x"));

        let x = source
            .graph_op_info("run_a", &GraphOpKey::new("g1", "x"))
            .unwrap();
        assert_eq!(
            x.consumers[0][0].data.as_ref().map(|d| d.op_name.as_str()),
            Some("y")
        );
    }

    #[test]
    fn breakdown_counts_per_type() {
        let mut source = MemorySource::new().with_run("run_a", 0.0);
        source.push_alert("run_a", fixtures::inf_nan_alert(3, None));
        source.push_alert("run_a", fixtures::inf_nan_alert(7, None));
        source.push_alert("run_a", fixtures::recompile_alert("f"));
        let breakdown = source.num_alerts_and_breakdown("run_a").unwrap();
        assert_eq!(breakdown.num_alerts, 3);
        assert_eq!(breakdown.per_type.get(&AlertType::InfNan), Some(&2));
        let alerts = source
            .alerts_of_type("run_a", AlertType::InfNan, 1, 2)
            .unwrap();
        assert_eq!(alerts[0].execution_index(), Some(7));
        assert!(
            source
                .alerts_of_type("run_a", AlertType::InfNan, 0, 5)
                .is_err()
        );
    }
}
