#![forbid(unsafe_code)]

//! Record builders and canned runs for tests.

use dbgscope_core::{
    Alert, Execution, FunctionRecompilesAlert, GraphExecution, GraphOpConsumerSpec, GraphOpInfo,
    GraphOpInputSpec, InfNanAlert, SourceFileSpec, StackFrame, StackFrameId, TensorDebugMode,
};

use crate::memory_source::MemorySource;

/// Host every fixture record lives on.
pub const HOST: &str = "localhost";

/// A top-level execution of `op_type` created by `frame_ids`.
#[must_use]
pub fn execution(op_type: &str, frame_ids: &[&str]) -> Execution {
    Execution {
        op_type: op_type.into(),
        output_tensor_device_ids: vec!["d0".into()],
        host_name: HOST.into(),
        stack_frame_ids: frame_ids.iter().copied().map(StackFrameId::from).collect(),
        tensor_debug_mode: TensorDebugMode::CurtHealth,
        graph_id: None,
        input_tensor_ids: vec![],
        output_tensor_ids: vec![],
        debug_tensor_values: None,
    }
}

/// An intra-graph execution of `op_name` in `graph_id`.
#[must_use]
pub fn graph_execution(graph_id: &str, op_name: &str, output_slot: u32) -> GraphExecution {
    GraphExecution {
        graph_id: graph_id.into(),
        op_name: op_name.into(),
        op_type: "Identity".into(),
        output_slot,
        graph_ids: vec![graph_id.into()],
        tensor_debug_mode: TensorDebugMode::CurtHealth,
        debug_tensor_value: None,
        device_name: "d0".into(),
    }
}

/// An op in `graph_id` fed by slot 0 of each of `inputs` and feeding input
/// slot 0 of each of `consumers`.
#[must_use]
pub fn graph_op(graph_id: &str, op_name: &str, inputs: &[&str], consumers: &[&str]) -> GraphOpInfo {
    GraphOpInfo {
        op_type: "Identity".into(),
        op_name: op_name.into(),
        graph_ids: vec![graph_id.into()],
        num_outputs: 1,
        host_name: HOST.into(),
        device_name: None,
        stack_frame_ids: vec![],
        inputs: inputs
            .iter()
            .map(|name| GraphOpInputSpec {
                op_name: (*name).into(),
                output_slot: 0,
                data: None,
            })
            .collect(),
        consumers: vec![
            consumers
                .iter()
                .map(|name| GraphOpConsumerSpec {
                    op_name: (*name).into(),
                    input_slot: 0,
                    data: None,
                })
                .collect(),
        ],
    }
}

#[must_use]
pub fn frame(file_path: &str, lineno: u32, function_name: &str) -> StackFrame {
    StackFrame::new(HOST, file_path, lineno, function_name)
}

#[must_use]
pub fn file(file_path: &str) -> SourceFileSpec {
    SourceFileSpec::new(HOST, file_path)
}

#[must_use]
pub fn inf_nan_alert(execution_index: usize, graph_execution_index: Option<usize>) -> Alert {
    Alert::InfNan(InfNanAlert {
        op_type: "RealDiv".into(),
        output_slot: 0,
        size: 10,
        num_neg_inf: 0,
        num_pos_inf: 1,
        num_nan: 2,
        execution_index,
        graph_execution_trace_index: graph_execution_index,
    })
}

#[must_use]
pub fn recompile_alert(function_name: &str) -> Alert {
    Alert::FunctionRecompiles(FunctionRecompilesAlert {
        function_name: function_name.into(),
        num_compiles: 5,
    })
}

/// A run of `n` executions named `Op0`, `Op1`, ... with no stack frames.
#[must_use]
pub fn linear_run(run: &str, n: usize) -> MemorySource {
    let mut source = MemorySource::new().with_run(run, 0.0);
    for i in 0..n {
        source.push_execution(run, execution(&format!("Op{i}"), &[]));
    }
    source
}

/// A run whose executions share one two-frame stack: `main` in
/// `/file1.py` calling `inner` in `/file2.py`. Frames `f1` and `f3` sit in
/// `/file2.py` at lines 10 and 20; `f2` is the `/file1.py` caller.
#[must_use]
pub fn stacked_run(run: &str, n: usize) -> MemorySource {
    let mut source = MemorySource::new().with_run(run, 0.0);
    source.insert_stack_frame(run, "f1", frame("/file2.py", 10, "inner"));
    source.insert_stack_frame(run, "f2", frame("/file1.py", 5, "main"));
    source.insert_stack_frame(run, "f3", frame("/file2.py", 20, "inner"));
    for path in ["/file1.py", "/file2.py"] {
        let lines = (1..=30).map(|i| format!("# {path}:{i}")).collect();
        source.add_source_file(run, file(path), lines);
    }
    for i in 0..n {
        let ids: &[&str] = if i % 2 == 0 { &["f2", "f1"] } else { &["f2", "f3"] };
        source.push_execution(run, execution(&format!("Op{i}"), ids));
    }
    source
}
