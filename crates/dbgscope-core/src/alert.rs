#![forbid(unsafe_code)]

//! Alerts raised by the data source about suspicious executions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of alert. The serialized names match the data source's tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertType {
    #[serde(rename = "FunctionRecompilesAlert")]
    FunctionRecompiles,
    #[serde(rename = "InfNanAlert")]
    InfNan,
    #[serde(rename = "TensorShapeAlert")]
    TensorShape,
}

impl AlertType {
    pub const ALL: [AlertType; 3] = [Self::FunctionRecompiles, Self::InfNan, Self::TensorShape];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FunctionRecompiles => "FunctionRecompilesAlert",
            Self::InfNan => "InfNanAlert",
            Self::TensorShape => "TensorShapeAlert",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infinity or NaN values found in an output tensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfNanAlert {
    pub op_type: String,
    pub output_slot: u32,
    pub size: u64,
    pub num_neg_inf: u64,
    pub num_pos_inf: u64,
    pub num_nan: u64,
    /// Top-level execution the alert belongs to.
    pub execution_index: usize,
    /// Intra-graph execution, when the bad tensor was produced inside a graph.
    #[serde(default)]
    pub graph_execution_trace_index: Option<usize>,
}

/// A traced function was recompiled more often than expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecompilesAlert {
    pub function_name: String,
    pub num_compiles: u32,
}

/// A tensor shape changed unexpectedly between executions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorShapeAlert {
    pub op_type: String,
    pub output_slot: u32,
    #[serde(default)]
    pub execution_index: Option<usize>,
    #[serde(default)]
    pub graph_execution_trace_index: Option<usize>,
}

/// One alert, tagged by `alert_type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "alert_type")]
pub enum Alert {
    #[serde(rename = "FunctionRecompilesAlert")]
    FunctionRecompiles(FunctionRecompilesAlert),
    #[serde(rename = "InfNanAlert")]
    InfNan(InfNanAlert),
    #[serde(rename = "TensorShapeAlert")]
    TensorShape(TensorShapeAlert),
}

impl Alert {
    #[must_use]
    pub const fn alert_type(&self) -> AlertType {
        match self {
            Self::FunctionRecompiles(_) => AlertType::FunctionRecompiles,
            Self::InfNan(_) => AlertType::InfNan,
            Self::TensorShape(_) => AlertType::TensorShape,
        }
    }

    /// Absolute top-level execution index this alert points at, if any.
    #[must_use]
    pub fn execution_index(&self) -> Option<usize> {
        match self {
            Self::InfNan(a) => Some(a.execution_index),
            Self::TensorShape(a) => a.execution_index,
            Self::FunctionRecompiles(_) => None,
        }
    }

    /// Correlated intra-graph execution index, if any.
    #[must_use]
    pub fn graph_execution_index(&self) -> Option<usize> {
        match self {
            Self::InfNan(a) => a.graph_execution_trace_index,
            Self::TensorShape(a) => a.graph_execution_trace_index,
            Self::FunctionRecompiles(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inf_nan_alert_from_wire() {
        let alert: Alert = serde_json::from_str(
            r#"{"alert_type":"InfNanAlert","op_type":"Log","output_slot":0,"size":8,
                "num_neg_inf":1,"num_pos_inf":0,"num_nan":2,"execution_index":10,
                "graph_execution_trace_index":null}"#,
        )
        .unwrap();
        assert_eq!(alert.alert_type(), AlertType::InfNan);
        assert_eq!(alert.execution_index(), Some(10));
        assert_eq!(alert.graph_execution_index(), None);
    }

    #[test]
    fn recompile_alert_points_nowhere() {
        let alert = Alert::FunctionRecompiles(FunctionRecompilesAlert {
            function_name: "train_step".into(),
            num_compiles: 12,
        });
        assert_eq!(alert.execution_index(), None);
        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains("\"alert_type\":\"FunctionRecompilesAlert\""));
    }

    #[test]
    fn alert_type_names() {
        assert_eq!(AlertType::InfNan.to_string(), "InfNanAlert");
        let parsed: AlertType = serde_json::from_str("\"TensorShapeAlert\"").unwrap();
        assert_eq!(parsed, AlertType::TensorShape);
    }
}
