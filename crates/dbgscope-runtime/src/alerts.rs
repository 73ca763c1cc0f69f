#![forbid(unsafe_code)]

//! Alert slice.
//!
//! Alerts arrive per type in ordinal ranges. For each type the slice keeps
//! the alerts by ordinal and an index from ordinal to the top-level (and,
//! when known, intra-graph) execution the alert points at. Entries are
//! never overwritten once loaded.

use std::collections::{BTreeMap, BTreeSet};

use dbgscope_core::{Alert, AlertType, LoadState, ViewError, ViewResult};

use crate::msg::AlertsBreakdown;

/// Where an alert batch asks the session to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AlertJump {
    pub execution_index: usize,
    pub graph_execution_index: Option<usize>,
}

/// Alerts of the active run.
#[derive(Debug, Clone, Default)]
pub struct AlertsState {
    load: LoadState,
    breakdown: AlertsBreakdown,
    alerts: BTreeMap<AlertType, BTreeMap<usize, Alert>>,
    execution_indices: BTreeMap<AlertType, BTreeMap<usize, usize>>,
    graph_execution_indices: BTreeMap<AlertType, BTreeMap<usize, usize>>,
    focus_type: Option<AlertType>,
    in_flight: BTreeSet<AlertType>,
}

impl AlertsState {
    #[must_use]
    pub fn load(&self) -> LoadState {
        self.load
    }

    #[must_use]
    pub fn num_alerts(&self) -> usize {
        self.breakdown.num_alerts
    }

    #[must_use]
    pub fn breakdown(&self) -> &BTreeMap<AlertType, usize> {
        &self.breakdown.per_type
    }

    #[must_use]
    pub fn focus_type(&self) -> Option<AlertType> {
        self.focus_type
    }

    /// Loaded alerts of `alert_type`, by ordinal.
    #[must_use]
    pub fn alerts_of_type(&self, alert_type: AlertType) -> Option<&BTreeMap<usize, Alert>> {
        self.alerts.get(&alert_type)
    }

    /// Ordinal to top-level execution index, for `alert_type`.
    #[must_use]
    pub fn execution_indices(&self, alert_type: AlertType) -> Option<&BTreeMap<usize, usize>> {
        self.execution_indices.get(&alert_type)
    }

    /// Ordinal to intra-graph execution index, for `alert_type`.
    #[must_use]
    pub fn graph_execution_indices(
        &self,
        alert_type: AlertType,
    ) -> Option<&BTreeMap<usize, usize>> {
        self.graph_execution_indices.get(&alert_type)
    }

    /// Number of alerts of the focused type, loaded or not. 0 without focus.
    #[must_use]
    pub fn num_alerts_of_focused_type(&self) -> usize {
        self.focus_type
            .and_then(|t| self.breakdown.per_type.get(&t).copied())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn loaded_alerts_of_focused_type(&self) -> Option<&BTreeMap<usize, Alert>> {
        self.focus_type.and_then(|t| self.alerts.get(&t))
    }

    /// The focused type at each index of `range`, or `None` for indices
    /// without an alert of that type.
    #[must_use]
    pub fn focus_types_for(&self, range: std::ops::Range<usize>) -> Vec<Option<AlertType>> {
        let len = range.len();
        let Some(focus) = self.focus_type else {
            return vec![None; len];
        };
        let Some(indices) = self.execution_indices.get(&focus) else {
            return vec![None; len];
        };
        let hits: BTreeSet<usize> = indices
            .values()
            .copied()
            .filter(|i| range.contains(i))
            .collect();
        range
            .map(|i| hits.contains(&i).then_some(focus))
            .collect()
    }

    /// Execution index of the first known alert of `alert_type`.
    #[must_use]
    pub fn first_execution_index(&self, alert_type: AlertType) -> Option<usize> {
        self.execution_indices
            .get(&alert_type)
            .and_then(|m| m.first_key_value())
            .map(|(_, &i)| i)
    }

    pub(crate) fn start_loading(&mut self) {
        self.load.start_loading();
    }

    pub(crate) fn on_failed(&mut self, alert_type: Option<AlertType>) {
        if let Some(t) = alert_type {
            self.in_flight.remove(&t);
        }
        self.load.fail();
    }

    /// Returns whether the total alert count grew.
    pub(crate) fn on_breakdown(&mut self, breakdown: AlertsBreakdown, now_ms: u64) -> bool {
        let grew = breakdown.num_alerts > self.breakdown.num_alerts;
        self.breakdown = breakdown;
        self.load.finish_loading(now_ms);
        grew
    }

    /// Flip the focused type. Returns the new focus.
    pub(crate) fn toggle_focus(&mut self, alert_type: AlertType) -> Option<AlertType> {
        self.focus_type = if self.focus_type == Some(alert_type) {
            None
        } else {
            Some(alert_type)
        };
        self.focus_type
    }

    /// Range of alerts to fetch for `alert_type`, if none are loaded or in
    /// flight and the breakdown says some exist. Marks the type in flight.
    pub(crate) fn request_of_type(&mut self, alert_type: AlertType) -> Option<(usize, usize)> {
        let count = self.breakdown.per_type.get(&alert_type).copied().unwrap_or(0);
        if count == 0 || self.alerts.contains_key(&alert_type) {
            return None;
        }
        if !self.in_flight.insert(alert_type) {
            return None;
        }
        self.load.start_loading();
        Some((0, count))
    }

    /// Check an alert batch without touching state.
    pub(crate) fn check_batch(begin: usize, end: usize, alerts: &[Alert]) -> ViewResult<()> {
        if begin > end || alerts.len() != end - begin {
            return Err(ViewError::InvalidArgument(format!(
                "alert batch [{begin}, {end}) carries {} alerts",
                alerts.len()
            )));
        }
        Ok(())
    }

    /// Merge a checked batch. Returns where to jump when this is the first
    /// batch of its type and the first alert points at an execution.
    pub(crate) fn merge_batch(
        &mut self,
        alert_type: AlertType,
        begin: usize,
        breakdown: AlertsBreakdown,
        alerts: Vec<Alert>,
        now_ms: u64,
    ) -> Option<AlertJump> {
        let jump = if begin == 0 {
            alerts.first().and_then(|a| {
                a.execution_index().map(|execution_index| AlertJump {
                    execution_index,
                    graph_execution_index: a.graph_execution_index(),
                })
            })
        } else {
            None
        };

        let by_ordinal = self.alerts.entry(alert_type).or_default();
        let exec_indices = self.execution_indices.entry(alert_type).or_default();
        let graph_indices = self.graph_execution_indices.entry(alert_type).or_default();
        for (ordinal, alert) in (begin..).zip(alerts) {
            if by_ordinal.contains_key(&ordinal) {
                continue;
            }
            if let Some(i) = alert.execution_index() {
                exec_indices.insert(ordinal, i);
            }
            if let Some(g) = alert.graph_execution_index() {
                graph_indices.insert(ordinal, g);
            }
            by_ordinal.insert(ordinal, alert);
        }

        self.breakdown = breakdown;
        self.in_flight.remove(&alert_type);
        self.load.finish_loading(now_ms);
        jump
    }
}
