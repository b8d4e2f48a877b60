//! Explicit report registry: id → state + artifact paths.
//!
//! The registry is the single serialization authority per report. All
//! transition guards live here, behind one lock, so a second concurrent
//! check or generate against the same id is rejected, never interleaved.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use uuid::Uuid;

use crate::extraction::ConsistencyResult;

use super::types::{Report, ReportState};
use super::ReportError;

pub struct ReportRegistry {
    root: PathBuf,
    reports: RwLock<HashMap<Uuid, Report>>,
}

impl ReportRegistry {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            reports: RwLock::new(HashMap::new()),
        }
    }

    /// Root of the id-scoped artifact namespaces.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn namespace(&self, id: &Uuid) -> PathBuf {
        super::intake::namespace_dir(&self.root, id)
    }

    pub fn insert(&self, report: Report) -> Result<Uuid, ReportError> {
        let id = report.id;
        let mut reports = self.reports.write().map_err(|_| ReportError::LockPoisoned)?;
        reports.insert(id, report);
        Ok(id)
    }

    /// Snapshot of a report's current record.
    pub fn get(&self, id: &Uuid) -> Result<Report, ReportError> {
        let reports = self.reports.read().map_err(|_| ReportError::LockPoisoned)?;
        reports.get(id).cloned().ok_or(ReportError::NotFound(*id))
    }

    /// Transition to Checking, discarding the prior check result.
    ///
    /// Rejected while an operation is in flight (`Busy`) or from states
    /// the FSM does not allow a check from.
    pub fn begin_check(&self, id: &Uuid) -> Result<Report, ReportError> {
        let mut reports = self.reports.write().map_err(|_| ReportError::LockPoisoned)?;
        let report = reports.get_mut(id).ok_or(ReportError::NotFound(*id))?;
        if report.state.in_flight() {
            return Err(ReportError::Busy(*id));
        }
        if !report.state.can_check() {
            return Err(ReportError::Validation(format!(
                "check not allowed from state {:?}",
                report.state
            )));
        }
        report.last_check = None;
        report.set_state(ReportState::Checking);
        Ok(report.clone())
    }

    /// Transition to Generating. Only a Good report qualifies; anything
    /// else is rejected here with no side effects and no external task.
    pub fn begin_generate(&self, id: &Uuid) -> Result<Report, ReportError> {
        let mut reports = self.reports.write().map_err(|_| ReportError::LockPoisoned)?;
        let report = reports.get_mut(id).ok_or(ReportError::NotFound(*id))?;
        if report.state.in_flight() {
            return Err(ReportError::Busy(*id));
        }
        if !report.state.can_generate() {
            return Err(ReportError::ConsistencyBlocked {
                state: report.state,
            });
        }
        report.set_state(ReportState::Generating);
        Ok(report.clone())
    }

    /// Settle a completed check: record the result, leave the
    /// corresponding outcome state.
    pub fn settle_check(
        &self,
        id: &Uuid,
        result: ConsistencyResult,
    ) -> Result<ConsistencyResult, ReportError> {
        let mut reports = self.reports.write().map_err(|_| ReportError::LockPoisoned)?;
        let report = reports.get_mut(id).ok_or(ReportError::NotFound(*id))?;
        report.set_state(ReportState::from_check(result.status));
        report.last_check = Some(result.clone());
        Ok(result)
    }

    /// Settle a generate attempt (Ready with the final artifact, or
    /// GenerateError / back to Good for retryable saturation).
    pub fn settle_generate(
        &self,
        id: &Uuid,
        state: ReportState,
        final_artifact: Option<PathBuf>,
    ) -> Result<(), ReportError> {
        let mut reports = self.reports.write().map_err(|_| ReportError::LockPoisoned)?;
        let report = reports.get_mut(id).ok_or(ReportError::NotFound(*id))?;
        report.final_artifact = final_artifact;
        report.set_state(state);
        Ok(())
    }

    /// Delete all artifacts for an id and invalidate it. Idempotent:
    /// cleaning an already-cleaned (or unknown) report succeeds.
    /// Rejected only while an operation is in flight.
    pub fn cleanup(&self, id: &Uuid) -> Result<bool, ReportError> {
        let mut reports = self.reports.write().map_err(|_| ReportError::LockPoisoned)?;
        if let Some(report) = reports.get_mut(id) {
            if report.state.in_flight() {
                return Err(ReportError::Busy(*id));
            }
            report.final_artifact = None;
            report.last_check = None;
            report.set_state(ReportState::CleanedUp);
        }

        let namespace = super::intake::namespace_dir(&self.root, id);
        match std::fs::remove_dir_all(&namespace) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!(report_id = %id, "report cleaned up");
        Ok(true)
    }
}
