//! Solver invocation: hands a compiled model to `good_lp`'s embedded
//! `microlp` backend and enforces the wall-clock time limit.

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::time::Duration;

use good_lp::{Solution, SolverModel};

use crate::error::{Result, ScheduleError};
use crate::model::CompiledModel;

/// The decoded solution: patient counts and visit indicators per
/// (facility, day), keyed the same way as [`CompiledModel::x`]/`z`.
pub struct SolveOutcome {
    pub x: BTreeMap<(usize, usize), u32>,
    pub z: BTreeMap<(usize, usize), bool>,
    pub objective_value: f64,
}

/// Solves `model`, aborting if no incumbent is found within `time_limit`.
///
/// `microlp` has no native deadline hook, so the solve runs on a worker
/// thread and this function joins it with a timeout. A run that
/// overruns the deadline is reported as [`ScheduleError::TimeLimitNoIncumbent`];
/// the worker thread is left to finish and is dropped silently.
pub fn solve(model: CompiledModel, time_limit: Duration) -> Result<SolveOutcome> {
    let span = tracing::debug_span!("solve::solve", day_count = model.day_count);
    let _enter = span.enter();

    let CompiledModel {
        vars,
        objective,
        rows,
        x,
        z,
        ..
    } = model;

    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut problem = vars.minimise(objective.clone()).using(good_lp::microlp);
        for row in rows {
            problem = problem.with(row);
        }
        let result = problem.solve();
        let _ = tx.send(result.map(|solution| {
            let x_values = x
                .iter()
                .map(|(&key, &v)| (key, solution.value(v).round().max(0.0) as u32))
                .collect();
            let z_values = z
                .iter()
                .map(|(&key, &v)| (key, solution.value(v) > 0.5))
                .collect();
            let objective_value = solution.eval(&objective);
            (x_values, z_values, objective_value)
        }));
    });

    let outcome = match rx.recv_timeout(time_limit) {
        Ok(Ok((x, z, objective_value))) => {
            tracing::info!(objective_value, "solve succeeded");
            SolveOutcome {
                x,
                z,
                objective_value,
            }
        }
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "solve failed");
            return Err(map_resolution_error(err));
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::warn!(?time_limit, "solve exceeded wall-clock limit");
            return Err(ScheduleError::TimeLimitNoIncumbent(time_limit));
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            return Err(ScheduleError::SolverOther(
                "solver worker thread terminated without a result".to_string(),
            ));
        }
    };

    Ok(outcome)
}

fn map_resolution_error(err: good_lp::ResolutionError) -> ScheduleError {
    match err {
        good_lp::ResolutionError::Infeasible => ScheduleError::Infeasible,
        good_lp::ResolutionError::Unbounded => ScheduleError::Unbounded,
        other => ScheduleError::SolverOther(other.to_string()),
    }
}
