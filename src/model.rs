//! MIP builder: translates the compiled domain/constraint inputs into a
//! `good_lp` mixed-integer program.

use std::collections::BTreeMap;

use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Variable};

use crate::constraints::CompiledConstraints;
use crate::domain::Catalog;
use crate::preflight::PreflightReport;

/// Fixed scaling constant linking workload to travel in the objective
/// (hours per patient).
pub const T_BAR_HOURS_PER_PATIENT: f64 = 0.025;

/// The default bunching window, in working days (~1 week). Unlike the
/// sparse-visit window, this is not caller-configurable.
pub const DEFAULT_BUNCHING_WINDOW: usize = 7;

/// Tunable solve parameters that are not derived from the catalog or
/// horizon.
#[derive(Debug, Clone, Copy)]
pub struct ModelOptions {
    pub max_patients_per_day: u32,
    pub lambda_param: f64,
    pub lambda_facility: f64,
    pub lambda_bunching: f64,
    pub facility_visit_window: usize,
}

/// A fully built MIP, ready to hand to the solver. Carries the variable
/// handles the post-processor needs to read back a solution.
pub struct CompiledModel {
    pub vars: ProblemVariables,
    pub objective: Expression,
    pub rows: Vec<Constraint>,
    pub x: BTreeMap<(usize, usize), Variable>,
    pub z: BTreeMap<(usize, usize), Variable>,
    pub day_count: usize,
    pub assigned_facilities: Vec<usize>,
}

fn expr_sum(vars: impl IntoIterator<Item = Variable>) -> Expression {
    vars.into_iter().map(Expression::from).sum()
}

/// Builds the MIP for one provider's horizon.
pub fn build(
    catalog: &Catalog,
    provider_idx: usize,
    day_count: usize,
    preflight: &PreflightReport,
    compiled: &CompiledConstraints,
    options: &ModelOptions,
) -> CompiledModel {
    let span = tracing::debug_span!("model::build", provider_idx, day_count);
    let _enter = span.enter();

    let assigned_facilities = catalog.assigned_facilities(provider_idx);
    let forbidden: std::collections::HashSet<(usize, usize)> =
        compiled.forbidden_visits.iter().copied().collect();
    let max = options.max_patients_per_day as f64;

    let mut vars = ProblemVariables::new();

    // x[f,d]: integer patients in [0, M], only for assigned facilities.
    let mut x = BTreeMap::new();
    for &f in &assigned_facilities {
        for d in 0..day_count {
            let v = vars.add(variable().integer().min(0).max(max));
            x.insert((f, d), v);
        }
    }

    // y[d]: binary work-day indicator.
    let mut y = Vec::with_capacity(day_count);
    for _ in 0..day_count {
        y.push(vars.add(variable().integer().min(0).max(1)));
    }

    // z[f,d]: binary visit indicator; forbidden pairs are fixed at 0.
    let mut z = BTreeMap::new();
    for &f in &assigned_facilities {
        for d in 0..day_count {
            let upper = if forbidden.contains(&(f, d)) { 0.0 } else { 1.0 };
            let v = vars.add(variable().integer().min(0).max(upper));
            z.insert((f, d), v);
        }
    }

    // h[d]: continuous home-travel surrogate.
    let mut h = Vec::with_capacity(day_count);
    for _ in 0..day_count {
        h.push(vars.add(variable().min(0)));
    }

    // w[f1,f2,d]: binary pairwise-coincidence linearization, both orders.
    let mut w = BTreeMap::new();
    for &f1 in &assigned_facilities {
        for &f2 in &assigned_facilities {
            if f1 == f2 {
                continue;
            }
            for d in 0..day_count {
                let v = vars.add(variable().integer().min(0).max(1));
                w.insert((f1, f2, d), v);
            }
        }
    }

    let x_max = vars.add(variable().min(0));

    // s_gap[f,t], s_bun[f,t]: continuous slacks, one per facility-window.
    let mut s_gap = BTreeMap::new();
    let mut s_bun = BTreeMap::new();
    for &f in &assigned_facilities {
        for t in 0..day_count {
            s_gap.insert((f, t), vars.add(variable().min(0)));
            s_bun.insert((f, t), vars.add(variable().min(0)));
        }
    }

    let mut rows = Vec::new();

    // 1. Demand coverage (equality) for facilities with positive adjusted demand.
    for &f in &assigned_facilities {
        let r_f = *preflight.adjusted_demand.get(&f).unwrap_or(&0);
        if r_f == 0 {
            continue;
        }
        let sum_x = expr_sum((0..day_count).map(|d| x[&(f, d)]));
        rows.push(constraint!(sum_x == r_f as f64));
    }

    // 2. Daily cap.
    for d in 0..day_count {
        let sum_x = expr_sum(assigned_facilities.iter().map(|&f| x[&(f, d)]));
        rows.push(constraint!(sum_x <= max));
    }

    // 3. Work-day link.
    for d in 0..day_count {
        let sum_x = expr_sum(assigned_facilities.iter().map(|&f| x[&(f, d)]));
        rows.push(constraint!(sum_x <= max * y[d]));
    }

    // 4. Visit link.
    for &f in &assigned_facilities {
        for d in 0..day_count {
            rows.push(constraint!(x[&(f, d)] <= max * z[&(f, d)]));
        }
    }

    // 5. Availability.
    for &d in &compiled.unavailable_days {
        if d < day_count {
            rows.push(constraint!(y[d] == 0.0));
        }
    }

    // 6. Workload ceiling.
    for d in 0..day_count {
        let sum_x = expr_sum(assigned_facilities.iter().map(|&f| x[&(f, d)]));
        rows.push(constraint!(x_max >= sum_x));
    }

    // 7. Home-travel surrogate.
    for d in 0..day_count {
        for &f in &assigned_facilities {
            let home_time = catalog.home_travel_hours(provider_idx, f);
            if home_time > 0.0 {
                rows.push(constraint!(h[d] >= home_time * z[&(f, d)]));
            }
        }
    }

    // 8. Pair linearization.
    for (&(f1, f2, d), &w_var) in &w {
        rows.push(constraint!(w_var <= z[&(f1, d)]));
        rows.push(constraint!(w_var <= z[&(f2, d)]));
        rows.push(constraint!(w_var >= z[&(f1, d)] + z[&(f2, d)] - 1.0));
    }

    // 9. Sparse-visit (soft), wraparound window of T_gap days.
    let t_gap = options.facility_visit_window.max(1);
    for &f in &assigned_facilities {
        for t in 0..day_count {
            let window = expr_sum((0..t_gap).map(|j| z[&(f, (t + j) % day_count)]));
            rows.push(constraint!(window + s_gap[&(f, t)] >= 1.0));
        }
    }

    // 10. Bunching (soft), wraparound window of T_bun days.
    let t_bun = DEFAULT_BUNCHING_WINDOW.max(1);
    for &f in &assigned_facilities {
        for t in 0..day_count {
            let window = expr_sum((0..t_bun).map(|j| z[&(f, (t + j) % day_count)]));
            rows.push(constraint!(window - s_bun[&(f, t)] <= 1.0));
        }
    }

    // 11. Required visits.
    for &(f, d) in &compiled.required_visits {
        rows.push(constraint!(x[&(f, d)] >= 1.0));
    }
    // 12. Forbidden visits are encoded in z's upper bound at creation time.

    // Objective.
    let home_travel_term = expr_sum(h.iter().copied());

    let mut facility_travel_term = Expression::from(0.0);
    for (&(f1, f2, _d), &w_var) in &w {
        let travel = catalog.facility_travel_hours(f1, f2);
        if travel > 0.0 {
            facility_travel_term = facility_travel_term + w_var * travel;
        }
    }

    let workload_term = x_max * (options.lambda_param * T_BAR_HOURS_PER_PATIENT);

    let gap_term = expr_sum(s_gap.values().copied()) * options.lambda_facility;
    let bunching_term = expr_sum(s_bun.values().copied()) * options.lambda_bunching;

    let objective = home_travel_term + facility_travel_term + workload_term + gap_term + bunching_term;

    tracing::info!(
        variables = assigned_facilities.len() * day_count * 2 + day_count * 2,
        constraints = rows.len(),
        "model built"
    );

    CompiledModel {
        vars,
        objective,
        rows,
        x,
        z,
        day_count,
        assigned_facilities,
    }
}
