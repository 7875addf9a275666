//! Conversion-factor service
//!
//! Builds a factor problem from the month's counts, the reconciled targets
//! and the configuration groups, solves it, and optionally saves the result.

use std::collections::BTreeMap;
use std::sync::Arc;

use minetally_domain::constants::SOLVER_CONSTRAINTS;
use minetally_domain::{
    ConfigGroup, EquipmentKind, FactorPair, FactorSolution, MetricKey, MinetallyError,
    MonthlyFactorResult, ReconciliationKey, ReconciliationRecord, ReportingMonth, Result,
    SolveRequest, SolvedConfig, SolverConfig, UnitCounts,
};
use rust_decimal::prelude::ToPrimitive;
use tracing::{info, instrument, warn};

use super::counts::{source_activity, unit_counts};
use super::ports::{FactorRepository, FactorTransaction};
use super::solver::{solve_factors, FactorProblem, SolverSettings};

pub struct FactorService {
    repository: Arc<dyn FactorRepository>,
    config: SolverConfig,
}

/// Configuration code with its merged settings and member units.
struct Column {
    group: ConfigGroup,
    prior: f64,
    lower: f64,
    upper: f64,
    units: Vec<UnitCounts>,
}

impl Column {
    fn counts(&self) -> FactorPair {
        self.units.iter().fold(FactorPair::default(), |acc, u| {
            FactorPair::new(acc.production + u.prod_count, acc.development + u.dev_count)
        })
    }
}

impl FactorService {
    pub fn new(repository: Arc<dyn FactorRepository>) -> Self {
        Self::with_config(repository, SolverConfig::default())
    }

    pub fn with_config(repository: Arc<dyn FactorRepository>, config: SolverConfig) -> Self {
        Self { repository, config }
    }

    /// Solve the factors for one site, month and equipment kind.
    ///
    /// A preview (`save == false`) never writes. A save persists the group
    /// definitions, the month's assignment table and the per-unit results in
    /// the same transaction that read the targets, and is rejected when a
    /// target reconciliation is locked.
    #[instrument(skip(self, request), fields(site = %request.site_id, month = %request.month, kind = %request.kind, save = request.save))]
    pub fn solve(&self, request: &SolveRequest) -> Result<FactorSolution> {
        let regularization = request.regularization.unwrap_or(self.config.regularization);
        if !regularization.is_finite() || regularization < 0.0 {
            return Err(MinetallyError::InvalidInput(format!(
                "regularization must be a non-negative number, got {regularization}"
            )));
        }

        let mut tx = self.repository.begin()?;

        let (production_target, development_target) = self.targets(&*tx, request)?;
        let targets = FactorPair::new(
            decimal_to_f64(&production_target)?,
            decimal_to_f64(&development_target)?,
        );

        let activities =
            tx.month_activities(&request.site_id, request.month, source_activity(request.kind))?;
        let counts = unit_counts(&activities, request.kind, self.config.count_basis);
        if counts.is_empty() {
            return Err(MinetallyError::NoData(format!(
                "no {} counts for {} in {}",
                source_activity(request.kind),
                request.site_id,
                request.month
            )));
        }

        let assignments = self.assignments(&*tx, request, &counts)?;
        let columns = self.columns(&*tx, request, &assignments, counts)?;

        let problem = FactorProblem {
            columns: columns.iter().map(Column::counts).collect(),
            targets,
            prior: columns.iter().map(|c| c.prior).collect(),
            lower: columns.iter().map(|c| c.lower).collect(),
            upper: columns.iter().map(|c| c.upper).collect(),
            regularization,
        };
        let settings = SolverSettings {
            max_iterations: self.config.max_iterations,
            tolerance: self.config.tolerance,
        };
        let outcome = solve_factors(&problem, &settings);
        let predicted = problem.predict(&outcome.factors);

        let mut solution = FactorSolution {
            site_id: request.site_id.clone(),
            month: request.month,
            kind: request.kind,
            configs: Vec::with_capacity(columns.len()),
            units: Vec::new(),
            targets,
            predicted,
            residuals: predicted.minus(&targets),
            underdetermined: columns.len() > SOLVER_CONSTRAINTS,
            iterations: outcome.iterations,
            converged: outcome.converged,
            saved: false,
        };
        for (column, &factor) in columns.iter().zip(&outcome.factors) {
            let counts = column.counts();
            solution.configs.push(SolvedConfig {
                code: column.group.code.clone(),
                factor,
                prior: column.prior,
                min_factor: column.lower,
                max_factor: column.upper.is_finite().then_some(column.upper),
                locked: column.group.locked,
                unit_ids: column.units.iter().map(|u| u.unit_id.clone()).collect(),
                prod_count: counts.production,
                dev_count: counts.development,
            });
            solution.units.extend(column.units.iter().map(|unit| MonthlyFactorResult {
                site_id: request.site_id.clone(),
                month: request.month,
                unit_id: unit.unit_id.clone(),
                equipment_kind: request.kind,
                config_code: column.group.code.clone(),
                factor,
                prod_count: unit.prod_count,
                dev_count: unit.dev_count,
                prod_tonnes_pred: unit.prod_count * factor,
                dev_tonnes_pred: unit.dev_count * factor,
            }));
        }
        solution.units.sort_by(|a, b| a.unit_id.cmp(&b.unit_id));

        if solution.underdetermined {
            warn!(configs = columns.len(), "more configurations than constraints; factors lean on priors");
        }
        if !solution.converged {
            warn!(iterations = solution.iterations, "solver stopped at its iteration cap");
        }

        if request.save {
            ensure_targets_open(&[&production_target, &development_target])?;
            for column in &columns {
                tx.upsert_config_group(&column.group)?;
            }
            tx.replace_assignments(&request.site_id, request.month, request.kind, &assignments)?;
            tx.replace_results(&request.site_id, request.month, request.kind, &solution.units)?;
            tx.commit()?;
            solution.saved = true;
        }

        info!(
            configs = solution.configs.len(),
            units = solution.units.len(),
            residual_prod = solution.residuals.production,
            residual_dev = solution.residuals.development,
            saved = solution.saved,
            "factors solved"
        );
        Ok(solution)
    }

    pub fn saved_results(
        &self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
    ) -> Result<Vec<MonthlyFactorResult>> {
        self.repository.saved_results(site_id, month, kind)
    }

    pub fn config_groups(&self, site_id: &str, kind: EquipmentKind) -> Result<Vec<ConfigGroup>> {
        self.repository.config_groups(site_id, kind)
    }

    fn targets(
        &self,
        tx: &(dyn FactorTransaction + '_),
        request: &SolveRequest,
    ) -> Result<(ReconciliationRecord, ReconciliationRecord)> {
        let metrics = self.config.targets_for(request.kind);
        let find = |metric: MetricKey| -> Result<ReconciliationRecord> {
            let key = ReconciliationKey::new(request.site_id.clone(), request.month, metric);
            tx.find_target(&key)?.ok_or_else(|| {
                MinetallyError::MissingTarget(format!(
                    "no reconciled total for {key}; reconcile it before solving"
                ))
            })
        };
        Ok((find(metrics.production.clone())?, find(metrics.development.clone())?))
    }

    /// Explicit assignments, then the month's saved table, then each unit as
    /// its own group.
    fn assignments(
        &self,
        tx: &(dyn FactorTransaction + '_),
        request: &SolveRequest,
        counts: &[UnitCounts],
    ) -> Result<BTreeMap<String, String>> {
        let saved = tx.month_assignments(&request.site_id, request.month, request.kind)?;
        Ok(counts
            .iter()
            .map(|unit| {
                let code = request
                    .assignments
                    .get(&unit.unit_id)
                    .or_else(|| saved.get(&unit.unit_id))
                    .cloned()
                    .unwrap_or_else(|| unit.unit_id.clone());
                (unit.unit_id.clone(), code)
            })
            .collect())
    }

    fn columns(
        &self,
        tx: &(dyn FactorTransaction + '_),
        request: &SolveRequest,
        assignments: &BTreeMap<String, String>,
        counts: Vec<UnitCounts>,
    ) -> Result<Vec<Column>> {
        let mut members: BTreeMap<String, Vec<UnitCounts>> = BTreeMap::new();
        for unit in counts {
            let code = assignments.get(&unit.unit_id).cloned().unwrap_or_else(|| unit.unit_id.clone());
            members.entry(code).or_default().push(unit);
        }

        let site_groups: BTreeMap<String, ConfigGroup> = tx
            .config_groups(&request.site_id, request.kind)?
            .into_iter()
            .map(|group| (group.code.clone(), group))
            .collect();

        members
            .into_iter()
            .map(|(code, units)| {
                let mut group = site_groups
                    .get(&code)
                    .cloned()
                    .unwrap_or_else(|| ConfigGroup::new(request.site_id.clone(), code.clone(), request.kind));
                for o in request.overrides.iter().filter(|o| o.code == code) {
                    group.apply(o);
                }
                group.validate()?;

                let prior = match group.estimate_factor {
                    Some(estimate) => estimate,
                    None => tx
                        .latest_factor_before(&request.site_id, request.kind, &code, request.month)?
                        .unwrap_or(0.0),
                };
                let (lower, upper) = if group.locked {
                    (prior, prior)
                } else {
                    (group.min_factor.unwrap_or(0.0), group.max_factor.unwrap_or(f64::INFINITY))
                };
                if lower > upper {
                    return Err(MinetallyError::InvalidBounds(format!(
                        "config {code}: min {lower} exceeds max {upper}"
                    )));
                }

                Ok(Column { group, prior, lower, upper, units })
            })
            .collect()
    }
}

fn decimal_to_f64(record: &ReconciliationRecord) -> Result<f64> {
    record.reconciled_total.to_f64().ok_or_else(|| {
        MinetallyError::Internal(format!(
            "reconciled total {} of {} does not fit an f64",
            record.reconciled_total, record.key
        ))
    })
}

fn ensure_targets_open(targets: &[&ReconciliationRecord]) -> Result<()> {
    for target in targets {
        if target.is_locked {
            warn!(key = %target.key, "save rejected: target reconciliation is locked");
            return Err(MinetallyError::LockedReconciliation(format!(
                "month is closed: reconciliation {} is locked",
                target.key
            )));
        }
    }
    Ok(())
}
