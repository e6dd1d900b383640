//! Panel OLS with absorbed entity and time effects

use log::debug;
use ndarray::{Array1, Array2, Axis};
use po_core::PanelError;
use po_core::data::DataFrame;
use po_core::panel::{CategoricalExpander, PanelInput, TabularPanel, align};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

use super::effects::{SingletonFilter, WithinTransformer};
use super::result::{FitDiagnostics, PanelEffectsResult};
use super::{ClusterBy, CovarianceType, Effects, PanelConfig, covariance, ols};
use crate::base::{Coefficient, DegreesOfFreedom, ModelError, ModelStatistics, Result};

/// Name of the constant column
pub const INTERCEPT_NAME: &str = "const";

/// Fixed-effects panel regression model
///
/// The model only holds its inputs and configuration; [`PanelOls::fit`]
/// borrows it immutably and returns a fresh result, so a single model can be
/// fitted from several threads at once.
#[derive(Debug, Clone)]
pub struct PanelOls {
    dependent: PanelInput,
    exog: PanelInput,
    config: PanelConfig,
}

impl PanelOls {
    /// Create a model from a dependent and an independent input
    pub fn new(dependent: impl Into<PanelInput>, exog: impl Into<PanelInput>) -> Self {
        Self {
            dependent: dependent.into(),
            exog: exog.into(),
            config: PanelConfig::default(),
        }
    }

    /// Create a model from one table, using every non-key column besides
    /// `dependent` as a regressor
    pub fn from_frame(frame: DataFrame, entity: &str, time: &str, dependent: &str) -> Result<Self> {
        let (dependent, exog) = TabularPanel::new(frame, entity, time)?.split_dependent(dependent)?;
        Ok(Self::new(dependent, exog))
    }

    /// Set configuration
    pub fn config(mut self, config: PanelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn entity_effects(mut self, yes: bool) -> Self {
        self.config.entity_effects = yes;
        self
    }

    pub fn time_effects(mut self, yes: bool) -> Self {
        self.config.time_effects = yes;
        self
    }

    pub fn cov_type(mut self, cov_type: CovarianceType) -> Self {
        self.config.cov_type = cov_type;
        self
    }

    /// Use cluster-robust standard errors
    pub fn clustered(mut self, by: ClusterBy) -> Self {
        self.config = self.config.clustered(by);
        self
    }

    /// Include a constant
    pub fn intercept(mut self, yes: bool) -> Self {
        self.config.intercept = yes;
        self
    }

    pub fn get_config(&self) -> &PanelConfig {
        &self.config
    }

    /// Fit the model
    pub fn fit(&self) -> Result<PanelEffectsResult> {
        let config = &self.config;
        config.validate()?;
        let effects = config.effects();

        let dependent = self.dependent.clone().into_panel("dependent")?;
        let exog = self.exog.clone().into_panel("exog")?;
        let aligned = align(dependent, exog)?;

        let design = CategoricalExpander::new()
            .with_order(config.level_order)
            .with_drop_first(config.drop_first)
            .expand(aligned.n_obs(), aligned.regressors())?;
        let (mut names, x_full, expansion) = design.into_parts();
        if names.is_empty() && !config.intercept {
            return Err(PanelError::Shape {
                message: "no regressor columns left after categorical expansion".into(),
            }
            .into());
        }

        let singletons = SingletonFilter::apply(aligned.index(), effects);
        if singletons.keep.is_empty() {
            return Err(PanelError::InsufficientData {
                message: "no observations survive singleton removal".into(),
            }
            .into());
        }
        let index = aligned.index().subset(&singletons.keep)?;
        let y = aligned.dependent().select(Axis(0), &singletons.keep);
        let x = x_full.select(Axis(0), &singletons.keep);

        let transformer = WithinTransformer::new(&index, effects)
            .with_tolerance(config.demean_tolerance)
            .with_max_iter(config.max_iter);

        let n = index.len();
        let k = names.len() + usize::from(config.intercept);
        let mut absorbed = transformer.absorbed_df();
        if config.intercept && !effects.is_none() {
            // the constant takes over one of the absorbed levels
            absorbed -= 1;
        }
        if n <= k + absorbed {
            return Err(ModelError::InsufficientData {
                n_obs: n,
                n_params: k,
                absorbed,
            });
        }
        let df_resid = n - k - absorbed;

        let demeaned = transformer.transform(&y, &x);
        if !demeaned.converged {
            return Err(ModelError::numerical(
                format!(
                    "two-way demeaning did not reach tolerance {} within {} iterations",
                    config.demean_tolerance, config.max_iter
                ),
                "demean",
            ));
        }
        let absorbed_columns = transformer.absorbed_columns(&x, &demeaned.x);
        if !absorbed_columns.is_empty() {
            return Err(ModelError::RankDeficiency {
                columns: absorbed_columns.iter().map(|&j| names[j].clone()).collect(),
                rank: k - absorbed_columns.len(),
                ncols: k,
            });
        }

        let (wy, wx) = if config.intercept {
            names.insert(0, INTERCEPT_NAME.to_string());
            with_intercept(&y, &x, demeaned.y, demeaned.x, effects)
        } else {
            (demeaned.y, demeaned.x)
        };

        let solution = ols::solve(&wx, &wy, &names, config.rank_tolerance)?;
        let fitted_values = wx.dot(&solution.params);
        let residuals = &wy - &fitted_values;

        let cov = match config.cov_type {
            CovarianceType::Classic => covariance::classic(&solution.xtx_inv, residuals.view(), df_resid),
            CovarianceType::Robust => covariance::robust(
                &wx,
                residuals.view(),
                &solution.xtx_inv,
                df_resid,
                config.debiased,
            ),
            CovarianceType::Clustered => {
                let (clusters, n_clusters) = match config.cluster_by {
                    ClusterBy::Entity => (index.entity_codes(), index.n_entities()),
                    ClusterBy::Time => (index.time_codes(), index.n_times()),
                };
                covariance::clustered(
                    &wx,
                    residuals.view(),
                    &solution.xtx_inv,
                    clusters,
                    n_clusters,
                    config.debiased,
                )?
            }
        };

        let std_errors = cov.diag().mapv(|v| v.max(0.0).sqrt());
        let t_stats = &solution.params / &std_errors;
        let t_dist = StudentsT::new(0.0, 1.0, df_resid as f64)
            .map_err(|e| ModelError::numerical(format!("failed to create t-distribution: {}", e), "inference"))?;
        let p_values = t_stats.mapv(|t| two_sided_p(&t_dist, t));
        let t_critical = t_dist.inverse_cdf(1.0 - (1.0 - config.confidence_level) / 2.0);
        let ci_lower = &solution.params - &(&std_errors * t_critical);
        let ci_upper = &solution.params + &(&std_errors * t_critical);

        let coefficients: Vec<Coefficient> = (0..names.len())
            .map(|j| {
                let coef = Coefficient::new(names[j].clone(), solution.params[j])
                    .with_std_error(std_errors[j])
                    .with_p_value(p_values[j])
                    .with_ci(ci_lower[j], ci_upper[j]);
                if config.intercept && j == 0 {
                    coef.as_intercept()
                } else {
                    coef
                }
            })
            .collect();

        let df = DegreesOfFreedom {
            n_obs: n,
            n_params: k,
            absorbed,
            residual: df_resid,
            model: k - usize::from(config.intercept),
            n_entities: index.n_entities(),
            n_times: index.n_times(),
        };
        let centered = config.intercept || !effects.is_none();
        let statistics = fit_statistics(&wy, &residuals, &df, centered)?;
        debug!(
            "fitted panel OLS: {} observations, {} parameters, {} absorbed, R² {:?}",
            n, k, absorbed, statistics.r_squared
        );

        let diagnostics = FitDiagnostics {
            n_missing_dropped: aligned.n_dropped(),
            dropped_singletons: singletons.dropped,
            expansion,
            iterations: demeaned.iterations,
            condition_number: solution.condition_number(),
        };

        Ok(PanelEffectsResult {
            names,
            params: solution.params,
            cov,
            std_errors,
            t_stats,
            p_values,
            ci_lower,
            ci_upper,
            coefficients,
            dependent_name: aligned.dependent_name().to_string(),
            demeaned_dependent: wy,
            fitted_values,
            residuals,
            effects,
            df,
            statistics,
            diagnostics,
            config: config.clone(),
        })
    }
}

/// Prepend the constant; with absorbed effects the grand means are added
/// back so the constant estimates the average effect
fn with_intercept(
    y: &Array1<f64>,
    x: &Array2<f64>,
    wy: Array1<f64>,
    wx: Array2<f64>,
    effects: Effects,
) -> (Array1<f64>, Array2<f64>) {
    let n = wx.nrows();
    let (wy, wx) = if effects.is_none() {
        (wy, wx)
    } else {
        let y_mean = y.mean().unwrap_or(0.0);
        let x_means = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        (wy + y_mean, wx + &x_means)
    };

    let mut design = Array2::ones((n, wx.ncols() + 1));
    design.slice_mut(ndarray::s![.., 1..]).assign(&wx);
    (wy, design)
}

fn two_sided_p(dist: &StudentsT, t: f64) -> f64 {
    if t.is_nan() {
        f64::NAN
    } else if t.is_infinite() {
        0.0
    } else {
        (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0)
    }
}

fn fit_statistics(
    wy: &Array1<f64>,
    residuals: &Array1<f64>,
    df: &DegreesOfFreedom,
    centered: bool,
) -> Result<ModelStatistics> {
    let n = df.n_obs as f64;
    let rss = residuals.dot(residuals);
    let center = if centered { wy.mean().unwrap_or(0.0) } else { 0.0 };
    let tss = wy.mapv(|v| (v - center).powi(2)).sum();

    let r_squared = (tss > 0.0).then(|| 1.0 - rss / tss);
    let df_total = if centered { n - 1.0 } else { n };
    let adj_r_squared = r_squared.map(|r2| 1.0 - (1.0 - r2) * df_total / df.residual as f64);
    let residual_std_error = (rss / df.residual as f64).sqrt();

    let (f_statistic, f_p_value) = if df.model == 0 || tss <= 0.0 {
        (None, None)
    } else {
        let explained = (tss - rss).max(0.0) / df.model as f64;
        let f = explained / (rss / df.residual as f64);
        let dist = FisherSnedecor::new(df.model as f64, df.residual as f64)
            .map_err(|e| ModelError::numerical(format!("failed to create F-distribution: {}", e), "f_statistic"))?;
        let p = if f.is_finite() { 1.0 - dist.cdf(f) } else { 0.0 };
        (Some(f), Some(p))
    };

    let log_likelihood = (rss > 0.0)
        .then(|| -0.5 * n * ((2.0 * std::f64::consts::PI * rss / n).ln() + 1.0));
    let params = df.n_params as f64;
    let aic = log_likelihood.map(|ll| 2.0 * params - 2.0 * ll);
    let bic = log_likelihood.map(|ll| n.ln() * params - 2.0 * ll);

    Ok(ModelStatistics {
        rss,
        tss,
        r_squared,
        adj_r_squared,
        residual_std_error,
        f_statistic,
        f_p_value,
        log_likelihood,
        aic,
        bic,
    })
}
