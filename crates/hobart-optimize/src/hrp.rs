//! Hierarchical risk parity
//!
//! Clusters assets by correlation distance, orders them so correlated
//! assets sit adjacent (quasi-diagonalization), then splits risk down the
//! cluster tree by recursive bisection. No covariance inversion anywhere,
//! which keeps the allocation well-defined on singular or ill-conditioned
//! covariance matrices where mean-variance breaks down.
//!
//! Two deliberate simplifications are preserved from the reference
//! behavior: bisection always splits a cluster at its midpoint, and a
//! cluster's variance is the mean of its diagonal covariance entries rather
//! than a minimum-variance sub-portfolio risk. Downstream numbers depend on
//! both.

use crate::error::OptimizeError;
use crate::optimizer::{OptimizationOutcome, PortfolioOptimizer};
use crate::solver;
use hobart_stats::{PortfolioWeights, ReturnsMatrix, SampleEstimates, portfolio_metrics};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Inter-cluster distance rule for agglomerative clustering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkageMethod {
    /// Minimum pairwise distance between clusters.
    #[default]
    Single,
    /// Maximum pairwise distance between clusters.
    Complete,
    /// Mean pairwise distance between clusters.
    Average,
}

/// Configuration for hierarchical risk parity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrpConfig {
    /// Linkage rule used when merging clusters.
    pub linkage_method: LinkageMethod,
    /// Uniform per-asset weight bounds (default `[0, 1]`).
    pub weight_bounds: (f64, f64),
    /// Annual risk-free rate for metrics.
    pub risk_free_rate: f64,
}

impl Default for HrpConfig {
    fn default() -> Self {
        Self {
            linkage_method: LinkageMethod::Single,
            weight_bounds: (0.0, 1.0),
            risk_free_rate: 0.0,
        }
    }
}

/// One merge step of the linkage tree. Leaves are ids `0..n`; merge `k`
/// becomes id `n + k`.
#[derive(Debug, Clone)]
struct Merge {
    left: usize,
    right: usize,
}

/// Hierarchical risk parity optimizer.
#[derive(Debug)]
pub struct HierarchicalRiskParityOptimizer {
    estimates: SampleEstimates,
    config: HrpConfig,
}

impl HierarchicalRiskParityOptimizer {
    /// Build an optimizer over a returns table.
    pub fn new(returns: &ReturnsMatrix, config: HrpConfig) -> Result<Self, OptimizeError> {
        solver::validate_bounds(config.weight_bounds, returns.n_assets())?;
        Ok(Self {
            estimates: SampleEstimates::from_returns(returns),
            config,
        })
    }

    /// Correlation-distance matrix `d_ij = sqrt(0.5 (1 - rho_ij))`,
    /// symmetrized with a zero diagonal.
    fn distance_matrix(&self) -> Array2<f64> {
        let corr = self.estimates.correlation();
        let n = corr.nrows();
        let mut dist = corr.mapv(|rho| (0.5 * (1.0 - rho)).max(0.0).sqrt());
        dist = (&dist + &dist.t()) / 2.0;
        for i in 0..n {
            dist[[i, i]] = 0.0;
        }
        dist
    }

    /// Agglomerative clustering over the condensed distances.
    fn linkage(&self, dist: &Array2<f64>) -> Vec<Merge> {
        let n = dist.nrows();
        // Active clusters as (id, member leaves).
        let mut active: Vec<(usize, Vec<usize>)> =
            (0..n).map(|i| (i, vec![i])).collect();
        let mut merges = Vec::with_capacity(n.saturating_sub(1));

        while active.len() > 1 {
            let mut best = (0usize, 1usize);
            let mut best_distance = f64::INFINITY;
            for a in 0..active.len() {
                for b in (a + 1)..active.len() {
                    let d = cluster_distance(
                        dist,
                        &active[a].1,
                        &active[b].1,
                        self.config.linkage_method,
                    );
                    if d < best_distance {
                        best_distance = d;
                        best = (a, b);
                    }
                }
            }

            let (a, b) = best;
            let (right_id, right_members) = active.remove(b);
            let (left_id, left_members) = active.remove(a);
            let mut members = left_members;
            members.extend(right_members);

            let merged_id = n + merges.len();
            merges.push(Merge {
                left: left_id,
                right: right_id,
            });
            active.push((merged_id, members));
        }

        merges
    }

    /// Leaf ordering that keeps each subtree contiguous: expand the root one
    /// tree level at a time until only leaves remain.
    fn quasi_diagonal_order(merges: &[Merge], n: usize) -> Vec<usize> {
        if merges.is_empty() {
            return (0..n).collect();
        }

        let mut order = vec![n + merges.len() - 1];
        loop {
            let mut next = Vec::with_capacity(order.len() * 2);
            let mut expanded = false;
            for &id in &order {
                if id < n {
                    next.push(id);
                } else {
                    let merge = &merges[id - n];
                    next.push(merge.left);
                    next.push(merge.right);
                    expanded = true;
                }
            }
            order = next;
            if !expanded {
                return order;
            }
        }
    }

    /// Mean of the diagonal covariance entries across a cluster.
    fn cluster_variance(&self, cluster: &[usize]) -> f64 {
        let covariance = self.estimates.covariance();
        cluster.iter().map(|&i| covariance[[i, i]]).sum::<f64>() / cluster.len() as f64
    }

    /// Recursive midpoint bisection of risk down the ordered asset list.
    fn bisect(&self, order: &[usize]) -> Array1<f64> {
        let n = self.estimates.assets().len();
        let mut weights = Array1::<f64>::from_elem(n, 1.0);

        let mut stack: Vec<Vec<usize>> = vec![order.to_vec()];
        while let Some(cluster) = stack.pop() {
            if cluster.len() <= 1 {
                continue;
            }
            let split = cluster.len() / 2;
            let (left, right) = cluster.split_at(split);

            let var_left = self.cluster_variance(left);
            let var_right = self.cluster_variance(right);
            let total = var_left + var_right;
            let alpha = if total > 0.0 {
                1.0 - var_left / total
            } else {
                0.5
            };

            for &i in left {
                weights[i] *= alpha;
            }
            for &i in right {
                weights[i] *= 1.0 - alpha;
            }

            stack.push(left.to_vec());
            stack.push(right.to_vec());
        }

        weights
    }
}

impl PortfolioOptimizer for HierarchicalRiskParityOptimizer {
    fn optimize(&self) -> Result<OptimizationOutcome, OptimizeError> {
        let assets = self.estimates.assets().to_vec();
        let n = assets.len();
        let (lower, upper) = self.config.weight_bounds;

        let raw = if n == 1 {
            Array1::from_elem(1, 1.0)
        } else {
            let dist = self.distance_matrix();
            let merges = self.linkage(&dist);
            let order = Self::quasi_diagonal_order(&merges, n);
            self.bisect(&order)
        };

        let weights = PortfolioWeights::new(assets, raw)?
            .normalized()?
            .clipped(lower, upper)?;
        let metrics = portfolio_metrics(
            &weights,
            self.estimates.mean_returns(),
            self.estimates.covariance(),
            self.config.risk_free_rate,
        )?;

        Ok(OptimizationOutcome {
            weights,
            metrics,
            risk_contributions: None,
            equilibrium_returns: None,
        })
    }
}

fn cluster_distance(
    dist: &Array2<f64>,
    left: &[usize],
    right: &[usize],
    method: LinkageMethod,
) -> f64 {
    let pairs = left
        .iter()
        .flat_map(|&i| right.iter().map(move |&j| dist[[i, j]]));
    match method {
        LinkageMethod::Single => pairs.fold(f64::INFINITY, f64::min),
        LinkageMethod::Complete => pairs.fold(f64::NEG_INFINITY, f64::max),
        LinkageMethod::Average => {
            let count = (left.len() * right.len()) as f64;
            pairs.sum::<f64>() / count
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn four_assets() -> ReturnsMatrix {
        // AAA/BBB move together, CCC/DDD move together, the pairs are
        // roughly independent of each other.
        let rows = vec![
            [0.010, 0.009, -0.002, -0.001],
            [-0.008, -0.007, 0.004, 0.005],
            [0.006, 0.007, 0.001, 0.000],
            [0.004, 0.003, -0.006, -0.007],
            [-0.002, -0.003, 0.008, 0.009],
            [0.008, 0.009, 0.002, 0.001],
            [-0.006, -0.005, -0.004, -0.003],
            [0.002, 0.001, 0.006, 0.007],
        ];
        let mut data = Array2::<f64>::zeros((rows.len(), 4));
        for (i, row) in rows.iter().enumerate() {
            for j in 0..4 {
                data[[i, j]] = row[j];
            }
        }
        ReturnsMatrix::new(
            vec![
                "AAA".to_string(),
                "BBB".to_string(),
                "CCC".to_string(),
                "DDD".to_string(),
            ],
            data,
        )
        .unwrap()
    }

    fn rank_deficient() -> ReturnsMatrix {
        // Second column is an exact multiple of the first, so the sample
        // covariance is singular.
        let rows = vec![
            [0.010, 0.020],
            [-0.004, -0.008],
            [0.006, 0.012],
            [-0.002, -0.004],
            [0.008, 0.016],
        ];
        let mut data = Array2::<f64>::zeros((rows.len(), 2));
        for (i, row) in rows.iter().enumerate() {
            data[[i, 0]] = row[0];
            data[[i, 1]] = row[1];
        }
        ReturnsMatrix::new(vec!["AAA".to_string(), "BBB".to_string()], data).unwrap()
    }

    #[rstest]
    #[case(LinkageMethod::Single)]
    #[case(LinkageMethod::Complete)]
    #[case(LinkageMethod::Average)]
    fn test_weights_sum_to_one(#[case] linkage_method: LinkageMethod) {
        let config = HrpConfig {
            linkage_method,
            ..Default::default()
        };
        let optimizer = HierarchicalRiskParityOptimizer::new(&four_assets(), config).unwrap();
        let outcome = optimizer.optimize().unwrap();
        assert_relative_eq!(outcome.weights.sum(), 1.0, epsilon = 1e-9);
        for (_, w) in outcome.weights.iter() {
            assert!((0.0..=1.0).contains(&w), "weight {w} out of bounds");
        }
    }

    #[test]
    fn test_correlated_pair_clusters_adjacent() {
        let optimizer =
            HierarchicalRiskParityOptimizer::new(&four_assets(), HrpConfig::default()).unwrap();
        let dist = optimizer.distance_matrix();
        let merges = optimizer.linkage(&dist);
        let order = HierarchicalRiskParityOptimizer::quasi_diagonal_order(&merges, 4);

        let pos = |i: usize| order.iter().position(|&x| x == i).unwrap();
        assert_eq!(pos(0).abs_diff(pos(1)), 1, "AAA/BBB should be adjacent");
        assert_eq!(pos(2).abs_diff(pos(3)), 1, "CCC/DDD should be adjacent");
    }

    #[test]
    fn test_survives_singular_covariance() {
        let optimizer =
            HierarchicalRiskParityOptimizer::new(&rank_deficient(), HrpConfig::default())
                .unwrap();
        let outcome = optimizer.optimize().unwrap();
        assert_relative_eq!(outcome.weights.sum(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lower_variance_cluster_gets_more_weight() {
        let optimizer =
            HierarchicalRiskParityOptimizer::new(&four_assets(), HrpConfig::default()).unwrap();
        let outcome = optimizer.optimize().unwrap();
        // Per-asset variances differ, so weights should not all be equal.
        let values = outcome.weights.values();
        let spread = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &w| {
                (lo.min(w), hi.max(w))
            });
        assert!(spread.1 > spread.0, "bisection should differentiate weights");
    }

    #[test]
    fn test_single_asset() {
        let returns = ReturnsMatrix::new(
            vec!["AAA".to_string()],
            Array2::from_shape_vec((3, 1), vec![0.01, -0.02, 0.005]).unwrap(),
        )
        .unwrap();
        let optimizer =
            HierarchicalRiskParityOptimizer::new(&returns, HrpConfig::default()).unwrap();
        let outcome = optimizer.optimize().unwrap();
        assert_relative_eq!(outcome.weights.values()[0], 1.0, epsilon = 1e-12);
    }
}
