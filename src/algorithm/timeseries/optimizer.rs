//! Nelder-Mead simplex minimizer
//!
//! Derivative-free, used for the conditional sum-of-squares ARIMA fit. The
//! objective may return `f64::INFINITY` to mark inadmissible points.

/// Outcome of a minimization
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Best point found
    pub x: Vec<f64>,
    /// Objective at `x`
    pub value: f64,
    /// Iterations used
    pub iterations: usize,
    /// Whether the simplex collapsed below tolerance
    pub converged: bool,
}

/// Settings for [`nelder_mead`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NelderMead {
    /// Iteration budget
    pub max_iterations: usize,
    /// Absolute spread of the simplex vertices at convergence
    pub x_tolerance: f64,
    /// Relative spread of the objective values at convergence
    pub f_tolerance: f64,
    /// Edge length of the initial simplex
    pub initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            x_tolerance: 1e-6,
            f_tolerance: 1e-9,
            initial_step: 0.1,
        }
    }
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    /// Minimize `f` starting from `start`
    ///
    /// A zero-dimensional problem evaluates `f` once and converges.
    pub fn minimize<F>(&self, f: F, start: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let n = start.len();
        if n == 0 {
            return Minimum {
                x: Vec::new(),
                value: f(start),
                iterations: 0,
                converged: true,
            };
        }

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
        simplex.push((start.to_vec(), f(start)));
        for i in 0..n {
            let mut vertex = start.to_vec();
            vertex[i] += self.initial_step;
            let value = f(&vertex);
            simplex.push((vertex, value));
        }

        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.max_iterations {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
            if self.has_converged(&simplex) {
                converged = true;
                break;
            }
            iterations += 1;

            let centroid: Vec<f64> = (0..n)
                .map(|j| simplex[..n].iter().map(|(x, _)| x[j]).sum::<f64>() / n as f64)
                .collect();
            let worst = simplex[n].clone();
            let along = |t: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&worst.0)
                    .map(|(c, w)| c + t * (c - w))
                    .collect()
            };

            let reflected = along(REFLECT);
            let f_reflected = f(&reflected);
            if f_reflected < simplex[0].1 {
                let expanded = along(EXPAND);
                let f_expanded = f(&expanded);
                simplex[n] = if f_expanded < f_reflected {
                    (expanded, f_expanded)
                } else {
                    (reflected, f_reflected)
                };
                continue;
            }
            if f_reflected < simplex[n - 1].1 {
                simplex[n] = (reflected, f_reflected);
                continue;
            }

            let (contracted, f_contracted) = if f_reflected < worst.1 {
                let point = along(CONTRACT * REFLECT);
                let value = f(&point);
                (point, value)
            } else {
                let point = along(-CONTRACT);
                let value = f(&point);
                (point, value)
            };
            if f_contracted < worst.1.min(f_reflected) {
                simplex[n] = (contracted, f_contracted);
                continue;
            }

            let best = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                let shrunk: Vec<f64> = best
                    .iter()
                    .zip(&vertex.0)
                    .map(|(b, v)| b + SHRINK * (v - b))
                    .collect();
                let value = f(&shrunk);
                *vertex = (shrunk, value);
            }
        }

        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (x, value) = simplex.swap_remove(0);
        Minimum {
            x,
            value,
            iterations,
            converged,
        }
    }

    fn has_converged(&self, simplex: &[(Vec<f64>, f64)]) -> bool {
        let (best, f_best) = (&simplex[0].0, simplex[0].1);
        if !f_best.is_finite() {
            return false;
        }
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|(x, _)| x.iter().zip(best).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        let f_spread = simplex[1..]
            .iter()
            .map(|(_, v)| (v - f_best).abs())
            .fold(0.0, f64::max);
        x_spread <= self.x_tolerance && f_spread <= self.f_tolerance * (1.0 + f_best.abs())
    }
}
