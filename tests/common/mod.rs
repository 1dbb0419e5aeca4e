//! Shared fixtures for integration tests: artificial landscapes with known
//! minima, used to exercise optimizers without a network.

#![allow(dead_code)]

/// A differentiable function with a known minimum.
pub trait Landscape {
    fn name(&self) -> &'static str;

    /// Starting point of the descent.
    fn start(&self) -> Vec<f64>;

    fn value(&self, x: &[f64]) -> f64;

    fn gradient(&self, x: &[f64]) -> Vec<f64>;

    /// Location of the global minimum.
    fn minimum(&self) -> Vec<f64>;
}

/// `Σ x_i²`, minimum at the origin.
pub struct Sphere {
    start: Vec<f64>,
}

impl Sphere {
    /// One dimension starting at 20.
    pub fn one_dimensional() -> Self {
        Self { start: vec![20.0] }
    }

    /// Twenty dimensions starting at `x_i = i`.
    pub fn twenty_dimensional() -> Self {
        Self {
            start: (0..20).map(|i| i as f64).collect(),
        }
    }
}

impl Landscape for Sphere {
    fn name(&self) -> &'static str {
        "sphere"
    }

    fn start(&self) -> Vec<f64> {
        self.start.clone()
    }

    fn value(&self, x: &[f64]) -> f64 {
        x.iter().map(|v| v * v).sum()
    }

    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|v| 2.0 * v).collect()
    }

    fn minimum(&self) -> Vec<f64> {
        vec![0.0; self.start.len()]
    }
}

/// `(a - x)² + b (y - x²)²` with `a = 1`, `b = 100`; minimum at (1, 1).
pub struct Rosenbrock;

impl Landscape for Rosenbrock {
    fn name(&self) -> &'static str {
        "rosenbrock"
    }

    fn start(&self) -> Vec<f64> {
        vec![10.0, 4.0]
    }

    fn value(&self, p: &[f64]) -> f64 {
        let (x, y) = (p[0], p[1]);
        (1.0 - x).powi(2) + 100.0 * (y - x * x).powi(2)
    }

    fn gradient(&self, p: &[f64]) -> Vec<f64> {
        let (x, y) = (p[0], p[1]);
        vec![
            -2.0 * (1.0 - x) - 400.0 * x * (y - x * x),
            200.0 * (y - x * x),
        ]
    }

    fn minimum(&self) -> Vec<f64> {
        vec![1.0, 1.0]
    }
}

/// Beale function; minimum at (3, 0.5).
pub struct Beale;

impl Beale {
    fn terms(x: f64, y: f64) -> [f64; 3] {
        [
            1.5 - x + x * y,
            2.25 - x + x * y * y,
            2.625 - x + x * y * y * y,
        ]
    }
}

impl Landscape for Beale {
    fn name(&self) -> &'static str {
        "beale"
    }

    fn start(&self) -> Vec<f64> {
        vec![0.0, 0.0]
    }

    fn value(&self, p: &[f64]) -> f64 {
        Self::terms(p[0], p[1]).iter().map(|t| t * t).sum()
    }

    fn gradient(&self, p: &[f64]) -> Vec<f64> {
        let (x, y) = (p[0], p[1]);
        let [t1, t2, t3] = Self::terms(x, y);
        vec![
            2.0 * t1 * (y - 1.0) + 2.0 * t2 * (y * y - 1.0) + 2.0 * t3 * (y * y * y - 1.0),
            2.0 * t1 * x + 4.0 * t2 * x * y + 6.0 * t3 * x * y * y,
        ]
    }

    fn minimum(&self) -> Vec<f64> {
        vec![3.0, 0.5]
    }
}

/// Euclidean distance between two points.
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Initialises test logging once; repeated calls are harmless.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
