//! Time-budget scheduler: fits a parabola `w(x) = a*x^2 + b*x + c` once, at
//! construction, through `(1, 1)`, `((1+n)/2, m)` and `(n, 1)`, then
//! re-evaluates that fixed curve at the current (shrinking) expected move
//! count on every call to `schedule`.
//!
//! Because the curve is symmetric about its own midpoint by construction
//! (the two endpoints share `y = 1` and the middle point sits exactly
//! halfway between them), it is solved directly in vertex form rather than
//! through a general three-point linear system.

pub const DEFAULT_FREQ: u32 = 100;
pub const HOPELESS_THRESHOLD: f64 = 0.01;
pub const WINNING_THRESHOLD: f64 = 0.99;
pub const MIN_CHECK_ELAPSED_MS: u64 = 500;

pub struct StopScheduler {
    a: f64,
    b: f64,
    c: f64,
    reserve_time_ms: u64,
    freq: u32,
    p: f64,
}

impl StopScheduler {
    pub fn new(n: u32, m: f64, reserve_time_ms: u64, freq: u32, p: f64) -> Self {
        assert!(reserve_time_ms > 0, "reserveTime must be positive");
        assert!(freq >= 2, "freq must be >= 2");
        assert!((0.0..=1.0).contains(&p), "p must lie in [0, 1]");
        assert!(n >= 3, "numExpectedMoves must be >= 3 to fit a parabola");
        assert!(m > 1.0, "m must exceed the curve's fixed endpoint value of 1");

        let nf = n as f64;
        let x2 = (1.0 + nf) / 2.0;
        let k = (1.0 - m) * 4.0 / (nf - 1.0).powi(2);
        let a = k;
        let b = -2.0 * k * x2;
        let c = m + k * x2 * x2;
        assert!(2.0 * a + b < 1.0, "fitted curve must not be increasing past x=1");

        StopScheduler {
            a,
            b,
            c,
            reserve_time_ms,
            freq,
            p,
        }
    }

    /// The fixed curve, evaluated at `n`.
    pub fn curve(&self, n: u32) -> f64 {
        let nf = (n as f64).max(1.0);
        self.a * nf * nf + self.b * nf + self.c
    }

    /// Millisecond budget for the upcoming round, given the current
    /// (shrinking) expected move count and remaining wall-clock time.
    pub fn schedule(&self, n: u32, time_left_ms: u64) -> u64 {
        let nf = (n as f64).max(1.0);
        let w = self.curve(n);
        let usable = (time_left_ms.saturating_sub(self.reserve_time_ms)).max(1) as f64;
        ((w / nf) * usable) as u64
    }

    /// Stop conditions are only evaluated once every `freq` playouts.
    pub fn is_check_tick(&self, num_playouts: u64) -> bool {
        (num_playouts + 1) % self.freq as u64 == 0
    }

    pub fn p(&self) -> f64 {
        self.p
    }
}
