
use approx::assert_abs_diff_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};
use surface_tensor::{
    bs_delta, bs_price, solve_implied_vols, ImpliedVolSolver, IvOutcome, IvSolveError,
    OptionSide, SurfaceConfig,
};
use test_utils::*;

/// Call minus put must equal the forward intrinsic value S - K e^{-rT}.
#[test]
fn test_put_call_parity() {
    let (s, r) = (2600.0, 0.05);
    for &(k, t, sigma) in &[(2400.0, 0.05, 0.2), (2600.0, 0.25, 0.35), (2900.0, 1.0, 0.8)] {
        let call = bs_price(s, k, t, r, sigma, OptionSide::Call);
        let put = bs_price(s, k, t, r, sigma, OptionSide::Put);
        let forward_intrinsic = s - k * (-r * t).exp();
        assert_abs_diff_eq!(call - put, forward_intrinsic, epsilon = 1e-6);
    }
}

/// With zero time the epsilon-guarded d1 keeps prices finite and at intrinsic value.
#[test]
fn test_zero_time_price_is_finite() {
    let call = bs_price(2600.0, 2500.0, 0.0, 0.05, 0.3, OptionSide::Call);
    let put = bs_price(2600.0, 2500.0, 0.0, 0.05, 0.3, OptionSide::Put);
    assert_close(call, 100.0, 1e-9, "call intrinsic");
    assert_close(put, 0.0, 1e-9, "put intrinsic");
}

/// Pricing then inverting recovers the volatility for random near-the-money contracts.
#[test]
fn test_iv_round_trip_random_contracts() {
    let mut rng = StdRng::seed_from_u64(7);
    let solver = ImpliedVolSolver::default();

    for _ in 0..200 {
        let spot = rng.gen_range(500.0..5000.0);
        let t = rng.gen_range(7.0..120.0) / 365.0;
        let sigma = rng.gen_range(0.1..1.0);
        // keep strikes within 1.5 standard deviations so vega is not negligible
        let strike = spot * (rng.gen_range(-1.5..1.5) * sigma * f64::sqrt(t)).exp();
        let side = if rng.gen_bool(0.5) {
            OptionSide::Call
        } else {
            OptionSide::Put
        };

        let price = bs_price(spot, strike, t, 0.05, sigma, side);
        let iv = solver
            .solve(spot, strike, t, 0.05, price, side)
            .unwrap_or_else(|e| panic!("solve failed for sigma {sigma}: {e}"));
        assert!(
            (iv - sigma).abs() < 1e-4,
            "round trip: sigma {sigma}, recovered {iv} (S={spot}, K={strike}, T={t})"
        );
    }
}

/// A price below the zero-volatility value, or above spot, cannot be bracketed.
#[test]
fn test_unattainable_prices_report_no_sign_change() {
    let solver = ImpliedVolSolver::default();
    let t = 30.0 / 365.0;

    let below = solver.solve(2600.0, 2500.0, t, 0.05, 50.0, OptionSide::Call);
    assert_eq!(below, Err(IvSolveError::NoSignChange));

    let above = solver.solve(2600.0, 2500.0, t, 0.05, 3000.0, OptionSide::Call);
    assert_eq!(above, Err(IvSolveError::NoSignChange));
}

#[test]
fn test_invalid_solver_inputs() {
    let solver = ImpliedVolSolver::default();
    assert_eq!(
        solver.solve(2600.0, 2500.0, 0.0, 0.05, 120.0, OptionSide::Call),
        Err(IvSolveError::InvalidInput)
    );
    assert_eq!(
        solver.solve(0.0, 2500.0, 0.1, 0.05, 120.0, OptionSide::Call),
        Err(IvSolveError::InvalidInput)
    );
    assert_eq!(
        solver.solve(2600.0, 2500.0, 0.1, 0.05, f64::NAN, OptionSide::Put),
        Err(IvSolveError::InvalidInput)
    );
}

/// Call delta lies in (0, 1), put delta in (-1, 0), and they differ by exactly one.
#[test]
fn test_delta_bounds_and_parity() {
    for &k in &[2000.0, 2500.0, 2600.0, 2700.0, 3200.0] {
        let call = bs_delta(2600.0, k, 0.1, 0.05, 0.3, OptionSide::Call);
        let put = bs_delta(2600.0, k, 0.1, 0.05, 0.3, OptionSide::Put);
        assert!(call > 0.0 && call < 1.0, "call delta {call} at K={k}");
        assert!(put > -1.0 && put < 0.0, "put delta {put} at K={k}");
        assert_abs_diff_eq!(call - put, 1.0, epsilon = 1e-12);
    }
}

/// Supplied volatilities pass through; missing ones are solved; parallel and
/// sequential runs agree exactly and keep quote order.
#[test]
fn test_batch_solve_keeps_order_and_supplied_values() {
    let mut quotes = flat_vol_chain(2600.0, 0.25, &[2400.0, 2500.0, 2600.0, 2700.0, 2800.0], &[30.0]);
    quotes[2].iv = Some(0.42);
    quotes[0].ltp = 150.0; // below the zero-volatility value of the 2400 call
    let spots = vec![2600.0; quotes.len()];

    let parallel = solve_implied_vols(&quotes, &spots, &SurfaceConfig::default());
    let sequential = solve_implied_vols(&quotes, &spots, &SurfaceConfig::sequential());
    assert_eq!(parallel, sequential);

    assert_eq!(parallel[2], IvOutcome::Supplied(0.42));
    assert_eq!(parallel[0], IvOutcome::Failed(IvSolveError::NoSignChange));
    for i in [1, 3, 4] {
        match parallel[i] {
            IvOutcome::Solved(v) => assert_close(v, 0.25, 1e-4, "solved iv"),
            other => panic!("quote {i}: unexpected outcome {other:?}"),
        }
    }
}
