
use surface_tensor::{build_equity_surface, SurfaceConfig, SurfaceError, EQUITY_CHANNELS};
use test_utils::*;

const ENTROPY: usize = 0;
const EVENT: usize = 1;
const GAP: usize = 2;
const SHOCK: usize = 3;

/// N ticks broadcast to an N x N grid: rows follow ticks, columns repeat.
#[test]
fn test_equity_tensor_layout() {
    let ticks = vec![
        equity_tick(0, 100.0, 99.0),
        equity_tick(1, 101.0, 95.0),
        equity_tick(2, 99.5, 99.4),
        equity_tick(3, 102.0, 101.0),
    ];
    let tensor = build_equity_surface(&ticks, "20250529", &SurfaceConfig::default()).unwrap();

    assert_eq!(tensor.uu.dim(), (4, 4));
    assert_eq!(tensor.features.dim(), (4, 4, EQUITY_CHANNELS.len()));
    assert_eq!(tensor.mask.dim(), (4, 4));
    for (i, t) in tensor.tt.iter().enumerate() {
        assert_close(*t, i as f64 / 3.0, 1e-15, "time axis");
    }
    assert_close(tensor.x[1], 101.0_f64.ln(), 1e-15, "log price");

    for i in 0..4 {
        for j in 0..4 {
            assert_eq!(tensor.uu[[i, j]], tensor.uu[[i, 0]], "row {i} must be constant");
        }
        assert_eq!(tensor.uu[[i, 0]].re, ticks[i].ltp);
    }
    // first return is missing and filled with zero; the second averages one change
    assert_eq!(tensor.uu[[0, 0]].im, 0.0);
    assert_close(tensor.uu[[1, 0]].im, 0.01, 1e-12, "smoothed return");

    let gaps: Vec<f64> = (0..4).map(|i| tensor.features[[i, 0, GAP]]).collect();
    assert_eq!(gaps, vec![0.0, 1.0, 0.0, 0.0]);
    assert!(tensor.mask.iter().all(|m| *m == 1));
}

/// Entropy is undefined until two returns exist; those ticks are left out of
/// the shock quantile and written as zero.
#[test]
fn test_equity_feature_values() {
    let prices = [100.0, 110.0, 99.0, 99.0, 120.0, 120.0, 60.0];
    let ticks: Vec<_> = prices
        .iter()
        .enumerate()
        .map(|(i, &p)| equity_tick(i as u32, p, p - 0.5))
        .collect();
    let tensor = build_equity_surface(&ticks, "20250529", &SurfaceConfig::default()).unwrap();

    let returns = [0.0, 0.1, 0.0, 0.0, 0.053030, 0.042424, -0.077576];
    for (i, r) in returns.iter().enumerate() {
        assert_close(tensor.uu[[i, 3]].im, *r, 1e-6, "smoothed return");
    }

    let entropy = [0.0, 0.0, 0.068323, 0.056130, 0.047035, 0.040900, 0.050119];
    for (i, e) in entropy.iter().enumerate() {
        assert_close(tensor.features[[i, 0, ENTROPY]], *e, 1e-6, "entropy");
    }

    let shocks: Vec<f64> = (0..7).map(|i| tensor.features[[i, 5, SHOCK]]).collect();
    assert_eq!(shocks, vec![0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    assert!((0..7).all(|i| tensor.features[[i, 1, GAP]] == 0.0));
}

#[test]
fn test_equity_events_and_mask() {
    let mut ticks = vec![
        equity_tick(0, 100.0, 99.0),
        equity_tick(0, 0.0, 0.0),
        equity_tick(1, 100.5, 100.0),
    ];
    ticks.swap(0, 2); // builder sorts by time, stable within a timestamp

    let tensor = build_equity_surface(&ticks, "20250529", &SurfaceConfig::default()).unwrap();
    let events: Vec<f64> = (0..3).map(|i| tensor.features[[i, 2, EVENT]]).collect();
    assert_eq!(events, vec![0.0, 1.0, 0.0]);

    let mask_rows: Vec<u8> = (0..3).map(|i| tensor.mask[[i, 1]]).collect();
    assert_eq!(mask_rows, vec![0, 1, 1]);
    assert!(tensor.x[0].is_nan(), "log of a zero price is undefined");
}

#[test]
fn test_single_tick_and_empty_input() {
    let tensor = build_equity_surface(&[equity_tick(0, 100.0, 99.0)], "20250529", &SurfaceConfig::default()).unwrap();
    assert_eq!(tensor.tt.to_vec(), vec![0.0]);
    assert_eq!(tensor.uu.dim(), (1, 1));

    let result = build_equity_surface(&[], "20250529", &SurfaceConfig::default());
    assert!(matches!(result, Err(SurfaceError::EmptyInput(_))));
}
