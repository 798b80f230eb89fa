
use approx::assert_abs_diff_eq;
use surface_tensor::data::{align_spot, load_option_quotes, load_underlying};
use surface_tensor::features::{
    duplicate_flags, engineer_option_features, gap_flags, normalize_time,
};
use surface_tensor::{
    build_option_surface, surface_from_quotes, OptionSide, SpotSource, SurfaceConfig,
    SurfaceError, OPTION_CHANNELS,
};
use test_utils::*;

const IV_CHANNEL: usize = 6;
const DELTA_CHANNEL: usize = 1;
const EVENT_CHANNEL: usize = 5;

fn strictly_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

/// One contract repriced over seven ticks: the proxy needs a full three-tick
/// window, entropy a full five-tick window, and only the last jump is a shock.
#[test]
fn test_option_feature_values() {
    let prices = [100.0, 110.0, 99.0, 99.0, 120.0, 120.0, 60.0];
    let quotes: Vec<_> = prices
        .iter()
        .enumerate()
        .map(|(i, &p)| quote(tick_time(i as u32), 2600.0, p, 30.0, OptionSide::Call))
        .collect();
    let spots = vec![2600.0; quotes.len()];
    let frame = engineer_option_features(&quotes, &spots, &SurfaceConfig::default()).unwrap();

    assert_eq!(frame.returns[0], 0.0);
    assert_abs_diff_eq!(frame.returns[4], 0.212121, epsilon = 1e-6);

    let proxy = [0.0, 0.0, 0.0, 0.0, 0.037374, 0.070707, -0.095960];
    for (got, want) in frame.return_proxy.iter().zip(proxy) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
    }

    let entropy = [0.0, 0.0, 0.0, 0.0, 0.111826, 0.111826, 0.232822];
    for (got, want) in frame.entropy.iter().zip(entropy) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
    }

    assert_eq!(frame.vol_shock, vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    assert!(frame.gap.iter().all(|g| *g == 0.0));
    assert!(frame.event_day.iter().all(|e| *e == 0.0));
    assert_eq!(frame.log_moneyness[3], Some(0.0));
}

/// Three calls at one timestamp against an external spot of 2600.
#[test]
fn test_three_strike_scenario() {
    let at = ts(10, 0, 0);
    let quotes = vec![
        quote(at, 2500.0, 120.0, 30.0, OptionSide::Call),
        quote(at, 2600.0, 80.0, 30.0, OptionSide::Call),
        quote(at, 2700.0, 50.0, 30.0, OptionSide::Call),
    ];
    let config = SurfaceConfig::default();
    let surface =
        build_option_surface(quotes, &SpotSource::Observed(flat_spot(2600.0)), "20250529", &config)
            .expect("surface should build");
    let tensor = &surface.tensor;
    let diag = &surface.diagnostics;

    assert_eq!(diag.iv.solved, 3);
    assert_eq!(diag.iv.failed(), 0);
    assert_eq!(diag.iv_recovered, 0, "all volatilities were valid already");
    assert_eq!(diag.iv_missing, 0);

    assert_eq!(tensor.nx(), 3);
    assert_eq!(tensor.nt(), 1);
    assert_eq!(tensor.tt[0], 1.0);
    assert_abs_diff_eq!(tensor.x[1], 0.0, epsilon = 1e-15);
    assert!(tensor.mask.iter().all(|m| *m == 1), "mask {:?}", tensor.mask);

    let prices: Vec<f64> = tensor.uu.row(0).iter().map(|z| z.re).collect();
    assert_eq!(prices, vec![120.0, 80.0, 50.0]);

    for j in 0..3 {
        let iv = tensor.features[[0, j, IV_CHANNEL]];
        assert!(iv > 0.0 && iv < 5.0, "iv {iv} at column {j}");
        let delta = tensor.features[[0, j, DELTA_CHANNEL]];
        assert!(delta > 0.0 && delta < 1.0, "delta {delta} at column {j}");
    }
    // first quote at the shared timestamp is not an event, the others are
    let events: Vec<f64> = (0..3).map(|j| tensor.features[[0, j, EVENT_CHANNEL]]).collect();
    assert_eq!(events, vec![0.0, 1.0, 1.0]);

    assert_eq!(tensor.symbol, "RELIANCE");
    assert_eq!(tensor.expiry, "20250529");
}

/// Grid axes are the distinct observed coordinates and every shape follows them.
#[test]
fn test_grid_shapes_and_mask_property() {
    let strikes = [2400.0, 2500.0, 2600.0, 2700.0, 2800.0];
    let dtes = [10.0, 20.0, 30.0];
    let quotes = flat_vol_chain(2600.0, 0.3, &strikes, &dtes);
    let surface = surface_from_quotes(quotes, Some(flat_spot(2600.0)), "20250529", &SurfaceConfig::default())
        .expect("surface should build");
    let tensor = &surface.tensor;

    assert_eq!(tensor.nx(), strikes.len());
    assert_eq!(tensor.nt(), dtes.len());
    assert!(strictly_increasing(tensor.x.as_slice().unwrap()));
    assert!(strictly_increasing(tensor.tt.as_slice().unwrap()));
    assert_eq!(tensor.uu.dim(), (3, 5));
    assert_eq!(tensor.features.dim(), (3, 5, OPTION_CHANNELS.len()));
    assert_eq!(tensor.mask.dim(), (3, 5));

    for ((i, j), z) in tensor.uu.indexed_iter() {
        assert_eq!(tensor.mask[[i, j]] == 1, z.re > 0.0, "mask at ({i}, {j})");
    }

    // every node is a sample, so the cubic surface returns the quoted volatility
    for v in tensor.features.index_axis(ndarray::Axis(2), IV_CHANNEL).iter() {
        assert_close(*v, 0.3, 1e-6, "gridded iv");
    }
    assert_close(tensor.tt[0], 10.0 / 30.0, 1e-15, "normalized time");
}

/// Without an underlying series spot is the strike, so every quote is at-the-money.
#[test]
fn test_strike_fallback_collapses_moneyness() {
    let quotes = flat_vol_chain(2600.0, 0.3, &[2500.0, 2600.0, 2700.0], &[10.0, 30.0]);
    let surface = build_option_surface(quotes, &SpotSource::Fallback, "20250529", &SurfaceConfig::default())
        .expect("surface should build");

    assert!(surface.diagnostics.spot_fallback);
    assert_eq!(surface.tensor.x.to_vec(), vec![0.0]);
    assert_eq!(surface.tensor.nt(), 2);
    assert_eq!(surface.tensor.uu.dim(), (2, 1));
}

#[test]
fn test_zero_dte_is_degenerate_normalization() {
    let at = ts(15, 29, 0);
    let quotes = vec![
        quote(at, 2500.0, 101.0, 0.0, OptionSide::Call),
        quote(at, 2600.0, 3.0, 0.0, OptionSide::Call),
    ];
    let result = build_option_surface(quotes, &SpotSource::Fallback, "20250502", &SurfaceConfig::default());
    assert!(
        matches!(result, Err(SurfaceError::DegenerateNormalization { .. })),
        "expected DegenerateNormalization, got {result:?}"
    );

    assert!(normalize_time(&[None, None]).is_err());
    assert_eq!(
        normalize_time(&[Some(10.0), None, Some(20.0)]).unwrap(),
        vec![Some(0.5), None, Some(1.0)]
    );
}

#[test]
fn test_empty_and_bad_spot_inputs() {
    let result = build_option_surface(Vec::new(), &SpotSource::Fallback, "20250529", &SurfaceConfig::default());
    assert!(matches!(result, Err(SurfaceError::EmptyInput(_))));

    let quotes = flat_vol_chain(2600.0, 0.3, &[2600.0], &[30.0]);
    let result = build_option_surface(quotes, &SpotSource::Observed(Vec::new()), "20250529", &SurfaceConfig::default());
    assert!(matches!(result, Err(SurfaceError::InvalidInput(_))));
}

/// A quote priced below its zero-volatility value fails to solve and takes its
/// volatility from the surrounding quotes.
#[test]
fn test_failed_solve_is_recovered_by_gap_fill() {
    let strikes = [2400.0, 2500.0, 2600.0, 2700.0, 2800.0];
    let mut quotes = flat_vol_chain(2600.0, 0.3, &strikes, &[10.0, 20.0, 30.0]);
    // middle of the rectangle: 2600 strike, 20 days
    quotes[7].ltp = 0.5;

    let surface = surface_from_quotes(quotes, Some(flat_spot(2600.0)), "20250529", &SurfaceConfig::sequential())
        .expect("surface should build");
    let diag = &surface.diagnostics;

    assert_eq!(diag.iv.no_sign_change, 1);
    assert_eq!(diag.iv.solved, 14);
    assert_eq!(diag.iv_recovered, 1);
    assert_eq!(diag.iv_missing, 0);

    let recovered = surface.tensor.features[[1, 2, IV_CHANNEL]];
    assert_close(recovered, 0.3, 1e-3, "gap-filled iv");
    assert!(diag.skipped_fields.is_empty());
}

#[test]
fn test_loader_counts_dropped_rows() {
    let text = csv_text(
        "Timestamp,StrikePrice,LTP,BuyPrice,OpenInterest,DTE,OptionsType,IV",
        &[
            "2025-05-02 09:15:00,2600,80,79.5,1200,27,CE,",
            "2025-05-02 09:15:01,2600,abc,79.5,1200,27,CE,",
            "2025-05-02 09:15:02,,80,79.5,1200,27,CE,",
            "2025-05-02 09:15:03,2600,80,79.5,1200,27,XX,",
            "not a time,2600,80,79.5,1200,27,PE,",
            "02-05-2025 09:14:00,2500,30,,n/a,27,pe,0.21",
        ],
    );
    let (quotes, report) = load_option_quotes(text.as_bytes()).expect("load should succeed");

    assert_eq!(report.rows_read, 6);
    assert_eq!(report.dropped_missing_price, 1);
    assert_eq!(report.dropped_missing_strike, 1);
    assert_eq!(report.dropped_bad_side, 1);
    assert_eq!(report.dropped_bad_timestamp, 1);
    assert_eq!(report.rows_kept, 2);
    assert_eq!(report.rows_dropped(), 4);

    // sorted by time: the put at 09:14 comes first
    assert_eq!(quotes[0].side, OptionSide::Put);
    assert_eq!(quotes[0].buy_price, None);
    assert_eq!(quotes[0].open_interest, None);
    assert_eq!(quotes[0].iv, Some(0.21));
    assert_eq!(quotes[1].open_interest, Some(1200));

    let missing_column = csv_text("Timestamp,StrikePrice,LTP", &["2025-05-02 09:15:00,2600,80"]);
    assert!(matches!(
        load_option_quotes(missing_column.as_bytes()),
        Err(SurfaceError::InvalidInput(_))
    ));
}

/// Each quote takes the last underlying tick at or before it; earlier quotes
/// take the first tick.
#[test]
fn test_as_of_spot_alignment() {
    let underlying = csv_text(
        EQUITY_HEADER,
        &["2025-05-02 09:35:00,110,109.9", "2025-05-02 09:25:00,100,99.9", "bad,1,1"],
    );
    let (ticks, report) = load_underlying(underlying.as_bytes()).unwrap();
    assert_eq!(report.dropped_bad_timestamp, 1);

    let quotes = vec![
        quote(ts(9, 20, 0), 100.0, 5.0, 10.0, OptionSide::Call),
        quote(ts(9, 30, 0), 100.0, 5.0, 10.0, OptionSide::Call),
        quote(ts(9, 35, 0), 100.0, 5.0, 10.0, OptionSide::Call),
        quote(ts(9, 40, 0), 100.0, 5.0, 10.0, OptionSide::Call),
    ];
    let spots = align_spot(&quotes, &SpotSource::Observed(ticks)).unwrap();
    assert_eq!(spots, vec![100.0, 100.0, 110.0, 110.0]);

    let fallback = align_spot(&quotes[..1], &SpotSource::Fallback).unwrap();
    assert_eq!(fallback, vec![100.0]);
}

#[test]
fn test_event_and_gap_flags() {
    let times = [ts(9, 15, 0), ts(9, 15, 0), ts(9, 15, 1), ts(9, 15, 0)];
    assert_eq!(duplicate_flags(&times), vec![0.0, 1.0, 0.0, 1.0]);

    let gaps = gap_flags(&[100.0, 100.0, 100.0], &[Some(94.0), Some(95.0), None], 5.0);
    assert_eq!(gaps, vec![1.0, 0.0, 0.0]);
}
