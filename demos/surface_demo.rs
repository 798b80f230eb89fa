// demos/surface_demo.rs

//! Build one option surface and one equity surface from CSV files and report
//! what happened along the way.
//!
//! Usage:
//!     cargo run --example surface_demo -- <OPT_csv> [<EQT_csv>] [<EXPIRY>]
//!
//! With no arguments a small synthetic chain is priced and gridded instead.

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use surface_tensor::{
    build_equity_surface_from_csv, build_option_surface_from_csv, bs_price, default_configs,
    surface_from_quotes, OptionSide, OptionSurface, Quote, SurfaceTensor, UnderlyingTick,
    OPTION_CHANNELS,
};

fn main() -> Result<()> {
    println!("Option Surface Tensor Demo");
    println!("==========================");

    let args: Vec<String> = env::args().skip(1).collect();
    let config = default_configs::standard();

    let surface = match args.first() {
        Some(option_csv) => {
            let equity_csv = args.get(1).map(Path::new);
            let expiry = args.get(2).map(String::as_str).unwrap_or("20250529");
            let surface = build_option_surface_from_csv(option_csv, equity_csv, expiry, &config)
                .with_context(|| format!("building option surface from {option_csv}"))?;

            if let Some(equity_csv) = equity_csv {
                let equity = build_equity_surface_from_csv(equity_csv, expiry, &config)
                    .with_context(|| format!("building equity surface from {}", equity_csv.display()))?;
                println!("\nEquity surface");
                print_tensor(&equity);
            }
            surface
        }
        None => {
            let (quotes, spot) = synthetic_chain()?;
            surface_from_quotes(quotes, Some(spot), "20250529", &config)?
        }
    };

    println!("\nOption surface");
    print_diagnostics(&surface);
    print_tensor(&surface.tensor);
    print_atm_row(&surface.tensor);
    Ok(())
}

/// Calls and puts on a 5 x 3 strike/DTE rectangle with a mild smile.
fn synthetic_chain() -> Result<(Vec<Quote>, Vec<UnderlyingTick>)> {
    let open = NaiveDate::from_ymd_opt(2025, 5, 2)
        .and_then(|d| d.and_hms_opt(9, 15, 0))
        .context("invalid demo timestamp")?;
    let spot: f64 = 2600.0;

    let mut quotes = Vec::new();
    for (n, &dte) in [7.0, 14.0, 27.0].iter().enumerate() {
        for (m, &strike) in [2400.0, 2500.0, 2600.0, 2700.0, 2800.0].iter().enumerate() {
            let k = (strike / spot).ln();
            let sigma = 0.22 + 0.8 * k * k;
            let side = if strike < spot { OptionSide::Put } else { OptionSide::Call };
            let ltp = bs_price(spot, strike, dte / 365.0, 0.05, sigma, side);
            quotes.push(Quote {
                timestamp: open + chrono::Duration::seconds((n * 5 + m) as i64),
                strike,
                ltp,
                buy_price: Some(ltp * 0.995),
                open_interest: Some(500 + 100 * m as u64),
                dte: Some(dte),
                side,
                iv: None,
            });
        }
    }

    let underlying = vec![UnderlyingTick {
        timestamp: open,
        price: spot,
    }];
    Ok((quotes, underlying))
}

fn print_diagnostics(surface: &OptionSurface) {
    let diag = &surface.diagnostics;
    if let Some(load) = &diag.load {
        println!(
            "Rows read: {}, kept: {}, dropped: {}",
            load.rows_read,
            load.rows_kept,
            load.rows_dropped()
        );
    }
    println!("Quotes used: {}", diag.quotes);
    if diag.spot_fallback {
        println!("No underlying series: spot taken from strike");
    }
    println!(
        "Implied vols: {} supplied, {} solved, {} failed (no sign change {}, iteration limit {})",
        diag.iv.supplied,
        diag.iv.solved,
        diag.iv.failed(),
        diag.iv.no_sign_change,
        diag.iv.iteration_limit
    );
    println!(
        "Gap fill: {} recovered, {} still missing",
        diag.iv_recovered, diag.iv_missing
    );
    if !diag.skipped_fields.is_empty() {
        println!("Fields left empty: {}", diag.skipped_fields.join(", "));
    }
}

fn print_tensor(tensor: &SurfaceTensor) {
    let (nt, nx) = tensor.uu.dim();
    println!("Grid: {nt} times x {nx} log-moneyness nodes, {} channels", tensor.channels());
    if let (Some(x0), Some(x1)) = (tensor.x.first(), tensor.x.last()) {
        println!("x range: [{x0:.4}, {x1:.4}]");
    }
    println!("Valid nodes: {:.1}%", tensor.coverage() * 100.0);
}

/// Print every channel along the column nearest the money, one row per time node.
fn print_atm_row(tensor: &SurfaceTensor) {
    let Some(atm) = tensor
        .x
        .iter()
        .enumerate()
        .filter(|(_, x)| x.is_finite())
        .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map(|(j, _)| j)
    else {
        return;
    };

    println!("\nColumn x = {:.4}", tensor.x[atm]);
    print!("{:>8} {:>10} {:>10}", "t", "price", "ret");
    for name in OPTION_CHANNELS {
        print!(" {name:>13}");
    }
    println!();
    for (i, t) in tensor.tt.iter().enumerate() {
        let z = tensor.uu[[i, atm]];
        print!("{t:>8.4} {:>10.4} {:>10.4}", z.re, z.im);
        for c in 0..tensor.channels() {
            print!(" {:>13.4}", tensor.features[[i, atm, c]]);
        }
        println!();
    }
}
