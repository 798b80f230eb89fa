// Example: plot_surface.rs
// Builds the option surface for one expiry and renders the gridded price as an
// SVG heat map over (log-moneyness, normalized time). Masked nodes are drawn grey.
//
// Usage:
//     cargo run --example plot_surface -- <OPT_csv> [<EQT_csv>] [<EXPIRY>]
//
// The output image is written to surface_<EXPIRY>.svg in the working directory.

use std::env;
use std::error::Error;
use std::path::Path;

use plotters::prelude::*;
use surface_tensor::{build_option_surface_from_csv, default_configs, SurfaceTensor};

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(option_csv) = args.first() else {
        eprintln!("Usage: plot_surface <OPT_csv> [<EQT_csv>] [<EXPIRY>]");
        std::process::exit(2);
    };
    let equity_csv = args.get(1).map(Path::new);
    let expiry = args.get(2).map(String::as_str).unwrap_or("20250529");

    let surface = build_option_surface_from_csv(option_csv, equity_csv, expiry, &default_configs::standard())?;
    let tensor = &surface.tensor;
    println!(
        "Grid {} x {}, {:.1}% of nodes valid",
        tensor.nt(),
        tensor.nx(),
        tensor.coverage() * 100.0
    );

    let output = format!("surface_{expiry}.svg");
    draw_heat_map(tensor, &output)?;
    println!("Chart saved to {output}");
    Ok(())
}

/// Half-way points between neighbouring nodes, extended by half a step at both ends.
fn cell_edges(nodes: &[f64]) -> Vec<f64> {
    match nodes {
        [] => Vec::new(),
        [only] => vec![only - 0.5, only + 0.5],
        _ => {
            let mut edges = Vec::with_capacity(nodes.len() + 1);
            edges.push(nodes[0] - (nodes[1] - nodes[0]) / 2.0);
            for w in nodes.windows(2) {
                edges.push((w[0] + w[1]) / 2.0);
            }
            let n = nodes.len();
            edges.push(nodes[n - 1] + (nodes[n - 1] - nodes[n - 2]) / 2.0);
            edges
        }
    }
}

fn draw_heat_map(tensor: &SurfaceTensor, output: &str) -> Result<(), Box<dyn Error>> {
    let x_nodes: Vec<f64> = tensor.x.to_vec();
    let t_nodes: Vec<f64> = tensor.tt.to_vec();
    let x_edges = cell_edges(&x_nodes);
    let t_edges = cell_edges(&t_nodes);
    let (Some(&x_min), Some(&x_max)) = (x_edges.first(), x_edges.last()) else {
        return Err("surface has no log-moneyness nodes".into());
    };
    let (Some(&t_min), Some(&t_max)) = (t_edges.first(), t_edges.last()) else {
        return Err("surface has no time nodes".into());
    };

    let prices: Vec<f64> = tensor
        .uu
        .iter()
        .zip(tensor.mask.iter())
        .filter(|(_, m)| **m == 1)
        .map(|(z, _)| z.re)
        .collect();
    let lo = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = if hi > lo { hi - lo } else { 1.0 };

    let root = SVGBackend::new(output, (1280, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(
            format!(
                "{} option price surface | Exp: {} | price range [{:.2}, {:.2}]",
                tensor.symbol, tensor.expiry, lo, hi
            ),
            ("sans-serif", 30),
        )
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, t_min..t_max)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("log(K / S)")
        .y_desc("Normalized time to expiry")
        .draw()?;

    chart.draw_series(tensor.uu.indexed_iter().map(|((i, j), z)| {
        let color = if tensor.mask[[i, j]] == 1 {
            let level = ((z.re - lo) / span).clamp(0.0, 1.0);
            HSLColor(0.66 * (1.0 - level), 0.8, 0.5).filled()
        } else {
            RGBColor(200, 200, 200).filled()
        };
        Rectangle::new(
            [(x_edges[j], t_edges[i]), (x_edges[j + 1], t_edges[i + 1])],
            color,
        )
    }))?;

    root.present()?;
    Ok(())
}
