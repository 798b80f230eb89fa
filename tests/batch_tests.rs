
use std::fs;
use std::path::Path;

use surface_tensor::batch::{equity_input_name, option_input_name, option_output_name};
use surface_tensor::{read_surface, run_batch, BatchConfig, BuilderKind, SurfaceConfig};
use test_utils::*;

fn write_inputs(dir: &Path, symbol: &str, expiry: &str) {
    let options = csv_text(
        OPTION_HEADER,
        &[
            "2025-05-02 09:15:00,2500,120,119,1000,27,CE",
            "2025-05-02 09:15:01,2600,62,61.5,1500,27,CE",
            "2025-05-02 09:15:02,2700,25,24,900,27,CE",
            "2025-05-02 09:16:00,2600,55,54,1400,26.5,PE",
        ],
    );
    let equity = csv_text(
        EQUITY_HEADER,
        &[
            "2025-05-02 09:14:59,2598,2597.5",
            "2025-05-02 09:15:30,2601,2600",
            "2025-05-02 09:16:00,2603,2596",
        ],
    );
    fs::write(dir.join(option_input_name(symbol, expiry)), options).unwrap();
    fs::write(dir.join(equity_input_name(symbol, expiry)), equity).unwrap();
}

#[test]
fn test_file_naming() {
    assert_eq!(option_input_name("RELIANCE", "20250529"), "OPT_RELIANCE_20250529.csv");
    assert_eq!(equity_input_name("RELIANCE", "20250529"), "EQT_RELIANCE_20250529.csv");
    assert_eq!(option_output_name("20250529"), "OPT_PINN_TRAIN_DATA_20250529.npz");
}

/// One expiry has inputs, the other does not: the batch records the failure and
/// still writes the good expiry's bundles.
#[test]
fn test_batch_continues_past_failed_expiry() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_inputs(input.path(), "RELIANCE", "20250529");

    let batch = BatchConfig {
        symbol: "RELIANCE".to_string(),
        expiries: vec!["20250626".to_string(), "20250529".to_string()],
        input_dir: input.path().to_path_buf(),
        output_dir: output.path().join("bundles"),
        kind: BuilderKind::Both,
    };
    let report = run_batch(&batch, &SurfaceConfig::sequential());

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.succeeded(), 2);
    assert!(report.failures().all(|o| o.expiry == "20250626"));

    let opt = output.path().join("bundles").join("OPT_PINN_TRAIN_DATA_20250529.npz");
    let eqt = output.path().join("bundles").join("EQT_PINN_TRAIN_DATA_20250529.npz");
    assert!(opt.exists() && eqt.exists());

    let options = read_surface(&opt).unwrap();
    assert_eq!(options.features.dim().2, 7);
    assert_eq!(options.expiry, "20250529");
    let equity = read_surface(&eqt).unwrap();
    assert_eq!(equity.uu.dim(), (3, 3));
}

/// Without an equity file the option builder still runs, on the strike fallback.
#[test]
fn test_options_only_without_equity_file() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_inputs(input.path(), "RELIANCE", "20250529");
    fs::remove_file(input.path().join(equity_input_name("RELIANCE", "20250529"))).unwrap();

    let batch = BatchConfig {
        symbol: "RELIANCE".to_string(),
        expiries: vec!["20250529".to_string()],
        input_dir: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        kind: BuilderKind::Options,
    };
    let report = run_batch(&batch, &SurfaceConfig::default());
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.failed(), 0);

    let tensor = read_surface(output.path().join(option_output_name("20250529"))).unwrap();
    assert_eq!(tensor.x.to_vec(), vec![0.0]);
}
