//! Tick data ingestion: CSV loading, row cleaning and spot alignment.

pub mod loader;
pub mod spot;
pub mod types;

pub use loader::{
    clean_equity_rows, clean_option_rows, clean_underlying_rows, coerce_f64, load_equity_ticks,
    load_equity_ticks_from_path, load_option_quotes, load_option_quotes_from_path,
    load_underlying, load_underlying_from_path, parse_timestamp, RawEquityRow, RawOptionRow,
};
pub use spot::{align_spot, SpotSource};
pub use types::{EquityTick, LoadReport, OptionSide, Quote, UnderlyingTick};
