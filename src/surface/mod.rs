//! Surface builders and the tensor bundle they produce

pub mod equity;
pub mod grid;
pub mod iv_fill;
pub mod option;
pub mod tensor;

pub use equity::{build_equity_surface, build_equity_surface_from_csv};
pub use grid::{build_grid, SurfaceGrid};
pub use iv_fill::{fill_missing_iv, IvFill};
pub use option::{
    build_option_surface, build_option_surface_from_csv, build_option_surface_with, OptionSurface,
    SurfaceDiagnostics,
};
pub use tensor::{validity_mask, SurfaceTensor, EQUITY_CHANNELS, OPTION_CHANNELS};
