pub mod bs;
pub mod iv;

/// Utility functions shared by the option pipeline
pub mod utils {
    /// Calculate log-moneyness: ln(K/S); missing for a non-positive spot
    pub fn log_moneyness(strike: f64, spot: f64) -> Option<f64> {
        if spot > 0.0 && strike > 0.0 {
            Some((strike / spot).ln())
        } else {
            None
        }
    }

    /// Convert calendar days to expiry into a year fraction
    pub fn years_to_expiry(dte: f64, days_per_year: f64) -> f64 {
        dte / days_per_year
    }
}
