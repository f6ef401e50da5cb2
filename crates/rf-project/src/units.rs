//! Conversions between field units (case and result files) and SI.

use rf_core::{bar, days, m3, m3_per_day, pa, per_bar, s, to_bar, to_days, to_m3_per_day};

pub fn pressure_pa(bar_value: f64) -> f64 {
    bar(bar_value).value
}

pub fn time_s(days_value: f64) -> f64 {
    days(days_value).value
}

pub fn rate_m3_per_s(m3_per_day_value: f64) -> f64 {
    m3_per_day(m3_per_day_value).value
}

/// Transmissibility or productivity index, m³/(day·bar) to m³/(s·Pa).
pub fn mobility_si(m3_per_day_bar: f64) -> f64 {
    per_bar(m3_per_day(m3_per_day_bar).value)
}

pub fn compressibility_per_pa(per_bar_value: f64) -> f64 {
    per_bar(per_bar_value)
}

pub fn pressure_bar(pa_value: f64) -> f64 {
    to_bar(pa(pa_value))
}

pub fn time_days(s_value: f64) -> f64 {
    to_days(s(s_value))
}

pub fn rate_m3_per_day(m3_per_s_value: f64) -> f64 {
    to_m3_per_day(m3(m3_per_s_value) / s(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(pressure_pa(1.0), 1e5);
        assert_eq!(time_s(1.0), 86_400.0);
        assert!((rate_m3_per_s(86_400.0) - 1.0).abs() < 1e-12);
        assert!((mobility_si(86_400.0) - 1e-5).abs() < 1e-18);
        assert!((compressibility_per_pa(1e-4) - 1e-9).abs() < 1e-21);
    }

    #[test]
    fn si_back_to_field() {
        assert!((pressure_bar(pressure_pa(187.5)) - 187.5).abs() < 1e-9);
        assert!((time_days(time_s(42.0)) - 42.0).abs() < 1e-12);
        assert!((rate_m3_per_day(rate_m3_per_s(650.0)) - 650.0).abs() < 1e-9);
    }
}
