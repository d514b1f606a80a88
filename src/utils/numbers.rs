//! Helpers numéricos compartidos por detectores e insights

/// Redondea a `decimals` decimales
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Diferencia porcentual de `actual` respecto a `reference`.
/// Devuelve 0 si la referencia es 0.
pub fn percent_difference(actual: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        return 0.0;
    }
    (actual - reference) / reference * 100.0
}

/// División que devuelve 0 cuando el divisor no es positivo
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
