//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, reloj inyectable
//! y helpers numéricos.

pub mod clock;
pub mod errors;
pub mod numbers;

pub use errors::{AppError, AppResult};
