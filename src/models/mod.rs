//! Modelos del sistema
//!
//! Este módulo contiene los registros que el motor lee del record store
//! (viajes, vehículos, conductores, mantenimiento), las alertas que escribe
//! y los resultados derivados (secuencias, métricas, insights).

pub mod alert;
pub mod driver;
pub mod maintenance;
pub mod performance;
pub mod sequence;
pub mod trip;
pub mod vehicle;

pub use alert::*;
pub use driver::Driver;
pub use maintenance::{CostSource, MaintenanceTask, ServiceGroup};
pub use performance::*;
pub use sequence::*;
pub use trip::Trip;
pub use vehicle::{DocumentCost, Vehicle, VehicleStatus};
