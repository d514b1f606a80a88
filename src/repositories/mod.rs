//! Repositorios
//!
//! Acceso al record store: el trait `FleetStore`, su implementación
//! PostgreSQL (un repositorio por entidad) y la implementación en memoria.

pub mod alert_repository;
pub mod driver_repository;
pub mod maintenance_repository;
pub mod memory_store;
pub mod pg_store;
pub mod store;
pub mod trip_repository;
pub mod vehicle_repository;

pub use memory_store::InMemoryFleetStore;
pub use pg_store::PgFleetStore;
pub use store::FleetStore;
