#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use fleet_integrity::config::EnvironmentConfig;
use fleet_integrity::models::{Driver, MaintenanceTask, ServiceGroup, Trip, Vehicle, VehicleStatus};
use fleet_integrity::repositories::{FleetStore, InMemoryFleetStore};
use fleet_integrity::utils::clock::{Clock, ManualClock};
use fleet_integrity::AppState;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn vehicle(registration: &str) -> Vehicle {
    Vehicle {
        id: Uuid::new_v4(),
        registration_number: registration.to_string(),
        current_odometer: 0.0,
        status: VehicleStatus::Active,
        insurance_cost: None,
        fitness_cost: None,
        permit_cost: None,
        puc_cost: None,
        tax_cost: None,
        other_documents: Vec::new(),
    }
}

pub fn driver(name: &str, vehicle_id: Option<Uuid>) -> Driver {
    Driver {
        id: Uuid::new_v4(),
        name: name.to_string(),
        primary_vehicle_id: vehicle_id,
    }
}

/// Builder de viajes con valores neutros (sin repostaje, sin anomalías)
pub struct TripBuilder {
    trip: Trip,
}

impl TripBuilder {
    pub fn new(vehicle_id: Uuid, day: NaiveDate) -> Self {
        Self {
            trip: Trip {
                id: Uuid::new_v4(),
                vehicle_id,
                driver_id: None,
                trip_serial_number: None,
                trip_start_date: day,
                trip_end_date: day,
                start_km: 0.0,
                end_km: 100.0,
                fuel_quantity: None,
                refueling_done: false,
                calculated_kmpl: None,
                route_deviation: None,
                gross_weight: None,
                total_expense: None,
                total_fuel_cost: None,
                total_road_expenses: None,
                short_trip: false,
            },
        }
    }

    pub fn serial(mut self, serial: &str) -> Self {
        self.trip.trip_serial_number = Some(serial.to_string());
        self
    }

    pub fn driver(mut self, driver_id: Uuid) -> Self {
        self.trip.driver_id = Some(driver_id);
        self
    }

    pub fn km(mut self, start: f64, end: f64) -> Self {
        self.trip.start_km = start;
        self.trip.end_km = end;
        self
    }

    pub fn refuel(mut self, fuel: f64) -> Self {
        self.trip.fuel_quantity = Some(fuel);
        self.trip.refueling_done = true;
        self
    }

    pub fn kmpl(mut self, kmpl: f64) -> Self {
        self.trip.calculated_kmpl = Some(kmpl);
        self
    }

    pub fn deviation(mut self, percent: f64) -> Self {
        self.trip.route_deviation = Some(percent);
        self
    }

    pub fn expense(mut self, total: f64) -> Self {
        self.trip.total_expense = Some(total);
        self
    }

    pub fn short(mut self) -> Self {
        self.trip.short_trip = true;
        self
    }

    pub fn build(self) -> Trip {
        self.trip
    }
}

pub fn task(vehicle_id: Uuid, day: NaiveDate, task_type: &str) -> MaintenanceTask {
    MaintenanceTask {
        id: Uuid::new_v4(),
        vehicle_id,
        start_date: day,
        task_type: task_type.to_string(),
        service_groups: Vec::new(),
        actual_cost: None,
        estimated_cost: None,
        downtime_days: None,
    }
}

pub fn task_with_groups(vehicle_id: Uuid, day: NaiveDate, costs: &[f64]) -> MaintenanceTask {
    MaintenanceTask {
        service_groups: costs.iter().map(|c| ServiceGroup { cost: Some(*c) }).collect(),
        ..task(vehicle_id, day, "repair")
    }
}

pub struct TestApp {
    pub store: InMemoryFleetStore,
    pub clock: ManualClock,
    pub state: AppState,
}

pub fn test_app() -> TestApp {
    let store = InMemoryFleetStore::new();
    let clock = ManualClock::new(chrono::Utc::now());
    let shared: Arc<dyn FleetStore> = Arc::new(store.clone());
    let clock_handle: Arc<dyn Clock> = Arc::new(clock.clone());
    let state = AppState::new(EnvironmentConfig::default(), shared, clock_handle);
    TestApp { store, clock, state }
}
