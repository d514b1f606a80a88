//! Analizador de integridad de secuencias
//!
//! Detecta números de serie duplicados y huecos en la secuencia mensual de
//! viajes de cada vehículo. El análisis por vehículo es una función pura;
//! `SequenceService` lo extiende a toda la flota sobre el record store.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{
    DuplicateTrip, Severity, SequenceAnalysis, SequenceIssue, SequenceIssueType,
    SystemSequenceReport, Trip, Vehicle,
};
use crate::repositories::FleetStore;
use crate::utils::errors::{not_found_error, AppResult};

lazy_static! {
    static ref TRAILING_DIGITS: Regex = Regex::new(r"(\d+)$").expect("valid serial regex");
}

/// Tope de series faltantes listadas por incidencia; `missing_count` conserva el total
pub const MAX_LISTED_MISSING: u64 = 1000;

/// Serie descompuesta en prefijo no numérico y sufijo numérico
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSerial {
    pub prefix: String,
    pub number: u64,
}

/// Extrae el sufijo numérico final. `None` si no hay dígitos al final
/// o si no caben en un u64.
pub fn parse_serial(serial: &str) -> Option<ParsedSerial> {
    let captures = TRAILING_DIGITS.captures(serial)?;
    let digits = captures.get(1)?;
    let number = digits.as_str().parse::<u64>().ok()?;
    Some(ParsedSerial {
        prefix: serial[..digits.start()].to_string(),
        number,
    })
}

/// Reconstruye una serie faltante: prefijo + número con relleno a 3 dígitos
pub fn format_serial(prefix: &str, number: u64) -> String {
    format!("{}{:03}", prefix, number)
}

fn duplicate_severity(trip_count: usize) -> Severity {
    if trip_count >= 3 {
        Severity::High
    } else {
        Severity::Medium
    }
}

fn gap_severity(missing: u64) -> Severity {
    if missing > 5 {
        Severity::High
    } else if missing > 2 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Analiza la secuencia de series de un vehículo
pub fn analyze_vehicle_sequence(vehicle: &Vehicle, trips: &[Trip]) -> SequenceAnalysis {
    let mut analysis = SequenceAnalysis::empty(vehicle.id, &vehicle.registration_number);
    if trips.is_empty() {
        return analysis;
    }

    let mut ordered: Vec<&Trip> = trips.iter().collect();
    ordered.sort_by(|a, b| a.trip_start_date.cmp(&b.trip_start_date));

    analysis.total_trips = ordered.len();
    analysis.expected_sequence_length = expected_sequence_length(&ordered);

    let duplicates = detect_duplicates(&ordered);
    let gaps = detect_gaps(&ordered);

    analysis.actual_sequence_length = ordered
        .iter()
        .filter_map(|t| t.serial())
        .collect::<std::collections::HashSet<_>>()
        .len();
    analysis.duplicate_count = duplicates.len();
    analysis.gap_count = gaps.len();
    analysis.missing_serial_count = gaps.iter().map(|g| g.missing_count).sum();
    analysis.issues = duplicates.into_iter().chain(gaps).collect();

    analysis
}

/// `ceil(días_del_periodo * viajes_por_día)`, con el ritmo diario del mes
/// más activo. Los meses con menos viajes que ese ritmo quedan por debajo
/// de la longitud esperada.
fn expected_sequence_length(ordered: &[&Trip]) -> u64 {
    let (first, last) = match (ordered.first(), ordered.last()) {
        (Some(first), Some(last)) => (first.trip_start_date, last.trip_start_date),
        _ => return 0,
    };
    let days_span = ((last - first).num_days() + 1) as f64;

    let mut months: BTreeMap<String, (NaiveDate, NaiveDate, usize)> = BTreeMap::new();
    for trip in ordered {
        let day = trip.trip_start_date;
        let entry = months
            .entry(day.format("%Y-%m").to_string())
            .or_insert((day, day, 0));
        entry.0 = entry.0.min(day);
        entry.1 = entry.1.max(day);
        entry.2 += 1;
    }
    let trips_per_day = months
        .values()
        .map(|(start, end, count)| *count as f64 / ((*end - *start).num_days() + 1) as f64)
        .fold(0.0, f64::max);

    (days_span * trips_per_day).ceil() as u64
}

fn detect_duplicates(ordered: &[&Trip]) -> Vec<SequenceIssue> {
    let mut by_serial: BTreeMap<&str, Vec<&Trip>> = BTreeMap::new();
    for trip in ordered {
        if let Some(serial) = trip.serial() {
            by_serial.entry(serial).or_default().push(*trip);
        }
    }

    by_serial
        .into_iter()
        .filter(|(_, trips)| trips.len() > 1)
        .map(|(serial, trips)| SequenceIssue {
            issue_type: SequenceIssueType::Duplicate,
            serial_numbers: vec![serial.to_string()],
            severity: duplicate_severity(trips.len()),
            description: format!("Serial {} is shared by {} trips", serial, trips.len()),
            month: None,
            date_range: None,
            missing_count: 0,
            missing_serials: Vec::new(),
            duplicate_trips: trips
                .iter()
                .map(|t| DuplicateTrip { trip_id: t.id, trip_start_date: t.trip_start_date })
                .collect(),
        })
        .collect()
}

struct MonthEntry<'a> {
    serial: &'a str,
    parsed: ParsedSerial,
}

fn detect_gaps(ordered: &[&Trip]) -> Vec<SequenceIssue> {
    // (mes, prefijo) -> entradas; las series sin sufijo numérico no participan
    let mut groups: BTreeMap<(String, String), Vec<MonthEntry>> = BTreeMap::new();
    let mut month_dates: BTreeMap<String, (NaiveDate, NaiveDate)> = BTreeMap::new();

    for trip in ordered {
        let month = trip.trip_start_date.format("%Y-%m").to_string();
        let range = month_dates
            .entry(month.clone())
            .or_insert((trip.trip_start_date, trip.trip_start_date));
        range.0 = range.0.min(trip.trip_start_date);
        range.1 = range.1.max(trip.trip_start_date);

        let Some(serial) = trip.serial() else { continue };
        let Some(parsed) = parse_serial(serial) else { continue };
        groups
            .entry((month, parsed.prefix.clone()))
            .or_default()
            .push(MonthEntry { serial, parsed });
    }

    let mut issues = Vec::new();
    for ((month, _prefix), mut entries) in groups {
        if entries.len() < 2 {
            continue;
        }
        entries.sort_by_key(|e| e.parsed.number);
        entries.dedup_by_key(|e| e.parsed.number);

        let date_range = month_dates.get(&month).copied();
        for pair in entries.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let missing = next.parsed.number - current.parsed.number - 1;
            if missing == 0 {
                continue;
            }

            let listed_end = next
                .parsed
                .number
                .min(current.parsed.number.saturating_add(1 + MAX_LISTED_MISSING));
            let missing_serials: Vec<String> = (current.parsed.number + 1..listed_end)
                .map(|n| format_serial(&current.parsed.prefix, n))
                .collect();

            issues.push(SequenceIssue {
                issue_type: SequenceIssueType::Gap,
                serial_numbers: vec![current.serial.to_string(), next.serial.to_string()],
                severity: gap_severity(missing),
                description: format!(
                    "{} serial(s) missing between {} and {} in {}",
                    missing, current.serial, next.serial, month
                ),
                month: Some(month.clone()),
                date_range,
                missing_count: missing,
                missing_serials,
                duplicate_trips: Vec::new(),
            });
        }
    }

    issues
}

/// Servicio de secuencias sobre el record store
#[derive(Clone)]
pub struct SequenceService {
    store: Arc<dyn FleetStore>,
}

impl SequenceService {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    pub async fn analyze_vehicle(&self, vehicle_id: Uuid) -> AppResult<SequenceAnalysis> {
        let vehicle = self
            .store
            .get_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &vehicle_id.to_string()))?;
        let trips = self.store.list_vehicle_trips(vehicle_id).await?;
        Ok(analyze_vehicle_sequence(&vehicle, &trips))
    }

    /// Informe de toda la flota. Un vehículo cuya lectura falla se registra
    /// y se omite; el informe nunca aborta por un vehículo.
    pub async fn system_wide_issues(&self) -> AppResult<SystemSequenceReport> {
        let vehicles = self.store.list_vehicles(true).await?;
        info!("🔎 Analizando secuencias de {} vehículos activos", vehicles.len());

        let mut report = SystemSequenceReport::default();
        for vehicle in &vehicles {
            let trips = match self.store.list_vehicle_trips(vehicle.id).await {
                Ok(trips) => trips,
                Err(e) => {
                    error!(
                        "❌ Error leyendo viajes del vehículo {} ({}): {}",
                        vehicle.registration_number, vehicle.id, e
                    );
                    continue;
                }
            };

            report.total_vehicles_checked += 1;
            let analysis = analyze_vehicle_sequence(vehicle, &trips);
            if !analysis.has_issues() {
                continue;
            }

            warn!(
                "⚠️ Vehículo {}: {} huecos, {} duplicados",
                vehicle.registration_number, analysis.gap_count, analysis.duplicate_count
            );
            report.vehicles_with_issues += 1;
            report.total_issues += analysis.issues.len();
            for issue in &analysis.issues {
                report.issues_by_severity.record(issue.severity);
            }
            report.vehicle_analyses.push(analysis);
        }

        info!(
            "📊 Secuencias: {} vehículos revisados, {} con incidencias, {} incidencias",
            report.total_vehicles_checked, report.vehicles_with_issues, report.total_issues
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn vehicle() -> Vehicle {
        Vehicle {
            id: Uuid::new_v4(),
            registration_number: "ABC-1234".to_string(),
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

    fn trip(vehicle_id: Uuid, serial: Option<&str>, start: NaiveDate) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            vehicle_id,
            driver_id: None,
            trip_serial_number: serial.map(str::to_string),
            trip_start_date: start,
            trip_end_date: start,
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
        }
    }

    #[test]
    fn test_parse_serial() {
        assert_eq!(
            parse_serial("ABC1234007"),
            Some(ParsedSerial { prefix: "ABC".to_string(), number: 1234007 })
        );
        assert_eq!(
            parse_serial("T-2024-015"),
            Some(ParsedSerial { prefix: "T-2024-".to_string(), number: 15 })
        );
        assert_eq!(parse_serial("NODIGITS"), None);
        assert_eq!(format_serial("T-", 7), "T-007");
    }

    #[test]
    fn test_gap_in_month_lists_missing_serials() {
        let v = vehicle();
        let trips = vec![
            trip(v.id, Some("ABC1234001"), date(2024, 3, 1)),
            trip(v.id, Some("ABC1234002"), date(2024, 3, 4)),
            trip(v.id, Some("ABC1234003"), date(2024, 3, 9)),
            trip(v.id, Some("ABC1234006"), date(2024, 3, 20)),
        ];

        let analysis = analyze_vehicle_sequence(&v, &trips);
        assert_eq!(analysis.gap_count, 1);
        assert_eq!(analysis.duplicate_count, 0);

        let gap = &analysis.issues[0];
        assert_eq!(gap.issue_type, SequenceIssueType::Gap);
        assert_eq!(gap.missing_serials, vec!["ABC1234004", "ABC1234005"]);
        assert_eq!(gap.severity, Severity::Low);
        assert_eq!(gap.month.as_deref(), Some("2024-03"));
        assert_eq!(gap.date_range, Some((date(2024, 3, 1), date(2024, 3, 20))));
    }

    #[test]
    fn test_gap_severity_thresholds() {
        assert_eq!(gap_severity(2), Severity::Low);
        assert_eq!(gap_severity(3), Severity::Medium);
        assert_eq!(gap_severity(5), Severity::Medium);
        assert_eq!(gap_severity(6), Severity::High);
    }

    #[test]
    fn test_gaps_do_not_cross_months() {
        let v = vehicle();
        let trips = vec![
            trip(v.id, Some("T-001"), date(2024, 3, 30)),
            trip(v.id, Some("T-010"), date(2024, 4, 2)),
        ];

        let analysis = analyze_vehicle_sequence(&v, &trips);
        assert_eq!(analysis.gap_count, 0);
        assert!(analysis.issues.is_empty());
    }

    #[test]
    fn test_duplicates_and_severity() {
        let v = vehicle();
        let trips = vec![
            trip(v.id, Some("T-001"), date(2024, 3, 1)),
            trip(v.id, Some("T-001"), date(2024, 3, 2)),
            trip(v.id, Some("T-002"), date(2024, 3, 3)),
            trip(v.id, Some("T-002"), date(2024, 3, 4)),
            trip(v.id, Some("T-002"), date(2024, 3, 5)),
            trip(v.id, Some("T-003"), date(2024, 3, 6)),
        ];

        let analysis = analyze_vehicle_sequence(&v, &trips);
        assert_eq!(analysis.duplicate_count, 2);
        assert_eq!(analysis.gap_count, 0);

        let t1 = analysis.issues.iter().find(|i| i.serial_numbers[0] == "T-001").unwrap();
        assert_eq!(t1.severity, Severity::Medium);
        assert_eq!(t1.duplicate_trips.len(), 2);
        let t2 = analysis.issues.iter().find(|i| i.serial_numbers[0] == "T-002").unwrap();
        assert_eq!(t2.severity, Severity::High);
    }

    #[test]
    fn test_malformed_serials_are_not_applicable() {
        let v = vehicle();
        let trips = vec![
            trip(v.id, None, date(2024, 3, 1)),
            trip(v.id, Some("MANUAL"), date(2024, 3, 2)),
            trip(v.id, Some("T-004"), date(2024, 3, 3)),
        ];

        let analysis = analyze_vehicle_sequence(&v, &trips);
        assert_eq!(analysis.total_trips, 3);
        assert!(analysis.issues.is_empty());
    }

    #[test]
    fn test_empty_vehicle_has_zero_counters() {
        let v = vehicle();
        let analysis = analyze_vehicle_sequence(&v, &[]);
        assert_eq!(analysis, SequenceAnalysis::empty(v.id, "ABC-1234"));
    }

    #[test]
    fn test_huge_gap_listing_is_capped() {
        let v = vehicle();
        let trips = vec![
            trip(v.id, Some("X1"), date(2024, 3, 1)),
            trip(v.id, Some("X5000"), date(2024, 3, 2)),
        ];

        let analysis = analyze_vehicle_sequence(&v, &trips);
        let gap = &analysis.issues[0];
        assert_eq!(gap.missing_count, 4998);
        assert_eq!(gap.missing_serials.len() as u64, MAX_LISTED_MISSING);
        assert_eq!(gap.missing_serials[0], "X002");
    }

    #[test]
    fn test_gap_near_u64_limit_does_not_overflow() {
        let v = vehicle();
        let trips = vec![
            trip(v.id, Some("X18446744073709551000"), date(2024, 3, 1)),
            trip(v.id, Some("X18446744073709551615"), date(2024, 3, 2)),
        ];

        let analysis = analyze_vehicle_sequence(&v, &trips);
        let gap = &analysis.issues[0];
        assert_eq!(gap.missing_count, 614);
        assert_eq!(gap.missing_serials.len(), 614);
        assert_eq!(gap.missing_serials[0], "X18446744073709551001");
        assert_eq!(gap.missing_serials[613], "X18446744073709551614");
    }

    #[test]
    fn test_expected_length_follows_busiest_month() {
        let v = vehicle();
        // Marzo: 4 viajes en 4 días; abril: 1 viaje
        let trips = vec![
            trip(v.id, Some("T-001"), date(2024, 3, 1)),
            trip(v.id, Some("T-002"), date(2024, 3, 2)),
            trip(v.id, Some("T-003"), date(2024, 3, 3)),
            trip(v.id, Some("T-004"), date(2024, 3, 4)),
            trip(v.id, Some("T-005"), date(2024, 4, 9)),
        ];

        let analysis = analyze_vehicle_sequence(&v, &trips);
        // 1 de marzo a 9 de abril: 40 días a 1 viaje/día
        assert_eq!(analysis.expected_sequence_length, 40);
        assert_eq!(analysis.total_trips, 5);
    }
}
