mod common;

use fleet_integrity::models::{SequenceIssueType, Severity, VehicleStatus};
use fleet_integrity::utils::errors::AppError;

use common::{date, test_app, vehicle, TripBuilder};

#[tokio::test]
async fn test_system_report_aggregates_active_vehicles() {
    let app = test_app();

    let gapped = vehicle("ABC-1234");
    let duplicated = vehicle("XYZ-0001");
    let mut retired = vehicle("OLD-0002");
    retired.status = VehicleStatus::Retired;
    for v in [&gapped, &duplicated, &retired] {
        app.store.put_vehicle(v.clone()).await;
    }

    for (serial, day) in [("ABC1234001", 1), ("ABC1234002", 3), ("ABC1234003", 5), ("ABC1234006", 9)] {
        app.store
            .put_trip(TripBuilder::new(gapped.id, date(2024, 3, day)).serial(serial).build())
            .await;
    }
    // Serie repetida en dos viajes -> duplicado de severidad media
    for day in [2, 4] {
        app.store
            .put_trip(TripBuilder::new(duplicated.id, date(2024, 3, day)).serial("XYZ0001010").build())
            .await;
    }
    // Los vehículos retirados no se revisan
    app.store
        .put_trip(TripBuilder::new(retired.id, date(2024, 3, 1)).serial("OLD1").build())
        .await;
    app.store
        .put_trip(TripBuilder::new(retired.id, date(2024, 3, 2)).serial("OLD9").build())
        .await;

    let report = app.state.sequences.system_wide_issues().await.unwrap();
    assert_eq!(report.total_vehicles_checked, 2);
    assert_eq!(report.vehicles_with_issues, 2);
    assert_eq!(report.total_issues, 2);
    assert_eq!(report.issues_by_severity.low, 1);
    assert_eq!(report.issues_by_severity.medium, 1);
    assert_eq!(report.issues_by_severity.high, 0);

    let gapped_analysis = report
        .vehicle_analyses
        .iter()
        .find(|a| a.vehicle_id == gapped.id)
        .unwrap();
    assert_eq!(gapped_analysis.issues[0].issue_type, SequenceIssueType::Gap);
    assert_eq!(
        gapped_analysis.issues[0].missing_serials,
        vec!["ABC1234004".to_string(), "ABC1234005".to_string()]
    );
}

#[tokio::test]
async fn test_failing_vehicle_is_skipped_in_report() {
    let app = test_app();
    let broken = vehicle("BRK-0001");
    let ok = vehicle("OK-0002");
    app.store.put_vehicle(broken.clone()).await;
    app.store.put_vehicle(ok.clone()).await;
    for day in [1, 2, 3] {
        app.store
            .put_trip(TripBuilder::new(ok.id, date(2024, 5, day)).serial("OK0002001").build())
            .await;
    }
    app.store.fail_vehicle_trip_reads(broken.id).await;

    let report = app.state.sequences.system_wide_issues().await.unwrap();
    assert_eq!(report.total_vehicles_checked, 1);
    assert_eq!(report.vehicles_with_issues, 1);
    assert_eq!(report.vehicle_analyses[0].issues[0].severity, Severity::High);
}

#[tokio::test]
async fn test_single_vehicle_analysis() {
    let app = test_app();
    let empty = vehicle("EMP-0003");
    app.store.put_vehicle(empty.clone()).await;

    let analysis = app.state.sequences.analyze_vehicle(empty.id).await.unwrap();
    assert_eq!(analysis.total_trips, 0);
    assert!(analysis.issues.is_empty());

    let missing = app.state.sequences.analyze_vehicle(uuid::Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}
