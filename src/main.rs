use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fleet_integrity::config::{EnvironmentConfig, StoreBackend};
use fleet_integrity::database::DatabaseConnection;
use fleet_integrity::repositories::{FleetStore, InMemoryFleetStore, PgFleetStore};
use fleet_integrity::services::ScanService;
use fleet_integrity::utils::clock::system_clock;
use fleet_integrity::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚛 Fleet Integrity & Anomaly Detection Engine");
    info!("=============================================");

    let config = EnvironmentConfig::from_env()?;

    let store: Arc<dyn FleetStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let db_connection = match DatabaseConnection::new_default().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            Arc::new(PgFleetStore::new(db_connection.pool().clone()))
        }
        StoreBackend::Memory => {
            warn!("⚠️ STORE_BACKEND=memory: los datos no se persisten");
            Arc::new(InMemoryFleetStore::new())
        }
    };

    let app_state = AppState::new(config.clone(), store, system_clock());

    // Escaneo periódico
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scan_handle = config.scan_interval().map(|interval| {
        info!("⏰ Escaneo periódico cada {} s", interval.as_secs());
        tokio::spawn(periodic_scan(app_state.scans.clone(), interval, shutdown_rx))
    });

    let app = create_router(app_state);

    let addr: SocketAddr = config.server_url().parse()?;
    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health");
    info!("🚨 Alertas:");
    info!("   POST /api/alerts/scan - Escaneo completo");
    info!("   GET  /api/alerts - Listar alertas");
    info!("   POST /api/alerts/:id/action - Resolver alerta");
    info!("   POST /api/trips/:id/scan - Escanear un viaje");
    info!("   POST /api/maintenance/:id/scan - Escanear una tarea");
    info!("   POST /api/trips/:id/recalculate - Recalcular kmpl");
    info!("🔢 Secuencias:");
    info!("   GET  /api/sequence/issues - Reporte de toda la flota");
    info!("   GET  /api/sequence/vehicles/:id - Análisis de un vehículo");
    info!("📊 Conductores:");
    info!("   GET  /api/drivers/performance?start&end - Métricas");
    info!("   GET  /api/drivers/insights?start&end - Insights");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
    }

    // Detener el escaneo periódico; una pasada en curso termina sus unidades iniciadas
    let _ = shutdown_tx.send(true);
    if let Some(handle) = scan_handle {
        if let Err(e) = handle.await {
            error!("❌ El escaneo periódico terminó con error: {}", e);
        }
    }

    info!("👋 Servidor terminado");
    Ok(())
}

async fn periodic_scan(
    scans: ScanService,
    interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                scans.run_scan(&shutdown).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("🛑 Escaneo periódico detenido");
                    break;
                }
            }
        }
    }
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
