use std::net::SocketAddr;
use std::sync::Arc;

use stayline_api::{app, state::{AppState, Governors}};
use stayline_core::counter::CounterStore;
use stayline_payments::{ChapaGateway, GatewayConfig, PaymentReconciler};
use stayline_store::{Config, DbClient, EventProducer, PgBookingRepository, PgPaymentRepository, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stayline_api=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Stayline API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");
    let db = Arc::new(db);

    let redis = Arc::new(
        RedisClient::new(&config.redis.url)
            .await
            .expect("Failed to connect to Redis"),
    );

    let kafka = Arc::new(
        EventProducer::new(&config.kafka.brokers, &config.kafka.confirmation_topic)
            .expect("Failed to create Kafka producer"),
    );

    let gateway = ChapaGateway::new(GatewayConfig {
        init_url: config.gateway.init_url.clone(),
        verify_url: config.gateway.verify_url.clone(),
        secret_key: config.gateway.secret_key.clone(),
        timeout_seconds: config.gateway.timeout_seconds,
    })
    .expect("Failed to build gateway client");

    let counter_store: Arc<dyn CounterStore> = redis.clone();
    let reconciler = PaymentReconciler::new(
        Arc::new(PgBookingRepository::new(db.pool.clone())),
        Arc::new(PgPaymentRepository::new(db.pool.clone())),
        Arc::new(gateway),
        kafka.clone(),
        config.gateway.callback_url.clone(),
    );

    let app_state = AppState {
        db,
        redis,
        governors: Arc::new(Governors::new(counter_store, &config.rate_limits)),
        reconciler: Arc::new(reconciler),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
