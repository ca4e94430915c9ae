pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod events;
pub mod payment_repo;
pub mod redis_repo;

pub use app_config::Config;
pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use events::EventProducer;
pub use payment_repo::PgPaymentRepository;
pub use redis_repo::RedisClient;
