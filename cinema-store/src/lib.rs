pub mod app_config;
pub mod database;
pub mod memory;
pub mod redis_repo;
pub mod reservation_repo;
pub mod show_repo;

pub use database::DbClient;
pub use memory::MemoryStore;
pub use redis_repo::RedisClient;
pub use reservation_repo::PgReservationRepository;
pub use show_repo::PgShowRepository;
