use std::sync::Arc;

use sqlx::PgPool;

use crate::{config::AppConfig, db::OrmConn, realtime::Hub};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub hub: Hub,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(orm: OrmConn, config: AppConfig) -> Self {
        let hub = Hub::new(config.realtime_channel_capacity);
        Self {
            orm,
            hub,
            config: Arc::new(config),
        }
    }

    /// The sqlx pool underneath the ORM connection.
    pub fn pool(&self) -> &PgPool {
        self.orm.get_postgres_connection_pool()
    }
}
