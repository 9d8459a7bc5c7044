use sea_orm::DatabaseConnection;

use crate::config::AuthSettings;

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub auth: AuthSettings,
}
