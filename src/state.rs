//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection, shared between request handlers and the
    /// background rate-refresh task.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] that owns `connection`.
    pub fn new(connection: Connection) -> Self {
        Self {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }
}
