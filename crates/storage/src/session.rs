use std::ops::Deref;

use bson::doc;
use eyre::{Context as _, Error};
use log::info;
use mongodb::{options::ClientOptions, Client, Database};

const APP_NAME: &str = "workload-service";

/// Handle to the workload database. Cheap to clone.
#[derive(Clone)]
pub struct Db {
    _client: Client,
    db: Database,
}

impl Db {
    pub(crate) async fn new(uri: &str, db_name: &str) -> Result<Self, Error> {
        let mut options = ClientOptions::parse(uri)
            .await
            .context("Invalid MongoDB uri")?;
        options.app_name = Some(APP_NAME.to_string());
        let client = Client::with_options(options).context("Failed to connect to MongoDB")?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 })
            .await
            .context("Failed to ping MongoDB")?;
        info!("Connected to database {}", db_name);
        Ok(Db {
            _client: client,
            db,
        })
    }
}

impl Deref for Db {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}
