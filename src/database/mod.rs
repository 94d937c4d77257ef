pub mod memory;
pub mod mongo_store;
pub mod store;
pub mod update;

pub use memory::MemoryStore;
pub use mongo_store::MongoStore;
pub use store::DocumentStore;
pub use update::Update;

use mongodb::{Client, Collection, Database};

use crate::utils::error::StoreError;

/// Collection names of the education dataset.
pub mod collections {
    pub const USERS: &str = "users";
    pub const COURSES: &str = "courses";
    pub const ENROLLMENTS: &str = "enrollments";
    pub const ASSIGNMENTS: &str = "assignments";
    pub const SUBMISSIONS: &str = "submissions";
}

const DEFAULT_DATABASE: &str = "eduhub_db";

/// MongoDB connection manager. Acquired once by the caller and handed to
/// the store adapter; dropping it closes the pool.
#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

impl MongoDB {
    /// Connects and prepares indexes. `database` overrides the name given
    /// in the URI; without either, `eduhub_db` is used.
    pub async fn new(uri: &str, database: Option<&str>) -> Result<Self, StoreError> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        // Timeouts
        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let db_name = database
            .map(str::to_string)
            .or_else(|| client_options.default_database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&db_name);

        // Test connection
        db.list_collection_names().await?;
        log::info!("✅ Connected to MongoDB database: {}", db_name);

        let mongodb = Self { client, db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the analytics joins and lookups rely on.
    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        use self::collections::*;
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<mongodb::bson::Document>(USERS);
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        match users.create_index(email_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(email) unique"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let lookup_indexes = [
            (COURSES, "instructorId"),
            (COURSES, "category"),
            (ENROLLMENTS, "courseId"),
            (ENROLLMENTS, "studentId"),
            (ASSIGNMENTS, "courseId"),
            (SUBMISSIONS, "studentId"),
            (SUBMISSIONS, "assignmentId"),
        ];
        for (collection, field) in lookup_indexes {
            let index = IndexModel::builder().keys(doc! { field: 1 }).build();
            match self
                .collection::<mongodb::bson::Document>(collection)
                .create_index(index)
                .await
            {
                Ok(_) => log::info!("   ✅ Index created: {}({})", collection, field),
                Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Check if the connection is healthy
    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.db.list_collection_names().await?;
        Ok(())
    }
}
