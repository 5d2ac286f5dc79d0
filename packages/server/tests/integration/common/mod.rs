use std::net::SocketAddr;
use std::sync::Arc;

use ::common::storage::filesystem::FilesystemBlobStore;
use reqwest::Client;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tempfile::TempDir;

use support_server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, IndexingConfig, ServerConfig,
    StorageConfig,
};
use support_server::extract::DocumentExtractor;
use support_server::files::FileService;
use support_server::knowledge::{IndexingWorker, SeaOrmKnowledgeIndex};
use support_server::state::AppState;
use support_server::utils::jwt;

pub const JWT_SECRET: &str = "test-secret-for-integration-tests";
pub const MAX_BLOB_SIZE: u64 = 64 * 1024;

pub mod routes {
    pub const FILES: &str = "/api/v1/files";

    pub fn file(entry_id: &str) -> String {
        format!("/api/v1/files/{entry_id}")
    }

    pub fn files_page(num_items: u64, cursor: Option<&str>, category: Option<&str>) -> String {
        let mut path = format!("/api/v1/files?num_items={num_items}");
        if let Some(cursor) = cursor {
            path.push_str(&format!("&cursor={cursor}"));
        }
        if let Some(category) = category {
            path.push_str(&format!("&category={category}"));
        }
        path
    }
}

/// A running test server backed by SQLite and a temporary blob directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub public_url: String,
    worker: IndexingWorker,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

/// Multipart upload as the dashboard sends it.
#[derive(Default)]
pub struct Upload<'a> {
    pub filename: &'a str,
    pub bytes: &'a [u8],
    pub mime_type: Option<&'a str>,
    pub category: Option<&'a str>,
}

impl<'a> Upload<'a> {
    pub fn new(filename: &'a str, bytes: &'a [u8]) -> Self {
        Self {
            filename,
            bytes,
            ..Default::default()
        }
    }

    pub fn category(mut self, category: &'a str) -> Self {
        self.category = Some(category);
        self
    }

    pub fn mime_type(mut self, mime_type: &'a str) -> Self {
        self.mime_type = Some(mime_type);
        self
    }

    fn into_form(self) -> Form {
        let part = Part::bytes(self.bytes.to_vec()).file_name(self.filename.to_string());
        let mut form = Form::new().part("file", part);
        if let Some(mime_type) = self.mime_type {
            form = form.text("mime_type", mime_type.to_string());
        }
        if let Some(category) = self.category {
            form = form.text("category", category.to_string());
        }
        form
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("app.db").display());

        let db = support_server::database::init_db(&db_url)
            .await
            .expect("Failed to initialize test database");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();
        let public_url = format!("http://{addr}");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: addr.port(),
                public_url: public_url.clone(),
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig { url: db_url },
            auth: AuthConfig {
                jwt_secret: JWT_SECRET.to_string(),
            },
            storage: StorageConfig {
                root: dir.path().join("blobs"),
                max_blob_size: MAX_BLOB_SIZE,
            },
            indexing: IndexingConfig::default(),
        };

        let blob_store = Arc::new(
            FilesystemBlobStore::new(
                app_config.storage.root.clone(),
                app_config.storage.max_blob_size,
            )
            .await
            .expect("Failed to initialize blob store"),
        );
        let files = Arc::new(FileService::new(
            blob_store.clone(),
            Arc::new(SeaOrmKnowledgeIndex::new(db.clone())),
            Arc::new(DocumentExtractor),
            public_url.clone(),
        ));
        let worker = IndexingWorker::new(db.clone(), app_config.indexing.clone());

        let state = AppState {
            config: app_config,
            files,
            blob_store,
        };

        let app = support_server::build_router(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            public_url,
            worker,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Token for a member of `org_id`.
    pub fn token(&self, org_id: &str) -> String {
        jwt::sign(
            &format!("user_of_{org_id}"),
            Some(org_id),
            JWT_SECRET,
            chrono::Duration::hours(1),
        )
        .expect("Failed to sign token")
    }

    /// Token for an identity without an active organization.
    pub fn token_without_org(&self) -> String {
        jwt::sign("user_no_org", None, JWT_SECRET, chrono::Duration::hours(1))
            .expect("Failed to sign token")
    }

    /// Run one indexing pass and return how many entries changed status.
    pub async fn index_pending(&self) -> usize {
        self.worker.run_once().await.expect("Indexing pass failed")
    }

    pub async fn upload(&self, upload: Upload<'_>, token: Option<&str>) -> TestResponse {
        let mut req = self.client.post(self.url(routes::FILES));
        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        let res = req
            .multipart(upload.into_form())
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Upload a file for an organization and return the response body.
    pub async fn upload_ok(&self, org_id: &str, upload: Upload<'_>) -> Value {
        let res = self.upload(upload, Some(&self.token(org_id))).await;
        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        res.body
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Fetch an absolute URL, as returned in `url` fields.
    pub async fn get_absolute(&self, url: &str, if_none_match: Option<&str>) -> TestResponse {
        let mut req = self.client.get(url);
        if let Some(etag) = if_none_match {
            req = req.header("If-None-Match", etag);
        }
        let res = req.send().await.expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    /// List every file of an organization, following cursors.
    pub async fn list_all(&self, org_id: &str) -> Vec<Value> {
        let token = self.token(org_id);
        let mut files = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let res = self
                .get_with_token(&routes::files_page(100, cursor.as_deref(), None), &token)
                .await;
            assert_eq!(res.status, 200, "list failed: {}", res.text);
            files.extend(res.body["page"].as_array().cloned().unwrap_or_default());
            if res.body["is_done"].as_bool().unwrap() {
                return files;
            }
            cursor = res.body["continue_cursor"].as_str().map(str::to_string);
        }
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            text,
            body,
        }
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}
