//! In-memory stores and an HTTP harness for router-level tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::users::User;
use crate::auth::{TokenKeys, TokenType, UserStore};
use crate::error::StoreError;
use crate::routes::tasks::dto::{NewTask, TaskChanges};
use crate::routes::tasks::model::Task;
use crate::routes::tasks::queries::{TaskFilter, TaskStore};
use crate::state::AppState;

pub const TEST_PASSWORD: &str = "testpass123";
const TEST_SECRET: &str = "test-secret";

#[derive(Default)]
struct TaskTable {
    rows: Vec<Task>,
    next_id: i64,
    last_created: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct MemoryTaskStore {
    table: Mutex<TaskTable>,
}

impl MemoryTaskStore {
    pub fn snapshot(&self) -> Vec<Task> {
        self.table.lock().unwrap().rows.clone()
    }

    /// Mirrors the `ON DELETE CASCADE` on `tasks.owner_id`.
    pub fn remove_owner(&self, owner_id: Uuid) {
        self.table.lock().unwrap().rows.retain(|t| t.owner_id != owner_id);
    }

    fn matching(table: &TaskTable, owner_id: Uuid, filter: TaskFilter) -> Vec<Task> {
        let mut rows: Vec<Task> = table
            .rows
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .filter(|t| filter.is_completed.map_or(true, |c| t.is_completed == c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create_task(&self, owner_id: Uuid, task: &NewTask) -> Result<Task, StoreError> {
        let mut table = self.table.lock().unwrap();
        table.next_id += 1;

        // Strictly increasing timestamps keep ordering assertions deterministic.
        let now = Utc::now();
        let created_at = match table.last_created {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        table.last_created = Some(created_at);

        let row = Task {
            id: table.next_id,
            owner_id,
            title: task.title.clone(),
            description: task.description.clone(),
            created_at,
            is_completed: task.is_completed,
        };
        table.rows.push(row.clone());
        Ok(row)
    }

    async fn list_tasks(
        &self,
        owner_id: Uuid,
        filter: TaskFilter,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Task>, i64), StoreError> {
        let table = self.table.lock().unwrap();
        let rows = Self::matching(&table, owner_id, filter);
        let total = rows.len() as i64;

        let offset = page.saturating_sub(1) as usize * page_size as usize;
        let items = rows.into_iter().skip(offset).take(page_size as usize).collect();
        Ok((items, total))
    }

    async fn get_task(&self, owner_id: Uuid, id: i64) -> Result<Option<Task>, StoreError> {
        let table = self.table.lock().unwrap();
        Ok(table
            .rows
            .iter()
            .find(|t| t.id == id && t.owner_id == owner_id)
            .cloned())
    }

    async fn update_task(
        &self,
        owner_id: Uuid,
        id: i64,
        changes: &TaskChanges,
    ) -> Result<Option<Task>, StoreError> {
        let mut table = self.table.lock().unwrap();
        let Some(row) = table
            .rows
            .iter_mut()
            .find(|t| t.id == id && t.owner_id == owner_id)
        else {
            return Ok(None);
        };

        if let Some(title) = &changes.title {
            row.title = title.clone();
        }
        if let Some(description) = &changes.description {
            row.description = description.clone();
        }
        if let Some(is_completed) = changes.is_completed {
            row.is_completed = is_completed;
        }
        Ok(Some(row.clone()))
    }

    async fn delete_task(&self, owner_id: Uuid, id: i64) -> Result<bool, StoreError> {
        let mut table = self.table.lock().unwrap();
        let before = table.rows.len();
        table.rows.retain(|t| !(t.id == id && t.owner_id == owner_id));
        Ok(table.rows.len() < before)
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn insert(&self, username: &str, password_hash: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            date_joined: Utc::now(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn set_active(&self, id: Uuid, active: bool) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.is_active = active;
        }
    }

    pub fn remove(&self, id: Uuid) {
        self.users.lock().unwrap().retain(|u| u.id != id);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        if self
            .users
            .lock()
            .unwrap()
            .iter()
            .any(|u| u.username == username)
        {
            return Err(StoreError::Duplicate("username"));
        }
        Ok(self.insert(username, password_hash))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}

/// The full router wired to in-memory stores.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub tasks: Arc<MemoryTaskStore>,
    pub users: Arc<MemoryUserStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_page_size(10).await
    }

    pub async fn with_page_size(page_size: u32) -> Self {
        Self::with_keys(TokenKeys::new(TEST_SECRET, 300, 86_400), page_size)
    }

    pub fn with_keys(keys: TokenKeys, page_size: u32) -> Self {
        let tasks = Arc::new(MemoryTaskStore::default());
        let users = Arc::new(MemoryUserStore::default());

        let state = AppState {
            tasks: tasks.clone(),
            users: users.clone(),
            tokens: Arc::new(keys),
            page_size,
            public_base_url: None,
        };

        Self {
            router: crate::routes::routes(state.clone()),
            state,
            tasks,
            users,
        }
    }

    /// Sends one request with `Host: testserver` and returns the status and
    /// the JSON body (`Null` when empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "testserver");

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    /// Deletes the user and, like the schema, every task they own.
    pub fn remove_user(&self, user_id: Uuid) {
        self.users.remove(user_id);
        self.tasks.remove_owner(user_id);
    }

    /// A user inserted straight into the store plus a fresh access token.
    pub async fn user_with_token(&self, username: &str) -> (Uuid, String) {
        let user = self.users.insert(username, "!unusable");
        (user.id, self.access_token_for(user.id))
    }

    pub fn access_token_for(&self, user_id: Uuid) -> String {
        self.state.tokens.issue(user_id, TokenType::Access).unwrap()
    }

    /// Registers `username` with `TEST_PASSWORD` through the HTTP surface.
    pub async fn register(&self, username: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/register/",
                None,
                Some(json!({"username": username, "password": TEST_PASSWORD})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }

    pub async fn obtain_pair(&self, username: &str, password: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/token/",
                None,
                Some(json!({"username": username, "password": password})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body
    }

    pub async fn post_task(&self, token: &str, title: &str, is_completed: bool) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/tasks/",
                Some(token),
                Some(json!({
                    "title": title,
                    "description": format!("{} description", title),
                    "is_completed": is_completed,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }
}

/// Pool on `DATABASE_URL` with migrations applied, for the Postgres store
/// tests. Those are `#[ignore]`d; run them with `cargo test -- --ignored`.
pub async fn pg_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

/// Unique per call so Postgres tests can share one database.
pub fn unique_username(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}
