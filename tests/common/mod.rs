#![allow(dead_code)] // each test binary uses a different subset of helpers

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use thesis_hub::create_app;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    _dir: TempDir,
}

/// Fresh sqlite database in a tempdir, migrations applied, router built.
pub async fn setup() -> Result<TestApp> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    // tests run in CI/container; ensure a JWT secret is available for signing tokens
    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;

    Ok(TestApp {
        app,
        pool,
        _dir: dir,
    })
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
        };

        Ok((status, value))
    }

    /// Registers a user and returns (token, user id). Role must be
    /// "student" or "teacher"; admins are made with [`TestApp::make_admin`].
    pub async fn register(&self, username: &str, role: &str) -> Result<(String, Uuid)> {
        let body = json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123",
            "password_confirm": "password123",
            "role": role,
        });

        let (status, value) = self.request("POST", "/auth/register", None, Some(body)).await?;
        if status != StatusCode::CREATED {
            panic!("register failed: {} - {}", status, value);
        }

        let token = value
            .get("token")
            .and_then(|v| v.as_str())
            .context("missing token")?
            .to_string();
        let user_id = value
            .get("user")
            .and_then(|u| u.get("id"))
            .and_then(|v| v.as_str())
            .context("missing user id")?
            .parse()?;

        Ok((token, user_id))
    }

    /// Promotes an existing account; roles are loaded fresh per request, so
    /// the old token keeps working with the new role.
    pub async fn make_admin(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn create_project(&self, token: &str, title: &str, extra: Value) -> Result<Uuid> {
        let mut body = json!({
            "title": title,
            "description": "desc",
            "year": 2024,
            "field": "informatics",
            "keywords": ["test"],
        });
        if let (Some(base), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }

        let (status, value) = self.request("POST", "/projects", Some(token), Some(body)).await?;
        if status != StatusCode::CREATED {
            panic!("project create failed: {} - {}", status, value);
        }

        Ok(value
            .get("id")
            .and_then(|v| v.as_str())
            .context("missing project id")?
            .parse()?)
    }

    /// Proposes `teacher_id` on `project_id` using `token` and returns the
    /// assignment id.
    pub async fn propose_assignment(
        &self,
        token: &str,
        project_id: Uuid,
        teacher_id: Uuid,
        role: &str,
    ) -> Result<Uuid> {
        let body = json!({
            "project_id": project_id,
            "teacher_id": teacher_id,
            "role": role,
        });

        let (status, value) = self.request("POST", "/assignments", Some(token), Some(body)).await?;
        if status != StatusCode::CREATED {
            panic!("assignment create failed: {} - {}", status, value);
        }

        Ok(value
            .get("id")
            .and_then(|v| v.as_str())
            .context("missing assignment id")?
            .parse()?)
    }
}
