use std::net::SocketAddr;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;

use studyplan_core::service::{
    self, CreateFromTextInput, CreateTaskInput, GeneratePlanInput, TaskServiceError,
};
use studyplan_core::ParsedTask;
use studyplan_db::models::Task;
use studyplan_db::queries::tasks as task_db;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!("request failed: {err:#}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl From<TaskServiceError> for AppError {
    fn from(err: TaskServiceError) -> Self {
        match err {
            TaskServiceError::Input(e) => Self::bad_request(e.to_string()),
            TaskServiceError::Store(e) => Self::internal(e),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "status": "error", "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

impl StatusResponse {
    fn ok(message: &'static str) -> Self {
        Self {
            status: "ok",
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    #[serde(flatten)]
    pub status: StatusResponse,
    pub task: Task,
}

#[derive(Debug, Serialize)]
pub struct ParsedCreatedResponse {
    #[serde(flatten)]
    pub status: StatusResponse,
    pub parsed: ParsedTask,
    pub task: Task,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(pool: SqlitePool) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/nl", post(create_task_from_text))
        .route("/api/tasks/{id}", delete(delete_task))
        .route("/api/tasks/{id}/complete", post(complete_task))
        .route("/api/generate", post(generate_plan))
        .route("/api/stats", get(stats))
        .layer(CorsLayer::permissive())
        .with_state(pool)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: SqlitePool, bind: &str, port: u16) -> Result<()> {
    let app = build_router(pool);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("studyplan serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("studyplan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Decode a JSON body. An empty body decodes as the input's defaults.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request(format!("invalid JSON body: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_tasks(State(pool): State<SqlitePool>) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = task_db::list_tasks(&pool)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(tasks))
}

async fn create_task(
    State(pool): State<SqlitePool>,
    body: Bytes,
) -> Result<Json<CreatedResponse>, AppError> {
    let input: CreateTaskInput = parse_body(&body)?;
    let task = service::create_task(&pool, input).await?;
    Ok(Json(CreatedResponse {
        status: StatusResponse::ok("Task created successfully"),
        task,
    }))
}

async fn create_task_from_text(
    State(pool): State<SqlitePool>,
    body: Bytes,
) -> Result<Json<ParsedCreatedResponse>, AppError> {
    let input: CreateFromTextInput = parse_body(&body)?;
    let text = input.text.unwrap_or_default();
    let (parsed, task) = service::create_task_from_text(&pool, &text, today()).await?;
    Ok(Json(ParsedCreatedResponse {
        status: StatusResponse::ok("Task created from natural language"),
        parsed,
        task,
    }))
}

async fn generate_plan(
    State(pool): State<SqlitePool>,
    body: Bytes,
) -> Result<axum::response::Response, AppError> {
    let input: GeneratePlanInput = parse_body(&body)?;
    let plan = service::build_daily_plan(&pool, input, today()).await?;
    Ok(Json(plan).into_response())
}

async fn complete_task(
    State(pool): State<SqlitePool>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let Path(id) = path?;
    let affected = task_db::mark_task_completed(&pool, id)
        .await
        .map_err(AppError::internal)?;
    tracing::info!(task_id = id, affected, "task marked completed");
    Ok(Json(StatusResponse::ok("Task marked as completed")))
}

async fn delete_task(
    State(pool): State<SqlitePool>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let Path(id) = path?;
    let affected = task_db::delete_task(&pool, id)
        .await
        .map_err(AppError::internal)?;
    tracing::info!(task_id = id, affected, "task deleted");
    Ok(Json(StatusResponse::ok("Task deleted")))
}

async fn stats(State(pool): State<SqlitePool>) -> Result<axum::response::Response, AppError> {
    let stats = task_db::task_stats(&pool)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(stats).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use sqlx::SqlitePool;
    use tower::ServiceExt;

    use studyplan_db::models::NewTask;
    use studyplan_db::queries::tasks::{get_task, insert_task};
    use studyplan_test_utils::{create_test_db, drop_test_db};

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    async fn send_request(
        pool: SqlitePool,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> axum::response::Response {
        let app = super::build_router(pool);
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.oneshot(request).await.unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn titled(title: &str, deadline: &str, minutes: i64) -> NewTask {
        NewTask {
            deadline: chrono::NaiveDate::parse_from_str(deadline, "%Y-%m-%d").ok(),
            estimated_minutes: minutes,
            ..NewTask::titled(title)
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_list_tasks_empty() {
        let (pool, db) = create_test_db().await;

        let resp = send_request(pool.clone(), Method::GET, "/api/tasks", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!([]));

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_list_tasks_ordered_by_deadline() {
        let (pool, db) = create_test_db().await;

        insert_task(&pool, &titled("later", "2025-12-01", 30))
            .await
            .unwrap();
        insert_task(&pool, &NewTask::titled("undated"))
            .await
            .unwrap();
        insert_task(&pool, &titled("sooner", "2025-11-01", 30))
            .await
            .unwrap();

        let resp = send_request(pool.clone(), Method::GET, "/api/tasks", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let titles: Vec<&str> = json
            .as_array()
            .expect("response should be an array")
            .iter()
            .map(|t| t["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["sooner", "later", "undated"]);

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_create_task_with_defaults() {
        let (pool, db) = create_test_db().await;

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/tasks",
            Some(serde_json::json!({ "title": "Read chapter 4" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["message"], "Task created successfully");
        assert_eq!(json["task"]["subject"], "General");
        assert_eq!(json["task"]["title"], "Read chapter 4");
        assert_eq!(json["task"]["notes"], "");
        assert_eq!(json["task"]["est_minutes"], 60);
        assert_eq!(json["task"]["deadline"], serde_json::Value::Null);
        assert_eq!(json["task"]["completed"], false);

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_create_task_invalid_deadline_is_bad_request() {
        let (pool, db) = create_test_db().await;

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/tasks",
            Some(serde_json::json!({ "title": "x", "deadline": "tomorrow-ish" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "error");

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_create_from_text() {
        let (pool, db) = create_test_db().await;

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/tasks/nl",
            Some(serde_json::json!({ "text": "Physics homework on 2025-11-22 2 hours" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["parsed"]["subject"], "Physics");
        assert_eq!(json["parsed"]["deadline"], "2025-11-22");
        assert_eq!(json["parsed"]["est_minutes"], 120);
        assert!(json["parsed"].get("estimated_minutes").is_none());
        assert_eq!(json["task"]["est_minutes"], 120);
        assert_eq!(
            json["parsed"]["title"],
            "Physics homework on 2025-11-22 2 hours"
        );
        assert!(json["task"]["id"].as_i64().unwrap() > 0);

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_create_task_coerces_numeric_string_estimate() {
        let (pool, db) = create_test_db().await;

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/tasks",
            Some(serde_json::json!({ "title": "x", "est_minutes": "45" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["task"]["est_minutes"], 45);

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/tasks",
            Some(serde_json::json!({ "title": "x", "est_minutes": "forty" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["status"], "error");

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_create_from_empty_text_is_rejected() {
        let (pool, db) = create_test_db().await;

        for body in [serde_json::json!({ "text": "" }), serde_json::json!({})] {
            let resp =
                send_request(pool.clone(), Method::POST, "/api/tasks/nl", Some(body)).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                body_json(resp).await,
                serde_json::json!({ "status": "error", "message": "No text provided" })
            );
        }

        let resp = send_request(pool.clone(), Method::GET, "/api/stats", None).await;
        assert_eq!(body_json(resp).await["total"], 0);

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (pool, db) = create_test_db().await;

        let app = super::build_router(pool.clone());
        let resp = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/tasks/nl")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["status"], "error");

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_generate_plan() {
        let (pool, db) = create_test_db().await;

        let first = insert_task(&pool, &titled("first", "2025-11-20", 90))
            .await
            .unwrap();
        let second = insert_task(&pool, &titled("second", "2025-11-21", 60))
            .await
            .unwrap();

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/generate",
            Some(serde_json::json!({ "available_minutes": 100, "date": "2025-11-19" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["date"], "2025-11-19");
        assert_eq!(json["available_minutes"], 100);
        assert_eq!(json["used_minutes"], 100);
        assert_eq!(json["remaining_minutes"], 0);
        let plan = json["plan"].as_array().expect("plan should be an array");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0]["task_id"], first.id);
        assert_eq!(plan[0]["minutes"], 90);
        assert_eq!(plan[1]["task_id"], second.id);
        assert_eq!(plan[1]["minutes"], 10);

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_generate_plan_with_empty_body_uses_defaults() {
        let (pool, db) = create_test_db().await;

        let resp = send_request(pool.clone(), Method::POST, "/api/generate", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["available_minutes"], 180);
        assert_eq!(json["used_minutes"], 0);
        assert_eq!(json["plan"], serde_json::json!([]));
        assert_eq!(
            json["date"],
            chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
        );

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_generate_plan_coerces_numeric_string_budget() {
        let (pool, db) = create_test_db().await;

        insert_task(&pool, &titled("first", "2025-11-20", 90))
            .await
            .unwrap();

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/generate",
            Some(serde_json::json!({ "available_minutes": "120" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["available_minutes"], 120);
        assert_eq!(json["used_minutes"], 90);
        assert_eq!(json["remaining_minutes"], 30);

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_generate_plan_zero_minutes() {
        let (pool, db) = create_test_db().await;

        insert_task(&pool, &titled("first", "2025-11-20", 90))
            .await
            .unwrap();

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/generate",
            Some(serde_json::json!({ "available_minutes": 0 })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["plan"], serde_json::json!([]));
        assert_eq!(json["used_minutes"], 0);

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_complete_task_twice() {
        let (pool, db) = create_test_db().await;

        let task = insert_task(&pool, &NewTask::titled("twice")).await.unwrap();
        let uri = format!("/api/tasks/{}/complete", task.id);

        for _ in 0..2 {
            let resp = send_request(pool.clone(), Method::POST, &uri, None).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(
                body_json(resp).await,
                serde_json::json!({ "status": "ok", "message": "Task marked as completed" })
            );
        }

        let fetched = get_task(&pool, task.id).await.unwrap().unwrap();
        assert!(fetched.completed);

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_complete_missing_task_is_ok() {
        let (pool, db) = create_test_db().await;

        let resp = send_request(
            pool.clone(),
            Method::POST,
            "/api/tasks/424242/complete",
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_non_numeric_id_uses_error_envelope() {
        let (pool, db) = create_test_db().await;

        for (method, uri) in [
            (Method::POST, "/api/tasks/abc/complete"),
            (Method::DELETE, "/api/tasks/abc"),
        ] {
            let resp = send_request(pool.clone(), method, uri, None).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            let json = body_json(resp).await;
            assert_eq!(json["status"], "error", "{uri}");
            assert!(json["message"].as_str().is_some_and(|m| !m.is_empty()));
        }

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_delete_task_and_missing_id() {
        let (pool, db) = create_test_db().await;

        let task = insert_task(&pool, &NewTask::titled("gone")).await.unwrap();
        let uri = format!("/api/tasks/{}", task.id);

        let resp = send_request(pool.clone(), Method::DELETE, &uri, None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({ "status": "ok", "message": "Task deleted" })
        );
        assert!(get_task(&pool, task.id).await.unwrap().is_none());

        let resp = send_request(pool.clone(), Method::DELETE, &uri, None).await;
        assert_eq!(resp.status(), StatusCode::OK);

        drop_test_db(pool, db).await;
    }

    #[tokio::test]
    async fn test_stats() {
        let (pool, db) = create_test_db().await;

        let a = insert_task(&pool, &NewTask::titled("a")).await.unwrap();
        insert_task(&pool, &NewTask::titled("b")).await.unwrap();
        send_request(
            pool.clone(),
            Method::POST,
            &format!("/api/tasks/{}/complete", a.id),
            None,
        )
        .await;

        let resp = send_request(pool.clone(), Method::GET, "/api/stats", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({ "total": 2, "completed": 1, "pending": 1 })
        );

        drop_test_db(pool, db).await;
    }
}
