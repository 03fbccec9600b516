use anyhow::Result;
use axum::http::StatusCode;

mod common;

#[tokio::test]
async fn health_reports_db_status() -> Result<()> {
    let test = common::setup().await?;

    let (status, value) = test.request("GET", "/api/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["status"], "ok");
    assert_eq!(value["db_ok"], true);

    Ok(())
}
