//! Integration tests for the operational endpoints.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use reqwest::StatusCode;
use session_test_utils::TestSessionServer;

#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<()> {
    let server = TestSessionServer::spawn().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_health_endpoint_ignores_cookies() -> Result<()> {
    let server = TestSessionServer::spawn().await?;

    let response = reqwest::Client::new()
        .get(format!("{}/health", server.url()))
        .header("Cookie", "s=not-a-token")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_prometheus_text() -> Result<()> {
    let server = TestSessionServer::spawn().await?;

    // Generate at least one recorded request
    reqwest::get(format!("{}/api/session", server.url())).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_not_found() -> Result<()> {
    let server = TestSessionServer::spawn().await?;

    let response = reqwest::get(format!("{}/api/unknown", server.url())).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
