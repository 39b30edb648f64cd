//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all playlist endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use downtify_server::playlist::JobSnapshot;
use reqwest::{Response, StatusCode};
use serde_json::json;
use std::time::Duration;

/// HTTP test client
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Route prefix, either "/playlist" or "/api/playlist"
    prefix: &'static str,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            prefix: "/playlist",
        }
    }

    /// Same client, talking to the routes mounted under `/api`
    pub fn with_api_prefix(mut self) -> Self {
        self.prefix = "/api/playlist";
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.prefix, path)
    }

    // ========================================================================
    // Playlist Endpoints
    // ========================================================================

    /// POST /playlist/start
    pub async fn start(&self, input: &str) -> Response {
        self.client
            .post(self.url("/start"))
            .json(&json!({ "input": input }))
            .send()
            .await
            .expect("Start request failed")
    }

    /// Starts a job and returns its id, asserting success
    pub async fn start_ok(&self, input: &str) -> String {
        let response = self.start(input).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = response.json().await.expect("Invalid start body");
        body["job_id"]
            .as_str()
            .expect("Missing job_id")
            .to_string()
    }

    /// GET /playlist/status/{job_id}
    pub async fn status(&self, job_id: &str) -> Response {
        self.client
            .get(self.url(&format!("/status/{}", job_id)))
            .send()
            .await
            .expect("Status request failed")
    }

    /// GET /playlist/file/{job_id}/{file_id}
    pub async fn file(&self, job_id: &str, file_id: &str) -> Response {
        self.client
            .get(self.url(&format!("/file/{}/{}", job_id, file_id)))
            .send()
            .await
            .expect("File request failed")
    }

    /// GET /playlist/download/{job_id}
    pub async fn archive(&self, job_id: &str) -> Response {
        self.client
            .get(self.url(&format!("/download/{}", job_id)))
            .send()
            .await
            .expect("Archive request failed")
    }

    /// GET /health
    pub async fn health(&self) -> Response {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .expect("Health request failed")
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Polls the status endpoint until the job is done or failed.
    ///
    /// Also asserts that counters never go backwards between polls.
    ///
    /// # Panics
    ///
    /// Panics if the job doesn't finish within `JOB_DONE_TIMEOUT_MS`.
    pub async fn wait_until_finished(&self, job_id: &str) -> JobSnapshot {
        let start = std::time::Instant::now();
        let mut last: Option<(usize, usize)> = None;

        loop {
            let response = self.status(job_id).await;
            assert_eq!(response.status(), StatusCode::OK);
            let snapshot: JobSnapshot = response.json().await.expect("Invalid status body");

            if let Some((done, failed)) = last {
                assert!(snapshot.done >= done, "done went backwards");
                assert!(snapshot.failed >= failed, "failed went backwards");
            }
            last = Some((snapshot.done, snapshot.failed));

            if snapshot.status.is_terminal() {
                return snapshot;
            }
            if start.elapsed() > Duration::from_millis(JOB_DONE_TIMEOUT_MS) {
                panic!("Job {} did not finish within {}ms", job_id, JOB_DONE_TIMEOUT_MS);
            }
            tokio::time::sleep(Duration::from_millis(JOB_POLL_INTERVAL_MS)).await;
        }
    }
}
