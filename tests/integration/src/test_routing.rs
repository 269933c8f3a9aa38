//! Health, greeting, and request-level failure integration tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{client, json_response, url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_running() {
        let resp = client().get(url("/health")).send().await.expect("GET /health");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "running");
        assert!(body["version"].is_string());
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_greet_by_name() {
        let resp = client()
            .get(url("/api/hello/Ada"))
            .send()
            .await
            .expect("GET /api/hello/Ada");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"message": "Hello Ada!"}));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_tag_every_response_with_request_id() {
        let resp = client().get(url("/health")).send().await.expect("GET /health");
        let id = resp
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .expect("x-request-id header")
            .to_owned();
        assert_eq!(id.len(), 36);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_not_found_for_unknown_route() {
        let resp = client()
            .patch(url("/api/media/abc"))
            .send()
            .await
            .expect("PATCH /api/media/abc");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "Not Found"}));

        let resp = client().get(url("/nowhere")).send().await.expect("GET /nowhere");
        assert_eq!(resp.status().as_u16(), 404);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_malformed_json() {
        let resp = client()
            .post(url("/api/media/new"))
            .header("content-type", "application/json")
            .body("{bad")
            .send()
            .await
            .expect("POST /api/media/new");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 400);
        assert_eq!(body, json!({"error": "Invalid JSON"}));
    }
}
