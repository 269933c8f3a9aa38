//! Media record lifecycle integration tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{client, create_media, json_response, url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_create_media_record() {
        let (id, key) = create_media(&client(), "mp4").await;
        assert_eq!(id.len(), 36);
        assert!(key.starts_with("media/"));
        assert!(key.ends_with(".mp4"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unknown_media_type() {
        let resp = client()
            .post(url("/api/media/new"))
            .json(&json!({"type": "doc"}))
            .send()
            .await
            .expect("POST /api/media/new");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 400);
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|e| e.contains("Invalid enum value")),
            "{body}"
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_refuse_to_finalize_before_upload() {
        let client = client();
        let (id, _) = create_media(&client, "png").await;

        let resp = client
            .post(url(&format!("/api/media/{id}/finalize")))
            .send()
            .await
            .expect("POST finalize");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "File does not exist in S3"}));

        let resp = client
            .post(url("/api/media/00000000-0000-0000-0000-000000000000/finalize"))
            .send()
            .await
            .expect("POST finalize");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "File not initialized"}));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_not_read_unuploaded_file() {
        let client = client();
        let (id, _) = create_media(&client, "gif").await;
        let resp = client
            .get(url(&format!("/api/media/{id}")))
            .send()
            .await
            .expect("GET media");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "File not found in S3"}));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_delete_record_once() {
        let client = client();
        let (id, _) = create_media(&client, "jpg").await;

        let resp = client
            .delete(url(&format!("/api/media/{id}")))
            .send()
            .await
            .expect("DELETE media");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"message": "File deleted"}));

        let resp = client
            .delete(url(&format!("/api/media/{id}")))
            .send()
            .await
            .expect("DELETE media");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "File not found in database"}));
    }
}
