//! Presigned upload integration tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{client, create_media, json_response, url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_issue_single_upload_url() {
        let client = client();
        let (_, key) = create_media(&client, "png").await;
        let resp = client
            .put(url("/api/upload/single"))
            .json(&json!({ "key": key }))
            .send()
            .await
            .expect("PUT /api/upload/single");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 200);
        let signed = body["url"].as_str().expect("url");
        assert!(signed.contains("X-Amz-Signature="), "{signed}");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_refuse_upload_for_unknown_key() {
        let resp = client()
            .put(url("/api/upload/single"))
            .json(&json!({"key": "media/does-not-exist.png"}))
            .send()
            .await
            .expect("PUT /api/upload/single");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "File not found in database"}));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_issue_numbered_part_urls() {
        let client = client();
        let (_, key) = create_media(&client, "mov").await;

        let resp = client
            .post(url("/api/upload/multipart/new"))
            .json(&json!({ "key": key }))
            .send()
            .await
            .expect("POST multipart/new");
        let (status, started) = json_response(resp).await;
        assert_eq!(status, 200, "{started}");
        assert_eq!(started["key"], json!(key));
        let upload_id = started["uploadId"].as_str().expect("uploadId");

        let resp = client
            .put(url("/api/upload/multipart/parts"))
            .json(&json!({ "uploadId": upload_id, "parts": 3, "key": key }))
            .send()
            .await
            .expect("PUT multipart/parts");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 200);
        let parts = body["parts"].as_array().expect("parts");
        assert_eq!(parts.len(), 3);
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(part["partNumber"], json!(i + 1));
            assert!(part["signedUrl"].is_string());
        }
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_validate_part_list() {
        let resp = client()
            .post(url("/api/upload/multipart/complete"))
            .json(&json!({
                "key": "media/x.mp4",
                "uploadId": "u",
                "parts": [{ "partNumber": 0, "eTag": "\"e\"" }],
            }))
            .send()
            .await
            .expect("POST multipart/complete");
        let (status, body) = json_response(resp).await;
        assert_eq!(status, 400);
        assert_eq!(
            body,
            json!({"error": "parts[0].partNumber: partNumber must be at least 1"})
        );
    }
}
