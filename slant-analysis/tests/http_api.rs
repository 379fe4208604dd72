use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use slant_analysis::api::{AnalysisApi, CheckDateUpdatedRequest, QuickParseRequest};
use slant_analysis::{HttpAnalysisApi, NoCredentials, StaticCredentials};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn api_for(server: &MockServer, token: Option<&str>) -> HttpAnalysisApi {
    HttpAnalysisApi::new(
        &format!("{}/", server.uri()),
        Duration::from_secs(2),
        0,
        Arc::new(StaticCredentials::new(token.map(str::to_string), false)),
    )
    .unwrap()
}

#[tokio::test]
async fn quick_parse_posts_page_with_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/articles/quick-parse"))
        .and(header("authorization", "Bearer abc"))
        .and(body_json(json!({
            "url": "https://e.com/a",
            "hostname": "e.com",
            "head": "Title",
            "body": "Body",
            "restart": false,
            "title": "Title"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "article": { "id": 9, "publication_id": 4, "title": "Title" },
            "summary": "S",
            "political_bias_score": -0.4,
            "objectivity_score": 0.9
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server, Some("abc"));
    let record = api
        .quick_parse(&QuickParseRequest {
            url: "https://e.com/a".into(),
            hostname: "e.com".into(),
            head: "Title".into(),
            body: "Body".into(),
            restart: false,
            title: Some("Title".into()),
            author: None,
            date: None,
            content: None,
        })
        .await
        .unwrap();
    assert_eq!(record.article.id, 9);
    assert_eq!(record.article.publication, Some(4));
    assert_eq!(record.political_bias_score, Some(-0.4));
}

#[tokio::test]
async fn detailed_endpoints_use_camel_case_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze-journalists"))
        .and(body_json(json!({ "articleId": 9 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "journalistName": "Jane Doe", "journalist": 3, "bias": 0.2 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/analyze-publication"))
        .and(body_json(json!({ "publicationId": 4 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "publication": { "id": 4, "name": "Example" },
            "analysis": { "bias": 0.1 }
        })))
        .mount(&server)
        .await;

    let api = api_for(&server, None);
    let journalists = api.analyze_journalists(9).await.unwrap();
    assert_eq!(journalists.len(), 1);
    assert_eq!(journalists[0].name.as_deref(), Some("Jane Doe"));
    assert_eq!(journalists[0].analysis.get("bias"), Some(&json!(0.2)));

    let publication = api.analyze_publication(4).await.unwrap();
    assert_eq!(publication.publication["name"], json!("Example"));
}

#[tokio::test]
async fn missing_token_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/check-date-updated"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/check-date-updated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "needsUpdate": true })))
        .mount(&server)
        .await;

    let api = HttpAnalysisApi::new(
        &format!("{}/", server.uri()),
        Duration::from_secs(2),
        0,
        Arc::new(NoCredentials),
    )
    .unwrap();
    let answer = api
        .check_date_updated(&CheckDateUpdatedRequest {
            url: "https://e.com/a".into(),
            head: String::new(),
            body: String::new(),
        })
        .await
        .unwrap();
    assert!(answer.needs_update);

    let received: Vec<Request> = server.received_requests().await.unwrap_or_default();
    assert!(received.iter().all(|r| !r.headers.contains_key("authorization")));
}

#[tokio::test]
async fn server_errors_carry_a_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze-journalists"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "Article not found" })),
        )
        .mount(&server)
        .await;

    let api = api_for(&server, Some("abc"));
    let err = api.analyze_journalists(1).await.unwrap_err();
    assert!(err.user_message().contains("Article not found"));
}
