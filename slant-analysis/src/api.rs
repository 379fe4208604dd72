//! Remote analysis service: wire types and the [`AnalysisApi`] seam.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use slant_extract::Author;
use slant_http::{HttpClient, HttpError, RequestOpts};

use crate::credentials::CredentialProvider;

/// Server-side article record returned by quick parse and freshness checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    #[serde(default, alias = "publication_id", skip_serializing_if = "Option::is_none")]
    pub publication: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuickParseRequest {
    pub url: String,
    pub hostname: String,
    pub head: String,
    pub body: String,
    pub restart: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Phase-1 output; also the record cached at `<url>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickParseRecord {
    pub article: Article,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub political_bias_score: Option<f64>,
    #[serde(default)]
    pub objectivity_score: Option<f64>,
}

/// Bias analysis of one journalist, tagged with their name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalistBias {
    #[serde(default, alias = "journalistName")]
    pub name: Option<String>,
    #[serde(default, alias = "journalistId", alias = "journalist_id")]
    pub journalist: Option<i64>,
    #[serde(flatten)]
    pub analysis: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationAnalysis {
    pub publication: Value,
    pub analysis: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckDateUpdatedRequest {
    pub url: String,
    pub head: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckDateUpdated {
    #[serde(rename = "needsUpdate", alias = "needs_update")]
    pub needs_update: bool,
    #[serde(default)]
    pub article: Option<Article>,
    #[serde(default)]
    pub journalists: Option<Vec<JournalistBias>>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub political_bias_score: Option<f64>,
    #[serde(default)]
    pub objectivity_score: Option<f64>,
}

impl CheckDateUpdated {
    /// Quick-parse record carried by a "still fresh" answer, if any, with the
    /// journalist analysis the service sent alongside it.
    pub fn into_parts(self) -> Option<(QuickParseRecord, Option<Vec<JournalistBias>>)> {
        let article = self.article?;
        let record = QuickParseRecord {
            article,
            summary: self.summary,
            political_bias_score: self.political_bias_score,
            objectivity_score: self.objectivity_score,
        };
        Some((record, self.journalists))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArticleIdBody {
    article_id: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicationIdBody {
    publication_id: i64,
}

#[async_trait]
pub trait AnalysisApi: Send + Sync {
    async fn check_date_updated(
        &self,
        req: &CheckDateUpdatedRequest,
    ) -> Result<CheckDateUpdated, HttpError>;

    async fn quick_parse(&self, req: &QuickParseRequest) -> Result<QuickParseRecord, HttpError>;

    async fn analyze_journalists(&self, article_id: i64) -> Result<Vec<JournalistBias>, HttpError>;

    async fn analyze_publication(
        &self,
        publication_id: i64,
    ) -> Result<PublicationAnalysis, HttpError>;
}

/// [`AnalysisApi`] over HTTP. Every call carries the provider's bearer token
/// when one is available.
pub struct HttpAnalysisApi {
    client: HttpClient,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpAnalysisApi {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        retries: usize,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, HttpError> {
        let client = HttpClient::new(base_url)?
            .with_timeout(timeout)
            .with_retries(retries);
        Ok(Self {
            client,
            credentials,
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, HttpError>
    where
        B: Serialize + Sync + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let token = self.credentials.bearer_token().await;
        self.client
            .post_json(path, body, RequestOpts::bearer(token.as_deref()))
            .await
    }
}

#[async_trait]
impl AnalysisApi for HttpAnalysisApi {
    async fn check_date_updated(
        &self,
        req: &CheckDateUpdatedRequest,
    ) -> Result<CheckDateUpdated, HttpError> {
        self.post("check-date-updated", req).await
    }

    async fn quick_parse(&self, req: &QuickParseRequest) -> Result<QuickParseRecord, HttpError> {
        self.post("articles/quick-parse", req).await
    }

    async fn analyze_journalists(&self, article_id: i64) -> Result<Vec<JournalistBias>, HttpError> {
        self.post("analyze-journalists", &ArticleIdBody { article_id })
            .await
    }

    async fn analyze_publication(
        &self,
        publication_id: i64,
    ) -> Result<PublicationAnalysis, HttpError> {
        self.post("analyze-publication", &PublicationIdBody { publication_id })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn article_accepts_publication_id_alias() {
        let a: Article = serde_json::from_value(json!({
            "id": 7, "publication_id": 3, "title": "T", "sentiment": "neutral"
        }))
        .unwrap();
        assert_eq!(a.publication, Some(3));
        assert_eq!(a.extra.get("sentiment"), Some(&json!("neutral")));
    }

    #[test]
    fn fresh_answer_becomes_a_record() {
        let resp: CheckDateUpdated = serde_json::from_value(json!({
            "needsUpdate": false,
            "article": { "id": 1, "publication": 2 },
            "summary": "S",
            "political_bias_score": 0.25,
            "journalists": [{ "journalistName": "Jane Doe", "bias": 0.4 }]
        }))
        .unwrap();
        assert!(!resp.needs_update);
        let (rec, journalists) = resp.into_parts().unwrap();
        assert_eq!(rec.article.id, 1);
        assert_eq!(rec.summary.as_deref(), Some("S"));
        assert_eq!(rec.objectivity_score, None);
        let journalists = journalists.unwrap();
        assert_eq!(journalists[0].name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn quick_parse_request_omits_absent_fields() {
        let req = QuickParseRequest {
            url: "https://e.com/a".into(),
            hostname: "e.com".into(),
            head: "h".into(),
            body: "b".into(),
            restart: true,
            title: Some("T".into()),
            author: None,
            date: None,
            content: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({"url": "https://e.com/a", "hostname": "e.com", "head": "h", "body": "b", "restart": true, "title": "T"})
        );
    }
}
