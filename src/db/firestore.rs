

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use super::{CandidateScan, CandidateSource, CandidateSourceError};
use crate::core::config::StoreConfig;


const MAX_RETRIES: u32 = 3;

const INITIAL_RETRY_DELAY_MS: u64 = 100;

const MAX_RETRY_DELAY_MS: u64 = 10000;

const REQUEST_TIMEOUT_SECS: u64 = 30;


#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsPage {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreDocument {
    fn document_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    fn to_record(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), typed_to_plain(v)))
                .collect(),
        )
    }
}


/// Converts a Firestore REST typed value (`{"stringValue": "x"}`) to plain JSON.
/// Unknown shapes are passed through so the record decoder can reject them.
pub fn typed_to_plain(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return value.clone();
    };
    let Some((kind, inner)) = obj.iter().next().filter(|_| obj.len() == 1) else {
        return value.clone();
    };

    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" | "booleanValue" => {
            inner.clone()
        }
        "nullValue" => Value::Null,
        // int64 travels as a decimal string
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or_else(|_| inner.clone()),
            other => other.clone(),
        },
        // "NaN" / "Infinity" arrive as strings and stay strings
        "doubleValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(typed_to_plain).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), typed_to_plain(v)))
                        .collect()
                })
                .unwrap_or_default(),
        ),
        _ => value.clone(),
    }
}


/// Paged full scan of one Firestore collection over the REST API.
pub struct FirestoreSource {
    client: Client,
    documents_url: Url,
    page_size: u32,
    api_key: Option<String>,
    access_token: Option<String>,
}

impl FirestoreSource {

    pub fn new(config: &StoreConfig) -> Result<Self, CandidateSourceError> {
        let project_id = config
            .project_id
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| CandidateSourceError::Misconfigured("project_id not set".to_string()))?;

        let mut documents_url = Url::parse(&config.base_url)
            .map_err(|e| CandidateSourceError::Misconfigured(format!("base_url: {}", e)))?;
        documents_url
            .path_segments_mut()
            .map_err(|_| CandidateSourceError::Misconfigured("base_url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                project_id,
                "databases",
                "(default)",
                "documents",
                config.collection.as_str(),
            ]);

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CandidateSourceError::Connection(e.to_string()))?;

        info!("FirestoreSource created for {}", documents_url);

        Ok(Self {
            client,
            documents_url,
            page_size: config.page_size.max(1),
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        })
    }


    pub fn documents_url(&self) -> &Url {
        &self.documents_url
    }

    fn page_url(&self, page_token: Option<&str>) -> Url {
        let mut url = self.documents_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", &self.page_size.to_string());
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
            if let Some(key) = &self.api_key {
                query.append_pair("key", key);
            }
        }
        url
    }

    async fn request_page(&self, page_token: Option<&str>) -> Result<ListDocumentsPage, PageError> {
        let mut request = self.client.get(self.page_url(page_token));
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| PageError::Retryable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = format!("HTTP {}", status);
            return Err(if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                PageError::Retryable(message)
            } else {
                PageError::Fatal(message)
            });
        }

        response
            .json::<ListDocumentsPage>()
            .await
            .map_err(|e| PageError::Fatal(format!("malformed page: {}", e)))
    }

    async fn fetch_page(&self, page_token: Option<&str>) -> Result<ListDocumentsPage, CandidateSourceError> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS);

        for attempt in 1..=MAX_RETRIES {
            debug!("Fetching page token={:?} (attempt {})", page_token, attempt);

            match self.request_page(page_token).await {
                Ok(page) => return Ok(page),
                Err(PageError::Fatal(message)) => {
                    return Err(CandidateSourceError::InvalidResponse(message));
                }
                Err(PageError::Retryable(message)) => {
                    debug!("Page fetch failed (attempt {}): {}", attempt, message);
                    last_error = Some(message);

                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(Duration::from_millis(MAX_RETRY_DELAY_MS));
                    }
                }
            }
        }

        Err(CandidateSourceError::RetryExhausted(
            MAX_RETRIES,
            last_error.unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }
}

enum PageError {
    Retryable(String),
    Fatal(String),
}

#[async_trait]
impl CandidateSource for FirestoreSource {
    async fn scan(&self) -> Result<CandidateScan, CandidateSourceError> {
        let mut scan = CandidateScan::default();
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = match self.fetch_page(page_token.as_deref()).await {
                Ok(page) => page,
                Err(e) if pages == 0 => return Err(e),
                Err(e) => {
                    warn!(
                        "Firestore scan interrupted after {} pages ({} records): {}",
                        pages,
                        scan.candidates.len() + scan.skipped.len(),
                        e
                    );
                    scan.fault = Some(e.to_string());
                    break;
                }
            };
            pages += 1;

            for document in &page.documents {
                scan.push_record(&document.to_record(), Some(document.document_id()));
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                None => break,
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    warn!("Firestore returned a repeated page token; stopping scan");
                    scan.fault = Some(format!("repeated page token {}", token));
                    break;
                }
                Some(token) => page_token = Some(token),
            }
        }

        info!(
            "Firestore scan: pages={}, candidates={}, skipped={}, complete={}",
            pages,
            scan.candidates.len(),
            scan.skipped.len(),
            scan.is_complete()
        );
        Ok(scan)
    }

    fn describe(&self) -> String {
        format!("firestore:{}", self.documents_url.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const DOCS_PATH: &str = "/v1/projects/demo/databases/(default)/documents/users";

    fn store_config(base_url: &str, page_size: u32) -> StoreConfig {
        StoreConfig {
            base_url: base_url.to_string(),
            project_id: Some("demo".to_string()),
            page_size,
            ..Default::default()
        }
    }

    fn profile_doc(id: &str, name: &str, skills: &[&str], embedding: &[f64]) -> Value {
        json!({
            "name": format!("projects/demo/databases/(default)/documents/users/{}", id),
            "fields": {
                "user_id": {"stringValue": id},
                "name": {"stringValue": name},
                "skills": {"arrayValue": {"values": skills.iter().map(|s| json!({"stringValue": s})).collect::<Vec<_>>()}},
                "embedding": {"arrayValue": {"values": embedding.iter().map(|x| json!({"doubleValue": x})).collect::<Vec<_>>()}}
            }
        })
    }

    #[test]
    fn test_typed_to_plain() {
        let typed = json!({"mapValue": {"fields": {
            "linkedin": {"stringValue": "https://linkedin.com/in/x"},
            "score": {"integerValue": "7"},
            "verified": {"booleanValue": true},
            "tags": {"arrayValue": {}},
            "gone": {"nullValue": null}
        }}});
        assert_eq!(
            typed_to_plain(&typed),
            json!({
                "linkedin": "https://linkedin.com/in/x",
                "score": 7,
                "verified": true,
                "tags": [],
                "gone": null
            })
        );
    }

    #[test]
    fn test_documents_url() {
        let source = FirestoreSource::new(&store_config("https://firestore.googleapis.com", 10)).unwrap();
        assert_eq!(
            source.documents_url().as_str(),
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents/users"
        );
    }

    #[test]
    fn test_missing_project_is_misconfigured() {
        let config = StoreConfig::default();
        assert!(matches!(
            FirestoreSource::new(&config),
            Err(CandidateSourceError::Misconfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_single_page_scan() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(DOCS_PATH).query_param("pageSize", "10");
                then.status(200).json_body(json!({
                    "documents": [
                        profile_doc("u1", "Asha Verma", &["React"], &[1.0, 0.0]),
                        {
                            "name": "projects/demo/databases/(default)/documents/users/u2",
                            "fields": {
                                "name": {"stringValue": "Bo"},
                                "embedding": {"arrayValue": {"values": [{"doubleValue": "NaN"}]}}
                            }
                        },
                        {
                            "name": "projects/demo/databases/(default)/documents/users/u3",
                            "fields": {"name": {"stringValue": "Cem"}}
                        }
                    ]
                }));
            })
            .await;

        let source = FirestoreSource::new(&store_config(&server.base_url(), 10)).unwrap();
        let scan = source.scan().await.unwrap();

        assert!(scan.is_complete());
        let ids: Vec<&str> = scan.candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u3"]);
        assert_eq!(scan.candidates[0].skills, vec!["React"]);
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].id.as_deref(), Some("u2"));
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(DOCS_PATH);
                then.status(200).json_body(json!({}));
            })
            .await;

        let source = FirestoreSource::new(&store_config(&server.base_url(), 10)).unwrap();
        let scan = source.scan().await.unwrap();
        assert!(scan.candidates.is_empty());
        assert!(scan.is_complete());
    }

    #[tokio::test]
    async fn test_first_page_failure_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(DOCS_PATH);
                then.status(403);
            })
            .await;

        let source = FirestoreSource::new(&store_config(&server.base_url(), 10)).unwrap();
        let err = source.scan().await.unwrap_err();
        assert!(matches!(err, CandidateSourceError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_later_page_failure_marks_scan_partial() {
        let server = MockServer::start_async().await;
        // registered first so the tokened request resolves here
        let second = server
            .mock_async(|when, then| {
                when.method(GET).path(DOCS_PATH).query_param("pageToken", "page-2");
                then.status(503);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(DOCS_PATH).query_param("pageSize", "1");
                then.status(200).json_body(json!({
                    "documents": [profile_doc("u1", "Asha", &["Go"], &[0.6, 0.8])],
                    "nextPageToken": "page-2"
                }));
            })
            .await;

        let source = FirestoreSource::new(&store_config(&server.base_url(), 1)).unwrap();
        let scan = source.scan().await.unwrap();

        assert_eq!(scan.candidates.len(), 1);
        assert!(!scan.is_complete());
        assert_eq!(second.calls_async().await, MAX_RETRIES as usize);
    }
}
