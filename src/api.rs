// API client module: a small blocking HTTP client for the n8n public API
// (`/api/v1`). Every method is one request (or one request per page) and
// returns typed documents from `model`.

use crate::config::Config;
use crate::error::ApiError;
use crate::model::{Listing, Tag, TagRef, Workflow, WorkflowPayload};
use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;

const API_KEY_HEADER: &str = "x-n8n-api-key";
const PAGE_LIMIT: &str = "100";

/// Holds a reqwest blocking client preconfigured with the API key header
/// and the instance root URL.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for the instance described by `config`.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let mut key = HeaderValue::from_str(&config.api_key).map_err(|_| ApiError::InvalidApiKey)?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                url: config.base_url.clone(),
                source,
            })?;
        Ok(ApiClient {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch every workflow, following `nextCursor` until the last page.
    /// Pinned test data is excluded to keep documents small.
    pub fn list_workflows(&self) -> Result<Vec<Workflow>, ApiError> {
        self.list_all("workflows", &[("excludePinnedData", "true"), ("limit", PAGE_LIMIT)])
    }

    /// Fetch a single workflow by id.
    pub fn get_workflow(&self, id: &str) -> Result<Workflow, ApiError> {
        let url = self.url(&format!("workflows/{}", id));
        debug!("GET {}", url);
        let req = self.client.get(&url).query(&[("excludePinnedData", "true")]);
        decode(self.send(req, &url)?, &url)
    }

    /// POST a new workflow. The response carries the id the server assigned.
    pub fn create_workflow(&self, payload: &WorkflowPayload) -> Result<Workflow, ApiError> {
        let url = self.url("workflows");
        debug!("POST {} name={:?}", url, payload.name);
        let req = self.client.post(&url).json(payload);
        decode(self.send(req, &url)?, &url)
    }

    /// Replace the writable parts of an existing workflow.
    pub fn update_workflow(&self, id: &str, payload: &WorkflowPayload) -> Result<Workflow, ApiError> {
        let url = self.url(&format!("workflows/{}", id));
        debug!("PUT {} name={:?}", url, payload.name);
        let req = self.client.put(&url).json(payload);
        decode(self.send(req, &url)?, &url)
    }

    pub fn delete_workflow(&self, id: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("workflows/{}", id));
        debug!("DELETE {}", url);
        self.send(self.client.delete(&url), &url)?;
        Ok(())
    }

    pub fn activate_workflow(&self, id: &str) -> Result<(), ApiError> {
        self.toggle(id, "activate")
    }

    pub fn deactivate_workflow(&self, id: &str) -> Result<(), ApiError> {
        self.toggle(id, "deactivate")
    }

    /// Tags currently assigned to a workflow.
    pub fn workflow_tags(&self, id: &str) -> Result<Vec<Tag>, ApiError> {
        let url = self.url(&format!("workflows/{}/tags", id));
        debug!("GET {}", url);
        let listing: Listing<Tag> = decode(self.send(self.client.get(&url), &url)?, &url)?;
        Ok(listing.into_parts().0)
    }

    /// Replace the tag set of a workflow. An empty slice removes all tags.
    pub fn set_workflow_tags(&self, id: &str, tags: &[TagRef]) -> Result<Vec<Tag>, ApiError> {
        let url = self.url(&format!("workflows/{}/tags", id));
        debug!("PUT {} ({} tags)", url, tags.len());
        let listing: Listing<Tag> = decode(self.send(self.client.put(&url).json(tags), &url)?, &url)?;
        Ok(listing.into_parts().0)
    }

    /// Every tag defined on the instance.
    pub fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        self.list_all("tags", &[("limit", PAGE_LIMIT)])
    }

    fn toggle(&self, id: &str, action: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("workflows/{}/{}", id, action));
        debug!("POST {}", url);
        self.send(self.client.post(&url).body(""), &url)?;
        Ok(())
    }

    fn list_all<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<T>, ApiError> {
        let url = self.url(path);
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut req = self.client.get(&url).query(query);
            if let Some(c) = &cursor {
                req = req.query(&[("cursor", c.as_str())]);
            }
            debug!("GET {} cursor={:?}", url, cursor);
            let page: Listing<T> = decode(self.send(req, &url)?, &url)?;
            let (mut batch, next) = page.into_parts();
            items.append(&mut batch);
            match next {
                // A server repeating the same cursor would loop forever.
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }
        Ok(items)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    /// Send a request and turn non-2xx responses into `ApiError::Status`.
    fn send(&self, req: RequestBuilder, url: &str) -> Result<Response, ApiError> {
        let res = req.send().map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            debug!("{} -> {} {}", url, status, body);
            return Err(ApiError::from_body(status, &body));
        }
        Ok(res)
    }
}

fn decode<T: DeserializeOwned>(res: Response, url: &str) -> Result<T, ApiError> {
    res.json().map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::path::PathBuf;
    use std::time::Duration;

    fn client(server: &Server) -> ApiClient {
        let config = Config {
            api_key: "test-key".into(),
            base_url: server.url(),
            workflows_dir: PathBuf::from("workflows"),
            backups_dir: PathBuf::from("backups"),
            timeout: Duration::from_secs(5),
        };
        ApiClient::new(&config).unwrap()
    }

    fn workflows_path() -> Matcher {
        Matcher::Regex(r"^/api/v1/workflows(\?.*)?$".into())
    }

    #[test]
    fn list_follows_cursor_and_sends_api_key() {
        let mut server = Server::new();
        let first = server
            .mock("GET", workflows_path())
            .match_header("x-n8n-api-key", "test-key")
            .match_query(Matcher::Regex("^excludePinnedData=true&limit=100$".into()))
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"id":"a","name":"First","active":true}],"nextCursor":"c2"}"#)
            .create();
        let second = server
            .mock("GET", workflows_path())
            .match_query(Matcher::UrlEncoded("cursor".into(), "c2".into()))
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"id":"b","name":"Second"}],"nextCursor":null}"#)
            .create();

        let workflows = client(&server).list_workflows().unwrap();
        first.assert();
        second.assert();
        let names: Vec<_> = workflows.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, ["First", "Second"]);
        assert!(workflows[0].is_active());
        assert!(!workflows[1].is_active());
    }

    #[test]
    fn list_accepts_bare_array() {
        let mut server = Server::new();
        server
            .mock("GET", workflows_path())
            .with_body(r#"[{"id":1,"name":"Legacy"}]"#)
            .create();
        let workflows = client(&server).list_workflows().unwrap();
        assert_eq!(workflows[0].id.as_deref(), Some("1"));
    }

    #[test]
    fn error_message_is_extracted() {
        let mut server = Server::new();
        server
            .mock("POST", "/api/v1/workflows/abc/activate")
            .with_status(400)
            .with_body(r#"{"message":"Workflow has no node to start the workflow"}"#)
            .create();
        let err = client(&server).activate_workflow("abc").unwrap_err();
        assert_eq!(
            err.to_string(),
            "400 Bad Request: Workflow has no node to start the workflow"
        );
    }

    #[test]
    fn update_sends_writable_payload() {
        let mut server = Server::new();
        let mock = server
            .mock("PUT", "/api/v1/workflows/abc")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "Renamed",
                "nodes": [],
                "connections": {},
                "settings": {"executionOrder": "v1"}
            })))
            .with_body(r#"{"id":"abc","name":"Renamed"}"#)
            .create();
        let updated = client(&server)
            .update_workflow("abc", &WorkflowPayload::empty("Renamed"))
            .unwrap();
        mock.assert();
        assert_eq!(updated.name, "Renamed");
    }

    #[test]
    fn set_tags_puts_id_list() {
        let mut server = Server::new();
        let mock = server
            .mock("PUT", "/api/v1/workflows/abc/tags")
            .match_body(Matcher::Json(serde_json::json!([{"id": "t1"}, {"id": "t2"}])))
            .with_body(r#"[{"id":"t1","name":"prod"},{"id":"t2","name":"mail"}]"#)
            .create();
        let tags = client(&server)
            .set_workflow_tags("abc", &[TagRef { id: "t1".into() }, TagRef { id: "t2".into() }])
            .unwrap();
        mock.assert();
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn delete_reports_missing_workflow() {
        let mut server = Server::new();
        server
            .mock("DELETE", "/api/v1/workflows/nope")
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create();
        let err = client(&server).delete_workflow("nope").unwrap_err();
        assert!(err.is_not_found());
    }
}
