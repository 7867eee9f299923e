use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::Settings;
use crate::errors::AppError;
use crate::keys::{AiProvider, ApiKeys, API_KEY_HEADER, PROVIDER_HEADER};
use crate::knowledge::KnowledgeBaseData;
use crate::models::{
    ApiKeyTestResult, ChatRequest, ChatResponse, Conversation, ConversationDetail,
    ConversationList, ConversationStatus, CurrentProvider, DeviceType, ExportFormat,
    ExportResponse, FileAnalysis, FileListing, KnowledgeBase, PrdDraft, Project, ProjectCreate,
    ProjectList, ProjectUpdate, ProvidersList, SearchFilters, SearchResponse, UploadedFile,
    Wireframe,
};
use crate::stream::{decode_events, StreamEvent};
use crate::upload::UploadFile;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Events of one chat-stream response, in arrival order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, AppError>> + Send>>;

/// HTTP client for the PRD service.
///
/// Provider keys are passed in at construction and attached to every
/// request as `X-AI-Provider` / `X-AI-API-Key`.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    keys: ApiKeys,
    request_timeout: Duration,
    wireframe_timeout: Duration,
}

impl ApiClient {
    pub fn new(settings: &Settings, keys: ApiKeys) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(AppError::ClientBuild)?;
        Ok(Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            keys,
            request_timeout: settings.request_timeout,
            wireframe_timeout: settings.wireframe_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn keys(&self) -> &ApiKeys {
        &self.keys
    }

    /// Request with provider headers and no overall timeout.
    fn build(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some((provider, key)) = self.keys.request_headers() {
            req = req.header(PROVIDER_HEADER, provider.as_str()).header(API_KEY_HEADER, key);
        }
        req
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.build(method, path).timeout(self.request_timeout)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, AppError> {
        let resp = req.send().await.map_err(|e| {
            error!(url = ?e.url().map(|u| u.as_str()), "Request failed: {e}");
            AppError::from(e)
        })?;
        check_status(resp).await
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, AppError> {
        let resp = self.send(req).await?;
        resp.json::<T>().await.map_err(AppError::from)
    }

    async fn send_empty(&self, req: RequestBuilder) -> Result<(), AppError> {
        self.send(req).await?;
        Ok(())
    }

    // ── Projects ──────────────────────────────────────────────────────────────

    pub async fn create_project(&self, project: &ProjectCreate) -> Result<Project, AppError> {
        self.send_json(self.request(Method::POST, "/api/projects/").json(project))
            .await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        let list: ProjectList = self
            .send_json(self.request(Method::GET, "/api/projects/"))
            .await?;
        Ok(list.projects)
    }

    pub async fn get_project(&self, id: &str) -> Result<Project, AppError> {
        self.send_json(self.request(Method::GET, &format!("/api/projects/{id}")))
            .await
    }

    pub async fn update_project(&self, id: &str, update: &ProjectUpdate) -> Result<Project, AppError> {
        self.send_json(
            self.request(Method::PATCH, &format!("/api/projects/{id}"))
                .json(update),
        )
        .await
    }

    pub async fn delete_project(&self, id: &str) -> Result<(), AppError> {
        self.send_empty(self.request(Method::DELETE, &format!("/api/projects/{id}")))
            .await
    }

    // ── Files ─────────────────────────────────────────────────────────────────

    /// Uploads a local file after checking its size and type.
    pub async fn upload_file(&self, project_id: &str, path: &Path) -> Result<UploadedFile, AppError> {
        let upload = UploadFile::read(path).await?;
        info!(project_id, file = %upload.file_name, size = upload.bytes.len(), "Uploading file");

        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(upload.mime)
            .map_err(AppError::from)?;
        let form = Form::new()
            .part("file", part)
            .text("project_id", project_id.to_string());

        self.send_json(self.request(Method::POST, "/api/files/upload").multipart(form))
            .await
    }

    pub async fn analyze_file(&self, file_id: &str) -> Result<FileAnalysis, AppError> {
        self.send_json(self.request(Method::POST, &format!("/api/files/{file_id}/analyze")))
            .await
    }

    pub async fn list_files(&self, project_id: &str) -> Result<Vec<UploadedFile>, AppError> {
        let listing: FileListing = self
            .send_json(self.request(Method::GET, &format!("/api/files/project/{project_id}")))
            .await?;
        Ok(listing.into_files())
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<(), AppError> {
        self.send_empty(self.request(Method::DELETE, &format!("/api/files/{file_id}")))
            .await
    }

    // ── Knowledge base ────────────────────────────────────────────────────────

    pub async fn build_knowledge(&self, project_id: &str, file_ids: &[String]) -> Result<KnowledgeBase, AppError> {
        self.send_json(
            self.request(Method::POST, &format!("/api/knowledge/build/{project_id}"))
                .json(&json!({ "file_ids": file_ids })),
        )
        .await
    }

    pub async fn get_knowledge(&self, project_id: &str) -> Result<KnowledgeBase, AppError> {
        self.send_json(self.request(Method::GET, &format!("/api/knowledge/{project_id}")))
            .await
    }

    pub async fn update_knowledge(
        &self,
        project_id: &str,
        data: &KnowledgeBaseData,
        notes: Option<&str>,
    ) -> Result<KnowledgeBase, AppError> {
        let mut body = json!({ "structured_data": data });
        if let Some(notes) = notes {
            body["notes"] = Value::from(notes);
        }
        self.send_json(
            self.request(Method::PATCH, &format!("/api/knowledge/{project_id}"))
                .json(&body),
        )
        .await
    }

    pub async fn confirm_knowledge(&self, project_id: &str, confirmed_by: &str) -> Result<KnowledgeBase, AppError> {
        self.send_json(
            self.request(Method::POST, &format!("/api/knowledge/{project_id}/confirm"))
                .json(&json!({ "confirmed_by": confirmed_by })),
        )
        .await
    }

    pub async fn search_knowledge(
        &self,
        project_id: &str,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<SearchResponse, AppError> {
        let mut params = vec![("q", query.to_string())];
        if let Some(module) = &filters.module {
            params.push(("module", module.clone()));
        }
        if let Some(kind) = filters.kind {
            params.push(("type", kind.as_str().to_string()));
        }
        self.send_json(
            self.request(Method::GET, &format!("/api/search/knowledge/{project_id}"))
                .query(&params),
        )
        .await
    }

    // ── Conversations ─────────────────────────────────────────────────────────

    pub async fn create_conversation(&self, project_id: &str, title: Option<&str>) -> Result<Conversation, AppError> {
        self.send_json(
            self.request(Method::POST, "/api/conversations/")
                .json(&json!({ "project_id": project_id, "title": title })),
        )
        .await
    }

    pub async fn list_conversations(&self, project_id: &str) -> Result<Vec<Conversation>, AppError> {
        let list: ConversationList = self
            .send_json(self.request(Method::GET, &format!("/api/conversations/project/{project_id}")))
            .await?;
        Ok(list.conversations)
    }

    pub async fn get_conversation(&self, id: &str) -> Result<ConversationDetail, AppError> {
        self.send_json(self.request(Method::GET, &format!("/api/conversations/{id}")))
            .await
    }

    /// Sends a message and waits for the whole reply.
    pub async fn chat(&self, conversation_id: &str, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.send_json(
            self.request(Method::POST, &format!("/api/conversations/{conversation_id}/chat"))
                .json(request),
        )
        .await
    }

    /// Sends a message and returns the reply as a stream of events.
    ///
    /// A non-success status fails here; failures after the first byte
    /// arrive as `Err` items on the stream.
    pub async fn chat_stream(&self, conversation_id: &str, request: &ChatRequest) -> Result<EventStream, AppError> {
        let req = self
            .build(Method::POST, &format!("/api/conversations/{conversation_id}/chat-stream"))
            .json(request);
        let resp = self.send(req).await?;
        info!(conversation_id, "Chat stream opened");
        let events: EventStream = Box::pin(decode_events(Box::pin(resp.bytes_stream())));
        Ok(events)
    }

    pub async fn update_conversation_status(
        &self,
        id: &str,
        status: ConversationStatus,
        generate_summary: bool,
    ) -> Result<Conversation, AppError> {
        self.send_json(
            self.request(Method::PATCH, &format!("/api/conversations/{id}/status"))
                .json(&json!({ "status": status, "generate_summary": generate_summary })),
        )
        .await
    }

    pub async fn update_conversation_title(&self, id: &str, title: &str) -> Result<Conversation, AppError> {
        self.send_json(
            self.request(Method::PATCH, &format!("/api/conversations/{id}/title"))
                .json(&json!({ "title": title })),
        )
        .await
    }

    pub async fn delete_conversation(&self, id: &str) -> Result<(), AppError> {
        self.send_empty(self.request(Method::DELETE, &format!("/api/conversations/{id}")))
            .await
    }

    // ── Export & PRD drafts ───────────────────────────────────────────────────

    pub async fn export_prd(&self, conversation_id: &str, include_knowledge_base: bool) -> Result<ExportResponse, AppError> {
        self.send_json(
            self.request(Method::POST, &format!("/api/export/conversation/{conversation_id}"))
                .query(&[("include_knowledge_base", include_knowledge_base)]),
        )
        .await
    }

    /// Downloads the rendered PRD document.
    pub async fn download_prd(
        &self,
        conversation_id: &str,
        format: ExportFormat,
        include_knowledge_base: bool,
    ) -> Result<Vec<u8>, AppError> {
        let req = self
            .request(Method::GET, &format!("/api/export/conversation/{conversation_id}/download"))
            .query(&[
                ("format", format.as_str().to_string()),
                ("include_knowledge_base", include_knowledge_base.to_string()),
            ]);
        let resp = self.send(req).await?;
        let bytes = resp.bytes().await.map_err(AppError::from)?;
        Ok(bytes.to_vec())
    }

    pub async fn generate_prd_outline(&self, conversation_id: &str) -> Result<PrdDraft, AppError> {
        self.send_json(self.request(Method::POST, &format!("/api/prd/{conversation_id}/outline")))
            .await
    }

    pub async fn get_prd_draft(&self, conversation_id: &str) -> Result<PrdDraft, AppError> {
        self.send_json(self.request(Method::GET, &format!("/api/prd/{conversation_id}/draft")))
            .await
    }

    pub async fn update_prd_section(
        &self,
        conversation_id: &str,
        section_key: &str,
        content: &str,
    ) -> Result<PrdDraft, AppError> {
        self.send_json(
            self.request(Method::PATCH, &format!("/api/prd/{conversation_id}/section"))
                .json(&json!({ "section_key": section_key, "content": content })),
        )
        .await
    }

    pub async fn regenerate_prd_section(&self, conversation_id: &str, section_key: &str) -> Result<PrdDraft, AppError> {
        self.send_json(self.request(
            Method::POST,
            &format!("/api/prd/{conversation_id}/section/{section_key}/regenerate"),
        ))
        .await
    }

    // ── AI providers ──────────────────────────────────────────────────────────

    pub async fn list_providers(&self) -> Result<ProvidersList, AppError> {
        self.send_json(self.request(Method::GET, "/api/ai/providers"))
            .await
    }

    pub async fn select_provider(&self, provider: AiProvider) -> Result<Value, AppError> {
        self.send_json(
            self.request(Method::POST, "/api/ai/provider/select")
                .json(&json!({ "provider": provider })),
        )
        .await
    }

    pub async fn current_provider(&self) -> Result<CurrentProvider, AppError> {
        self.send_json(self.request(Method::GET, "/api/ai/provider/current"))
            .await
    }

    pub async fn test_api_key(&self, provider: AiProvider, api_key: &str) -> Result<ApiKeyTestResult, AppError> {
        self.send_json(
            self.request(Method::POST, "/api/ai/test")
                .json(&json!({ "provider": provider, "api_key": api_key })),
        )
        .await
    }

    // ── Wireframes ────────────────────────────────────────────────────────────

    pub async fn generate_wireframe(
        &self,
        conversation_id: &str,
        device: DeviceType,
        reference_file_ids: &[String],
    ) -> Result<Wireframe, AppError> {
        self.send_json(
            self.build(Method::POST, &format!("/api/conversations/{conversation_id}/wireframe"))
                .timeout(self.wireframe_timeout)
                .json(&json!({
                    "device_type": device.as_str(),
                    "reference_file_ids": reference_file_ids,
                })),
        )
        .await
    }
}

/// Turns a non-success response into [`AppError::Http`], keeping the
/// server's `detail` (or `message`) when the body is JSON.
async fn check_status(resp: Response) -> Result<Response, AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let url = resp.url().to_string();
    let body = resp.text().await.unwrap_or_default();
    let detail = error_detail(&body);
    error!(status = status.as_u16(), %url, "API error: {detail}");
    Err(AppError::Http {
        status: status.as_u16(),
        detail,
    })
}

fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("message"))
                .map(|d| match d {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_prefers_json_detail() {
        assert_eq!(error_detail(r#"{"detail":"Project not found"}"#), "Project not found");
        assert_eq!(error_detail(r#"{"message":"bad"}"#), "bad");
        assert_eq!(
            error_detail(r#"{"detail":[{"loc":["body","name"]}]}"#),
            r#"[{"loc":["body","name"]}]"#
        );
        assert_eq!(error_detail("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn base_url_is_normalized() {
        let settings = Settings {
            api_base_url: "http://localhost:8000/".into(),
            ..Settings::default()
        };
        let client = ApiClient::new(&settings, ApiKeys::default()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
