use futures_util::StreamExt;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::errors::AppError;
use crate::models::ChatRequest;
use crate::transcript::{ChatState, Draft};

/// Prompt sent when the user attaches images without typing anything.
pub fn default_image_prompt(image_count: usize) -> String {
    format!("Please analyze these {image_count} images and summarize the key information")
}

/// Drives one chat send: uploads attachments, opens the reply stream and
/// feeds every event into the conversation's [`ChatState`].
#[derive(Clone)]
pub struct ChatService {
    client: ApiClient,
}

impl ChatService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Sends whatever is in `state.input`.
    ///
    /// `on_update` is called after every state change so the caller can
    /// redraw. On failure the state has already been recovered (draft back
    /// in the input box, streaming reply dropped) and the error is returned.
    pub async fn send<F>(
        &self,
        state: &mut ChatState,
        project_id: &str,
        mut on_update: F,
    ) -> Result<(), AppError>
    where
        F: FnMut(&ChatState),
    {
        let draft = state.begin_send()?;
        on_update(state);

        let result = self.run(state, project_id, &draft, &mut on_update).await;
        if let Err(err) = &result {
            // Error events already recovered the state inside `apply`.
            if !matches!(err, AppError::Stream { .. }) {
                state.fail(err);
            }
        }
        on_update(state);
        result
    }

    async fn run<F>(
        &self,
        state: &mut ChatState,
        project_id: &str,
        draft: &Draft,
        on_update: &mut F,
    ) -> Result<(), AppError>
    where
        F: FnMut(&ChatState),
    {
        let image_file_ids = self
            .upload_attachments(state, project_id, draft, on_update)
            .await?;

        let message = if draft.text.is_empty() {
            default_image_prompt(image_file_ids.len())
        } else {
            draft.text.clone()
        };
        let request = ChatRequest {
            message,
            image_file_ids,
        };

        state.set_status("Generating reply...");
        on_update(state);

        let conversation_id = state.conversation_id().to_string();
        let mut events = self.client.chat_stream(&conversation_id, &request).await?;
        while let Some(event) = events.next().await {
            state.apply(event?)?;
            on_update(state);
            if !state.is_sending() {
                return Ok(());
            }
        }

        state.complete();
        Ok(())
    }

    async fn upload_attachments<F>(
        &self,
        state: &mut ChatState,
        project_id: &str,
        draft: &Draft,
        on_update: &mut F,
    ) -> Result<Vec<String>, AppError>
    where
        F: FnMut(&ChatState),
    {
        let total = draft.attachments.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        state.set_status(format!("Uploading {total} images..."));
        on_update(state);

        let mut ids = Vec::with_capacity(total);
        for (index, path) in draft.attachments.iter().enumerate() {
            let uploaded = self.client.upload_file(project_id, path).await.map_err(|e| {
                warn!(path = %path.display(), "Image upload failed: {e}");
                e
            })?;
            ids.push(uploaded.id);
            state.set_status(format!("Uploaded {}/{total} images...", index + 1));
            on_update(state);
        }

        info!(count = ids.len(), "Uploaded chat attachments");
        state.set_status("Images uploaded, AI is analyzing...");
        on_update(state);
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_prompt_names_the_count() {
        assert_eq!(
            default_image_prompt(3),
            "Please analyze these 3 images and summarize the key information"
        );
    }
}
