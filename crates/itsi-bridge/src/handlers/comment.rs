//! Adds a comment to a notable event.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::{children, required_text, HandlerResponse, RequestContext, RequestHandler};
use crate::error::HandlerError;
use crate::Record;

#[derive(Debug, Clone, Copy, Default)]
pub struct CommentHandler;

#[async_trait]
impl RequestHandler for CommentHandler {
    fn name(&self) -> &'static str {
        "comment"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["event_id", "message"]
    }

    async fn process_request(
        &self,
        payload: &Record,
        ctx: &RequestContext,
    ) -> Result<HandlerResponse, HandlerError> {
        let event_id = required_text(payload, "event_id")?;
        let message = required_text(payload, "message")?;

        info!(
            event_id = %event_id,
            children = %children(payload).join(","),
            message = %message,
            "action=PROCESS_COMMENT"
        );

        ctx.platform.create_comment(event_id, message).await?;

        Ok(HandlerResponse::new(
            200,
            json!({ "message": "Successfully added comment" }),
        ))
    }
}
