use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::{ApiResponse, FailureKind, WikiSession, decode};
use crate::discovery::WikiPage;
use crate::transform::TextTransformer;

pub const EDIT_SUMMARY: &str = "Replacing some transclusions with substitutions";
pub const FALLBACK_FAILURE_MESSAGE: &str = "unknown error";

/// A page paired with its rewritten text, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub page: WikiPage,
    pub rewritten_text: String,
    pub content_hash: String,
}

impl RewriteResult {
    pub fn new(page: WikiPage, transformer: &TextTransformer) -> Self {
        let rewritten_text = transformer.rewrite(&page.current_text);
        let content_hash = content_hash(&rewritten_text);
        Self {
            page,
            rewritten_text,
            content_hash,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    pub mark_as_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditOutcome {
    pub page_id: i64,
    pub title: String,
    pub succeeded: bool,
    pub server_message: Option<String>,
}

impl EditOutcome {
    /// Message to show for a failed edit.
    pub fn failure_message(&self) -> &str {
        self.server_message
            .as_deref()
            .unwrap_or(FALLBACK_FAILURE_MESSAGE)
    }
}

/// Hex MD5 of the text, the checksum MediaWiki verifies via the `md5` parameter.
pub fn content_hash(text: &str) -> String {
    let digest = Md5::digest(text.as_bytes());
    let mut output = String::with_capacity(32);
    for byte in digest.iter() {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

/// Send one edit. Never retried; every failure is returned as an outcome.
pub fn submit<S: WikiSession>(
    session: &S,
    rewrite: &RewriteResult,
    options: SubmitOptions,
) -> EditOutcome {
    let page = &rewrite.page;
    let params = [
        ("title", page.title.clone()),
        ("text", rewrite.rewritten_text.clone()),
        ("md5", rewrite.content_hash.clone()),
        ("token", page.edit_token.clone()),
        ("starttimestamp", page.start_timestamp.clone()),
        ("minor", "1".to_string()),
        (
            "bot",
            if options.mark_as_bot {
                "1".to_string()
            } else {
                String::new()
            },
        ),
        ("summary", EDIT_SUMMARY.to_string()),
    ];

    let (succeeded, server_message) = match session.edit(&params) {
        Ok(response) => classify(decode::<EditResponse>(response)),
        Err(error) => (false, Some(format!("{error:#}"))),
    };

    let outcome = EditOutcome {
        page_id: page.id,
        title: page.title.clone(),
        succeeded,
        server_message,
    };
    if outcome.succeeded {
        info!("edited {}", outcome.title);
    } else {
        warn!(
            "Failed editing {} - {}",
            outcome.title,
            outcome.failure_message()
        );
    }
    outcome
}

fn classify(response: ApiResponse<EditResponse>) -> (bool, Option<String>) {
    match response {
        ApiResponse::Success(EditResponse {
            edit: Some(EditPayload {
                result: Some(result),
            }),
        }) if result == "Success" => (true, None),
        ApiResponse::Success(EditResponse {
            edit: Some(EditPayload {
                result: Some(result),
            }),
        }) => (false, Some(result)),
        ApiResponse::Success(_) => (false, None),
        ApiResponse::Failure {
            kind: FailureKind::Api { code },
            message,
        } => (false, Some(format!("{code}: {message}"))),
        ApiResponse::Failure {
            kind: FailureKind::Malformed,
            message,
        } => (false, Some(format!("malformed edit response: {message}"))),
    }
}

#[derive(Debug, Deserialize, Default)]
struct EditResponse {
    edit: Option<EditPayload>,
}

#[derive(Debug, Deserialize, Default)]
struct EditPayload {
    result: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{EDIT_SUMMARY, RewriteResult, SubmitOptions, content_hash, submit};
    use crate::discovery::WikiPage;
    use crate::template::TemplateName;
    use crate::testing::{MockSession, param};
    use crate::transform::TextTransformer;

    fn page(text: &str) -> WikiPage {
        WikiPage {
            id: 42,
            title: "Alpha".to_string(),
            current_text: text.to_string(),
            edit_token: "token+\\".to_string(),
            start_timestamp: "2026-10-19T10:00:00Z".to_string(),
        }
    }

    fn rewrite(text: &str) -> RewriteResult {
        let template = TemplateName::parse("Clean").expect("template");
        RewriteResult::new(page(text), &TextTransformer::new(&template))
    }

    const BOT: SubmitOptions = SubmitOptions { mark_as_bot: true };

    #[test]
    fn content_hash_is_hex_md5() {
        assert_eq!(content_hash(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            content_hash("The quick brown fox jumps over the lazy dog"),
            "9e107d9d372bb6826bd81d3542a419d6"
        );
    }

    #[test]
    fn submit_sends_full_edit_request() {
        let session = MockSession::default().with_edit_response(json!({
            "edit": {"result": "Success", "pageid": 42, "title": "Alpha"}
        }));
        let rewrite = rewrite("Intro {{Clean}} middle {{Clean|x=1}} end");
        assert_eq!(
            rewrite.rewritten_text,
            "Intro {{subst:Clean}} middle {{subst:Clean|x=1}} end"
        );

        let outcome = submit(&session, &rewrite, BOT);
        assert!(outcome.succeeded);
        assert_eq!(outcome.server_message, None);
        assert_eq!(outcome.title, "Alpha");

        let edits = session.edits();
        assert_eq!(edits.len(), 1);
        let request = &edits[0];
        assert_eq!(param(request, "title"), Some("Alpha"));
        assert_eq!(
            param(request, "text"),
            Some("Intro {{subst:Clean}} middle {{subst:Clean|x=1}} end")
        );
        assert_eq!(
            param(request, "md5"),
            Some(content_hash("Intro {{subst:Clean}} middle {{subst:Clean|x=1}} end").as_str())
        );
        assert_eq!(param(request, "token"), Some("token+\\"));
        assert_eq!(param(request, "starttimestamp"), Some("2026-10-19T10:00:00Z"));
        assert_eq!(param(request, "minor"), Some("1"));
        assert_eq!(param(request, "bot"), Some("1"));
        assert_eq!(param(request, "summary"), Some(EDIT_SUMMARY));
    }

    #[test]
    fn submit_without_bot_flag_leaves_bot_empty() {
        let session =
            MockSession::default().with_edit_response(json!({"edit": {"result": "Success"}}));
        submit(
            &session,
            &rewrite("{{Clean}}"),
            SubmitOptions { mark_as_bot: false },
        );
        let edits = session.edits();
        assert_eq!(param(&edits[0], "bot"), Some(""));
    }

    #[test]
    fn failure_result_carries_server_value() {
        let session =
            MockSession::default().with_edit_response(json!({"edit": {"result": "Failure"}}));
        let outcome = submit(&session, &rewrite("{{Clean}}"), BOT);
        assert!(!outcome.succeeded);
        assert_eq!(outcome.server_message.as_deref(), Some("Failure"));
    }

    #[test]
    fn missing_edit_field_uses_fallback_message() {
        let session = MockSession::default().with_edit_response(json!({"upload": {"result": "Success"}}));
        let outcome = submit(&session, &rewrite("{{Clean}}"), BOT);
        assert!(!outcome.succeeded);
        assert_eq!(outcome.server_message, None);
        assert_eq!(outcome.failure_message(), "unknown error");
    }

    #[test]
    fn edit_conflict_error_is_failed_outcome() {
        let session = MockSession::default().with_edit_response(json!({
            "error": {"code": "editconflict", "info": "Edit conflict detected."}
        }));
        let outcome = submit(&session, &rewrite("{{Clean}}"), BOT);
        assert!(!outcome.succeeded);
        assert_eq!(
            outcome.server_message.as_deref(),
            Some("editconflict: Edit conflict detected.")
        );
    }

    #[test]
    fn transport_error_is_failed_outcome_without_retry() {
        let session = MockSession::default().with_edit_error("connection reset by peer");
        let outcome = submit(&session, &rewrite("{{Clean}}"), BOT);
        assert!(!outcome.succeeded);
        assert!(
            outcome
                .failure_message()
                .contains("connection reset by peer")
        );
        assert_eq!(session.edits().len(), 1);
    }
}
