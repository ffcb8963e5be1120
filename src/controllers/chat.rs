use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Upper bound on an accepted prompt
const PROMPT_MAX_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub mode: &'static str,
    /// Set when the run hit its turn budget and the answer is best-effort
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/chat").route(web::post().to(chat)));
}

async fn chat(state: web::Data<AppState>, request: web::Json<ChatRequest>) -> impl Responder {
    let mode = state.mode.as_str();
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return HttpResponse::BadRequest().json(ChatResponse {
            success: false,
            response: None,
            mode,
            degraded: false,
            error: Some("Prompt must not be empty.".to_string()),
        });
    }
    if prompt.chars().count() > PROMPT_MAX_CHARS {
        return HttpResponse::BadRequest().json(ChatResponse {
            success: false,
            response: None,
            mode,
            degraded: false,
            error: Some(format!(
                "Prompt must be at most {} characters.",
                PROMPT_MAX_CHARS
            )),
        });
    }

    log::info!(
        "[CHAT] Request received: prompt_chars={} mode={}",
        prompt.len(),
        mode
    );

    match state.runner.run(prompt).await {
        Ok(outcome) => {
            log::info!(
                "[CHAT] Request completed: response_chars={} degraded={}",
                outcome.response.len(),
                outcome.is_degraded()
            );
            HttpResponse::Ok().json(ChatResponse {
                success: true,
                response: Some(outcome.response.clone()),
                mode,
                degraded: outcome.is_degraded(),
                error: None,
            })
        }
        Err(e) => {
            log::error!("[CHAT] Request failed: {}", e);
            HttpResponse::InternalServerError().json(ChatResponse {
                success: false,
                response: None,
                mode,
                degraded: false,
                error: Some(format!("Agent execution failed: {}", e)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentError, PromptRunner, RunOutcome};
    use crate::ai::types::LlmError;
    use actix_web::{test, App};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedRunner(Result<RunOutcome, AgentError>);

    #[async_trait]
    impl PromptRunner for FixedRunner {
        async fn run(&self, _prompt: &str) -> Result<RunOutcome, AgentError> {
            self.0.clone()
        }
    }

    async fn post_chat(
        runner: Arc<dyn PromptRunner>,
        prompt: &str,
    ) -> (u16, serde_json::Value) {
        let state = crate::test_support::app_state_with_runner("multi", runner);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(serde_json::json!({ "prompt": prompt }))
            .to_request();
        let response = test::call_service(&app, req).await;
        let status = response.status().as_u16();
        let body: serde_json::Value = test::read_body_json(response).await;
        (status, body)
    }

    #[actix_web::test]
    async fn test_chat_returns_runner_response() {
        let runner = Arc::new(FixedRunner(Ok(RunOutcome::complete(
            "8C and Cloudy.".to_string(),
        ))));
        let (status, body) = post_chat(runner, "weather in Tokyo?").await;

        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["response"], "8C and Cloudy.");
        assert_eq!(body["mode"], "multi");
        assert!(body.get("degraded").is_none());
        assert!(body.get("error").is_none());
    }

    #[actix_web::test]
    async fn test_chat_marks_degraded_runs() {
        let runner = Arc::new(FixedRunner(Ok(RunOutcome::degraded(
            "Stopped after too many tool-call turns.".to_string(),
        ))));
        let (status, body) = post_chat(runner, "hard question").await;

        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["degraded"], true);
    }

    #[actix_web::test]
    async fn test_chat_rejects_empty_prompt() {
        let runner = Arc::new(FixedRunner(Ok(RunOutcome::complete("nope".to_string()))));
        let (status, body) = post_chat(runner, "   ").await;

        assert_eq!(status, 400);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("empty"));
    }

    #[actix_web::test]
    async fn test_chat_rejects_oversized_prompt() {
        let runner = Arc::new(FixedRunner(Ok(RunOutcome::complete("nope".to_string()))));
        let long_prompt = "a".repeat(PROMPT_MAX_CHARS + 1);
        let (status, body) = post_chat(runner.clone(), &long_prompt).await;

        assert_eq!(status, 400);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("4000"));

        // Exactly at the bound is accepted
        let (status, _) = post_chat(runner, &"a".repeat(PROMPT_MAX_CHARS)).await;
        assert_eq!(status, 200);
    }

    #[actix_web::test]
    async fn test_chat_run_failure_is_500() {
        let runner = Arc::new(FixedRunner(Err(AgentError {
            stage: "executor".to_string(),
            error: LlmError::with_status("upstream down", 502),
        })));
        let (status, body) = post_chat(runner, "anything").await;

        assert_eq!(status, 500);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("executor"));
    }
}
