//! Reply suggestion assistant.
//!
//! Requests are queued to [`background_task`], which renders the prompt and asks an
//! OpenAI compatible chat completion endpoint for a single reply.

use crate::core::enrichment::EnrichedTicket;
use crate::error::{AppError, Result};
use crate::infrastructure::settings::LlmSettings;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

const SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant designed to suggest replies for support agents.";

const PROMPT_TEMPLATE: &str = r#"Given the following ticket description, the latest customer message, and previous agent messages, suggest a reply that is helpful, professional, and concise.

Ticket Description: {{ ticket_description }}
Latest Customer Message: {{ customer_message }}
Previous Agent Messages: {% for message in agent_messages %}{{ message }}
{% endfor %}

Suggested Reply:"#;

pub const NO_CUSTOMER_MESSAGE: &str = "No recent customer message.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestReplyInput {
    pub ticket_description: String,
    pub customer_message: String,
    pub agent_messages: Vec<String>,
}

impl SuggestReplyInput {
    /// The latest non-agent comment is the customer message; every agent comment,
    /// in order, is prior agent context.
    pub fn from_ticket(ticket: &EnrichedTicket) -> SuggestReplyInput {
        let customer_message = ticket
            .comments
            .iter()
            .rev()
            .find(|c| !c.is_agent)
            .map(|c| c.content.clone())
            .unwrap_or_else(|| NO_CUSTOMER_MESSAGE.to_owned());

        let agent_messages = ticket
            .comments
            .iter()
            .filter(|c| c.is_agent)
            .map(|c| c.content.clone())
            .collect();

        SuggestReplyInput {
            ticket_description: ticket.description.clone(),
            customer_message,
            agent_messages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestReplyOutput {
    pub suggested_reply: String,
}

pub struct SuggestionTask {
    input: SuggestReplyInput,
    return_channel: oneshot::Sender<Result<String>>,
}

impl SuggestionTask {
    pub fn new(input: SuggestReplyInput) -> (SuggestionTask, oneshot::Receiver<Result<String>>) {
        let (sender, receiver) = oneshot::channel();

        (
            SuggestionTask {
                input,
                return_channel: sender,
            },
            receiver,
        )
    }

    pub fn as_jinja_input(&self) -> minijinja::Value {
        minijinja::context! {
            ticket_description => self.input.ticket_description,
            customer_message => self.input.customer_message,
            agent_messages => self.input.agent_messages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    role: ChatRole,
    content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> ChatMessage {
        ChatMessage {
            role,
            content: content.into(),
        }
    }
}

pub fn prompt_environment() -> minijinja::Environment<'static> {
    let mut env = minijinja::Environment::new();
    env.set_trim_blocks(true);
    env.add_template("suggest_reply", PROMPT_TEMPLATE)
        .expect("suggest_reply template should parse");
    env
}

/// Renders the chat messages sent to the model for `task`.
pub fn render_prompt(
    env: &minijinja::Environment<'_>,
    task: &SuggestionTask,
) -> Result<Vec<ChatMessage>> {
    let prompt = env
        .get_template("suggest_reply")
        .and_then(|template| template.render(task.as_jinja_input()))
        .map_err(|e| AppError::Suggestion(e.to_string()))?;

    Ok(vec![
        ChatMessage::new(ChatRole::System, SYSTEM_PROMPT),
        ChatMessage::new(ChatRole::User, prompt),
    ])
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl CompletionResponse {
    fn into_reply(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AppError::Suggestion("model returned no reply".into()))
    }
}

/// OpenAI compatible chat completion client.
pub struct CompletionClient {
    client: reqwest::Client,
    settings: LlmSettings,
}

impl CompletionClient {
    pub fn new(settings: LlmSettings) -> CompletionClient {
        CompletionClient {
            client: reqwest::Client::new(),
            settings,
        }
    }

    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.settings.api_url.trim_end_matches('/')
        );

        let mut request = self.client.post(url).json(&CompletionRequest {
            model: &self.settings.model,
            messages,
        });
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Suggestion(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Suggestion(format!(
                "model endpoint answered {}",
                response.status()
            )));
        }

        response
            .json::<CompletionResponse>()
            .await
            .map_err(|e| AppError::Suggestion(e.to_string()))?
            .into_reply()
    }
}

/// Serves suggestion tasks one at a time until every sender is dropped.
pub async fn background_task(mut task_queue: mpsc::Receiver<SuggestionTask>, client: CompletionClient) {
    let env = prompt_environment();
    info!("Reply assistant ready, model: {}", client.settings.model);

    while let Some(task) = task_queue.recv().await {
        let started = Instant::now();

        let result = match render_prompt(&env, &task) {
            Ok(messages) => client.complete(&messages).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(reply) => debug!(
                "Suggestion of {} chars generated in {:?}",
                reply.len(),
                started.elapsed()
            ),
            Err(e) => error!("Suggestion failed after {:?}: {e}", started.elapsed()),
        }

        // the requester may have gone away; nothing to do then
        let _ = task.return_channel.send(result);
    }

    info!("Reply assistant shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::enrichment::EnrichedComment;
    use crate::infrastructure::entities::TicketStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn comment(content: &str, is_agent: bool) -> EnrichedComment {
        EnrichedComment {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            author: None,
            content: content.to_owned(),
            created_at: Utc::now(),
            is_agent,
        }
    }

    fn ticket(comments: Vec<EnrichedComment>) -> EnrichedTicket {
        EnrichedTicket {
            id: Uuid::new_v4(),
            subject: "Cannot login".into(),
            description: "It keeps saying invalid password".into(),
            status: TicketStatus::InProgress,
            category_id: Uuid::new_v4(),
            category: None,
            requester_id: Uuid::new_v4(),
            requester: None,
            assignee_id: None,
            assignee: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            upvotes: 0,
            downvotes: 0,
            comments,
        }
    }

    #[test]
    fn test_input_uses_latest_customer_message() {
        let ticket = ticket(vec![
            comment("first question", false),
            comment("which email?", true),
            comment("alice@example.com", false),
            comment("thanks, checking", true),
        ]);

        let input = SuggestReplyInput::from_ticket(&ticket);

        assert_eq!(input.ticket_description, "It keeps saying invalid password");
        assert_eq!(input.customer_message, "alice@example.com");
        assert_eq!(input.agent_messages, vec!["which email?", "thanks, checking"]);
    }

    #[test]
    fn test_input_without_customer_comments() {
        let input = SuggestReplyInput::from_ticket(&ticket(Vec::new()));

        assert_eq!(input.customer_message, NO_CUSTOMER_MESSAGE);
        assert!(input.agent_messages.is_empty());
    }

    #[test]
    fn test_render_prompt_includes_ticket_context() {
        let (task, _) = SuggestionTask::new(SuggestReplyInput {
            ticket_description: "Charged twice".into(),
            customer_message: "Any update?".into(),
            agent_messages: vec!["Looking into it".into(), "Refund issued".into()],
        });

        let messages = render_prompt(&prompt_environment(), &task).unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        let prompt = &messages[1].content;
        assert!(prompt.contains("Ticket Description: Charged twice"));
        assert!(prompt.contains("Latest Customer Message: Any update?"));
        assert!(prompt.contains("Looking into it\nRefund issued"));
    }

    #[test]
    fn test_as_jinja_input_exposes_fields() {
        let (task, _) = SuggestionTask::new(SuggestReplyInput {
            ticket_description: String::new(),
            customer_message: "Any update?".into(),
            agent_messages: Vec::new(),
        });

        let input = task.as_jinja_input();
        assert_eq!(
            input.get_attr("customer_message").unwrap().as_str(),
            Some("Any update?")
        );
    }

    #[tokio::test]
    async fn test_suggestion_task_new_creates_channel() {
        let (task, receiver) = SuggestionTask::new(SuggestReplyInput {
            ticket_description: "d".into(),
            customer_message: "c".into(),
            agent_messages: Vec::new(),
        });

        task.return_channel.send(Ok("reply".into())).unwrap();

        assert_eq!(receiver.await.unwrap().unwrap(), "reply");
    }

    #[test]
    fn test_completion_response_into_reply() {
        let response: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Hi Alice!  "}}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_reply().unwrap(), "Hi Alice!");

        let empty: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(empty.into_reply(), Err(AppError::Suggestion(_))));
    }
}
