//! Language-model assistant.
//!
//! The assistant answers three kinds of requests against the user's
//! calendar: extracting a single event from free text, suggesting free time
//! slots, and answering questions. The model itself is an external CLI that
//! reads a prompt on stdin and writes its reply to stdout. Replies for the
//! structured kinds are expected to contain a JSON object; anything that
//! does not parse is surfaced as a plain answer.
//!
//! There is no retry. A failed call is logged and turned into a fallback
//! message for the user.

use std::fmt::Write as _;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::event::{CalendarEvent, EventCategory};

/// Shown to the user when the assistant cannot be reached.
pub const FALLBACK_MESSAGE: &str = "Sorry, I couldn't reach the assistant. Please try again.";

/// Maximum number of upcoming events included in a prompt.
const MAX_CONTEXT_EVENTS: usize = 50;

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantRequest {
    /// Create one event from a natural-language description.
    ExtractEvent(String),
    /// Rank free time slots for the described activity.
    SuggestSlots(String),
    /// Free-form question about the calendar.
    Ask(String),
}

impl AssistantRequest {
    pub fn text(&self) -> &str {
        match self {
            Self::ExtractEvent(t) | Self::SuggestSlots(t) | Self::Ask(t) => t,
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            Self::ExtractEvent(_) => EXTRACT_INSTRUCTIONS,
            Self::SuggestSlots(_) => SLOTS_INSTRUCTIONS,
            Self::Ask(_) => ASK_INSTRUCTIONS,
        }
    }
}

const EXTRACT_INSTRUCTIONS: &str = r#"Extract exactly one calendar event from the user's message.
Reply with only a JSON object:
{"title": "...", "description": "... or null", "start": "RFC 3339 timestamp", "end": "RFC 3339 timestamp or null", "category": "work|personal|health|social|travel|other"}"#;

const SLOTS_INSTRUCTIONS: &str = r#"Suggest up to five free time slots that do not overlap the existing events, best first.
Reply with only a JSON object:
{"slots": [{"start": "RFC 3339 timestamp", "end": "RFC 3339 timestamp", "reason": "short explanation"}]}"#;

const ASK_INSTRUCTIONS: &str =
    "Answer the user's question about their calendar briefly, in plain text.";

/// A suggested free time slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSuggestion {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub reason: String,
}

/// Interpreted assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantReply {
    /// A new event ready to be added to the store.
    Event(CalendarEvent),
    /// Ranked slot suggestions, best first.
    Slots(Vec<SlotSuggestion>),
    /// Free text.
    Answer(String),
    /// The assistant could not be reached; carries the user-facing message.
    Fallback(String),
}

/// A model that completes prompts.
pub trait LanguageModel {
    /// Model name for logging.
    fn name(&self) -> &str;

    /// Send `prompt` and return the raw reply.
    fn complete(
        &self,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<String, AssistantError>> + Send;
}

/// A model CLI invoked as a child process.
#[derive(Debug, Clone)]
pub struct CommandModel {
    config: ModelConfig,
}

impl CommandModel {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Whether the model command can be found on `PATH`.
    pub fn is_available(&self) -> bool {
        self.config
            .command_argv
            .first()
            .is_some_and(|cmd| which::which(cmd).is_ok())
    }
}

impl LanguageModel for CommandModel {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, prompt: &str) -> Result<String, AssistantError> {
        let (program, args) = self
            .config
            .command_argv
            .split_first()
            .ok_or(AssistantError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(AssistantError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).await?;
            drop(stdin);
        }

        let limit = Duration::from_secs(self.config.timeout_seconds);
        let output = timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| AssistantError::Timeout(self.config.timeout_seconds))??;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(AssistantError::Failed(stderr.trim().to_string()));
        }

        // Some CLIs write their reply to stderr.
        let reply = if stdout.trim().is_empty() { stderr } else { stdout };
        if reply.trim().is_empty() {
            return Err(AssistantError::EmptyReply);
        }
        Ok(reply)
    }
}

/// Whether the command configured for the assistant can be found on `PATH`.
pub fn assistant_available(config: &ModelConfig) -> bool {
    CommandModel::new(config.clone()).is_available()
}

/// Calendar assistant over a [`LanguageModel`].
#[derive(Debug, Clone)]
pub struct Assistant<M> {
    model: M,
}

impl<M: LanguageModel> Assistant<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Run a request, propagating model errors.
    pub async fn ask(
        &self,
        request: &AssistantRequest,
        events: &[CalendarEvent],
        now: DateTime<Utc>,
    ) -> Result<AssistantReply, AssistantError> {
        let prompt = build_prompt(request, events, now);
        debug!(model = self.model.name(), chars = prompt.len(), "Sending assistant prompt");
        let raw = self.model.complete(&prompt).await?;
        Ok(parse_reply(request, &raw))
    }

    /// Run a request, turning any failure into [`AssistantReply::Fallback`].
    pub async fn respond(
        &self,
        request: &AssistantRequest,
        events: &[CalendarEvent],
        now: DateTime<Utc>,
    ) -> AssistantReply {
        match self.ask(request, events, now).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(model = self.model.name(), error = %e, "Assistant request failed");
                AssistantReply::Fallback(FALLBACK_MESSAGE.to_string())
            }
        }
    }
}

/// Build the prompt for `request`, including upcoming events as context.
pub fn build_prompt(
    request: &AssistantRequest,
    events: &[CalendarEvent],
    now: DateTime<Utc>,
) -> String {
    let mut upcoming: Vec<&CalendarEvent> = events.iter().filter(|e| e.end >= now).collect();
    upcoming.sort_by_key(|e| e.start);

    let mut prompt = String::new();
    prompt.push_str("You are a helpful calendar assistant.\n");
    let _ = writeln!(
        prompt,
        "The current time is {} (local time {}).\n",
        now.to_rfc3339(),
        now.with_timezone(&Local).format("%A %Y-%m-%d %H:%M %:z")
    );

    prompt.push_str("Upcoming events:\n");
    if upcoming.is_empty() {
        prompt.push_str("(none)\n");
    }
    for event in upcoming.iter().take(MAX_CONTEXT_EVENTS) {
        let _ = writeln!(
            prompt,
            "- {} to {}: {} [{}]",
            event.start.to_rfc3339(),
            event.end.to_rfc3339(),
            event.title,
            event.category
        );
    }

    let _ = write!(
        prompt,
        "\n{}\n\nUser: {}\n",
        request.instructions(),
        request.text()
    );
    prompt
}

/// Interpret a raw reply, using local time for timestamps without an offset.
pub fn parse_reply(request: &AssistantRequest, raw: &str) -> AssistantReply {
    parse_reply_in(request, raw, &Local)
}

/// Interpret a raw reply for `request`.
///
/// Structured replies that cannot be parsed degrade to [`AssistantReply::Answer`].
pub fn parse_reply_in<Tz: TimeZone>(
    request: &AssistantRequest,
    raw: &str,
    tz: &Tz,
) -> AssistantReply {
    let parsed = match request {
        AssistantRequest::Ask(_) => None,
        AssistantRequest::ExtractEvent(_) => parse_event(raw, tz).map(AssistantReply::Event),
        AssistantRequest::SuggestSlots(_) => parse_slots(raw, tz).map(AssistantReply::Slots),
    };

    parsed.unwrap_or_else(|| {
        if !matches!(request, AssistantRequest::Ask(_)) {
            debug!("Structured assistant reply did not parse; showing as text");
        }
        AssistantReply::Answer(raw.trim().to_string())
    })
}

#[derive(Debug, Deserialize)]
struct EventDraft {
    title: String,
    #[serde(default)]
    description: Option<String>,
    start: String,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlotDraft {
    start: String,
    end: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    rank: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SlotsDraft {
    Wrapped { slots: Vec<SlotDraft> },
    Bare(Vec<SlotDraft>),
}

fn parse_event<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<CalendarEvent> {
    let draft: EventDraft = serde_json::from_str(extract_json(raw)?).ok()?;
    let title = draft.title.trim();
    if title.is_empty() {
        return None;
    }

    let start = parse_timestamp(&draft.start, tz)?;
    // A missing or unreadable end becomes start + 1h via normalization.
    let end = draft
        .end
        .as_deref()
        .and_then(|s| parse_timestamp(s, tz))
        .unwrap_or(start);

    let mut event = CalendarEvent::new(title, start, end).with_category(
        draft
            .category
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(EventCategory::Other),
    );
    event.description = draft.description.filter(|d| !d.trim().is_empty());
    Some(event)
}

fn parse_slots<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<Vec<SlotSuggestion>> {
    let drafts = match serde_json::from_str(extract_json(raw)?).ok()? {
        SlotsDraft::Wrapped { slots } | SlotsDraft::Bare(slots) => slots,
    };

    let mut ranked: Vec<(Option<u32>, SlotSuggestion)> = drafts
        .into_iter()
        .filter_map(|d| {
            let start = parse_timestamp(&d.start, tz)?;
            let end = parse_timestamp(&d.end, tz)?;
            (end > start).then(|| {
                (
                    d.rank,
                    SlotSuggestion {
                        start,
                        end,
                        reason: d.reason,
                    },
                )
            })
        })
        .collect();

    // Explicit ranks first, then the model's order.
    ranked.sort_by_key(|(rank, _)| rank.unwrap_or(u32::MAX));
    Some(ranked.into_iter().map(|(_, slot)| slot).collect())
}

/// Locate the JSON payload in a reply: a fenced block, else the outermost
/// braces or brackets.
fn extract_json(raw: &str) -> Option<&str> {
    static FENCED: OnceLock<Option<Regex>> = OnceLock::new();
    let fenced = FENCED
        .get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").ok())
        .as_ref();

    if let Some(caps) = fenced.and_then(|re| re.captures(raw)) {
        if let Some(body) = caps.get(1) {
            return Some(body.as_str());
        }
    }

    let open = raw.find(['{', '['])?;
    let close_char = if raw[open..].starts_with('{') { '}' } else { ']' };
    let close = raw.rfind(close_char)?;
    (close > open).then(|| &raw[open..=close])
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` interpreted in `tz`.
fn parse_timestamp<Tz: TimeZone>(s: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Errors from talking to the model.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to spawn process.
    #[error("Failed to spawn assistant: {0}")]
    Spawn(#[source] std::io::Error),

    /// Process timed out.
    #[error("Assistant timed out after {0}s")]
    Timeout(u64),

    /// The configured command is empty.
    #[error("Assistant command is empty")]
    EmptyCommand,

    /// The model exited unsuccessfully.
    #[error("Assistant failed: {0}")]
    Failed(String),

    /// The model produced no output.
    #[error("Assistant returned an empty reply")]
    EmptyReply,
}
