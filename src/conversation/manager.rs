//! SessionManager — owns live sessions and routes each incoming message to
//! the guided flow or to free-form chat.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::bridges::{ChatBridge, LeadPersistence, PreferenceExtractor, extraction_due};
use crate::error::{ConversationError, Error};
use crate::tasks::{BackgroundTasks, TaskKind};

use super::model::SessionId;
use super::prompts::CHAT_FALLBACK;
use super::session::{GuidedOutcome, Session, SessionSnapshot};
use super::steps::StepDefinition;
use super::transcript::TranscriptEntry;

/// Default time a session may sit untouched before the sweep drops it.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(3600);

type SessionHandle = Arc<Mutex<Session>>;

/// What one turn produced, for the widget to render.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub session_id: SessionId,
    pub mode: &'static str,
    pub cursor: usize,
    /// Entries appended during this turn, user entry first.
    pub entries: Vec<TranscriptEntry>,
    /// Quick-reply choices for the next input; empty in free-form mode.
    pub options: Vec<String>,
}

impl TurnReply {
    fn from_session(session: &Session, appended_from: usize) -> Self {
        Self {
            session_id: session.id().clone(),
            mode: session.mode().name(),
            cursor: session.cursor(),
            entries: session.transcript().since(appended_from).to_vec(),
            options: session.options().to_vec(),
        }
    }
}

/// Coordinates sessions with the chat, extraction and persistence bridges.
///
/// Each session sits behind its own mutex, held for a whole turn including
/// the model call, so a session's turns apply in arrival order and a reply
/// is always appended after the message that caused it.
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    steps: &'static [StepDefinition],
    chat: Arc<ChatBridge>,
    extractor: Arc<PreferenceExtractor>,
    persistence: Arc<LeadPersistence>,
    tasks: BackgroundTasks,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(
        steps: &'static [StepDefinition],
        chat: Arc<ChatBridge>,
        extractor: Arc<PreferenceExtractor>,
        persistence: Arc<LeadPersistence>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            steps,
            chat,
            extractor,
            persistence,
            tasks: BackgroundTasks::new(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn chat(&self) -> &Arc<ChatBridge> {
        &self.chat
    }

    pub fn extractor(&self) -> &Arc<PreferenceExtractor> {
        &self.extractor
    }

    pub fn persistence(&self) -> &Arc<LeadPersistence> {
        &self.persistence
    }

    /// Background persistence and extraction work spawned by turns.
    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Open a new session and return its opening turn (greetings and the
    /// first question).
    pub async fn start_session(&self) -> TurnReply {
        let id = SessionId::generate();
        let session = Session::start(id.clone(), self.steps);
        let reply = TurnReply::from_session(&session, 0);

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            warn!(session_id = %id, "Session id collision, replacing existing session");
        }
        sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        info!(session_id = %id, active = sessions.len(), "Session started");
        reply
    }

    pub async fn snapshot(&self, id: &SessionId) -> Result<SessionSnapshot, ConversationError> {
        let handle = self.handle(id).await?;
        let session = handle.lock().await;
        Ok(session.snapshot())
    }

    async fn handle(&self, id: &SessionId) -> Result<SessionHandle, ConversationError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ConversationError::SessionNotFound(id.to_string()))
    }

    /// Process one user message.
    ///
    /// In guided mode the text answers the current question. In free-form
    /// mode it goes to the model; a failed call is answered with a fixed
    /// apology instead of an error.
    pub async fn handle_message(
        &self,
        id: &SessionId,
        text: &str,
    ) -> Result<TurnReply, ConversationError> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        session.touch();
        let before = session.transcript().len();

        if session.mode().is_guided() {
            let outcome = session.submit_answer(text)?;
            debug!(session_id = %id, mode = %session.mode(), "Guided answer recorded");
            self.persist_transcript(&session);
            if outcome == GuidedOutcome::Completed {
                info!(session_id = %id, fields = session.lead().len(), "Guided questions complete");
                self.persist_lead(&session);
            }
            return Ok(TurnReply::from_session(&session, before));
        }

        session.push_user_message(text)?;
        let reply = self
            .chat
            .converse(text, &session.transcript().entries()[..before])
            .await;

        match reply {
            Ok(content) => {
                session.push_assistant_message(content);
                if extraction_due(before, session.transcript().len()) {
                    self.spawn_extraction(&handle, &session);
                }
            }
            Err(e) => {
                warn!(session_id = %id, error = %e, "Chat reply failed, sending fallback");
                session.push_assistant_message(CHAT_FALLBACK);
            }
        }
        self.persist_transcript(&session);

        Ok(TurnReply::from_session(&session, before))
    }

    fn persist_transcript(&self, session: &Session) {
        if !self.persistence.is_configured() {
            return;
        }
        let persistence = Arc::clone(&self.persistence);
        let id = session.id().clone();
        let entries = session.transcript().entries().to_vec();
        self.tasks.spawn(TaskKind::SaveTranscript, id.clone(), async move {
            persistence
                .save_transcript(id.as_str(), &entries)
                .await
                .map(drop)
                .map_err(Error::from)
        });
    }

    fn persist_lead(&self, session: &Session) {
        if !self.persistence.is_configured() {
            debug!(session_id = %session.id(), "Storage not configured, lead kept in memory only");
            return;
        }
        let persistence = Arc::clone(&self.persistence);
        let id = session.id().clone();
        let row = session.lead().to_row();
        self.tasks.spawn(TaskKind::SaveLead, id.clone(), async move {
            persistence
                .save_lead(id.as_str(), row)
                .await
                .map(drop)
                .map_err(Error::from)
        });
    }

    /// Extract preferences from the transcript so far and merge them into
    /// the lead once the model answers.
    fn spawn_extraction(&self, handle: &SessionHandle, session: &Session) {
        if !self.extractor.is_configured() {
            return;
        }
        let extractor = Arc::clone(&self.extractor);
        let handle = Arc::clone(handle);
        let id = session.id().clone();
        let entries = session.transcript().entries().to_vec();
        self.tasks.spawn(TaskKind::ExtractPreferences, id.clone(), async move {
            let preferences = extractor.extract(&entries, Some(&id)).await?;
            if let Some(map) = preferences.as_structured() {
                let changed = handle.lock().await.merge_extracted(map);
                debug!(session_id = %id, changed = changed.len(), "Extracted preferences merged");
            }
            Ok(())
        });
    }

    /// Drop sessions idle for longer than the timeout. Sessions mid-turn are
    /// skipped. Returns how many were removed.
    pub async fn prune_idle(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => (now - session.last_active())
                .to_std()
                .map(|idle| idle < self.idle_timeout)
                .unwrap_or(true),
            Err(_) => true,
        });
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, active = sessions.len(), "Pruned idle sessions");
        }
        removed
    }
}

/// Spawn a background task that prunes idle sessions every `every`.
pub fn spawn_idle_sweep(
    manager: Arc<SessionManager>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            manager.prune_idle().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::bridges::StorageTables;
    use crate::conversation::model::LeadField;
    use crate::conversation::prompts::{COMPLETION_MESSAGE, EXTRACTION_PROMPT, STARTER_SUGGESTIONS};
    use crate::conversation::steps::REALTECH_STEPS;
    use crate::conversation::transcript::Speaker;
    use crate::error::LlmError;
    use crate::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
    use crate::store::MemoryStore;

    const ANSWERS: [&str; 10] = [
        "Hyderabad, Gachibowli",
        "Invest",
        "50L - 1Cr",
        "Apartment",
        "2 BHK",
        "Gated community",
        "6+ months",
        "No preference",
        "Just browsing",
        "ravi@example.com",
    ];

    /// Answers extraction prompts with JSON and everything else with a
    /// fixed reply.
    struct ScriptedLlm;

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            let is_extraction = request.messages[0].content.starts_with(EXTRACTION_PROMPT);
            let content = if is_extraction {
                r#"```json
{"location_preference": "Kondapur", "budget": "80L"}
```"#
            } else {
                "Kondapur has several 2 BHK options in that range."
            };
            Ok(CompletionResponse {
                content: content.to_string(),
                input_tokens: 10,
                output_tokens: 10,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    fn manager(llm: Option<Arc<dyn LlmProvider>>, store: Option<Arc<MemoryStore>>) -> SessionManager {
        let store = store.map(|s| s as Arc<dyn crate::store::LeadStore>);
        let persistence = Arc::new(LeadPersistence::new(store, StorageTables::default()));
        SessionManager::new(
            &REALTECH_STEPS,
            Arc::new(ChatBridge::new(llm.clone())),
            Arc::new(PreferenceExtractor::new(llm, Arc::clone(&persistence))),
            persistence,
        )
    }

    async fn complete_guided(manager: &SessionManager) -> SessionId {
        let id = manager.start_session().await.session_id;
        for answer in ANSWERS {
            manager.handle_message(&id, answer).await.unwrap();
        }
        id
    }

    #[tokio::test]
    async fn start_session_returns_greeting_and_first_question() {
        let manager = manager(None, None);
        let reply = manager.start_session().await;
        assert_eq!(reply.mode, "guided");
        assert_eq!(reply.cursor, 0);
        assert_eq!(reply.entries.len(), 3);
        assert_eq!(reply.entries[2].content, REALTECH_STEPS[0].prompt);
        assert_eq!(reply.options, STARTER_SUGGESTIONS);
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn guided_answers_return_next_question_and_options() {
        let manager = manager(None, None);
        let id = manager.start_session().await.session_id;

        let reply = manager.handle_message(&id, "Hyderabad").await.unwrap();
        assert_eq!(reply.cursor, 1);
        assert_eq!(reply.entries.len(), 2);
        assert_eq!(reply.entries[0].role, Speaker::User);
        assert_eq!(reply.entries[1].content, REALTECH_STEPS[1].prompt);
        assert_eq!(reply.options, ["Buy", "Rent", "Invest"]);
    }

    #[tokio::test]
    async fn completing_the_flow_saves_the_lead_once() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(None, Some(store.clone()));
        let id = complete_guided(&manager).await;

        let reports = manager.tasks().drain().await;
        assert!(reports.iter().all(|r| r.is_ok()));

        let leads = store.calls_for("lead_profiles").await;
        assert_eq!(leads.len(), 1);
        let row = &leads[0].row;
        assert_eq!(row["session_id"], id.as_str());
        for (field, answer) in LeadField::ALL.into_iter().zip(ANSWERS) {
            assert_eq!(row[field.as_str()], answer);
        }
        // Ten fields plus session id and timestamp.
        assert_eq!(row.len(), 12);

        assert_eq!(store.calls_for("conversations").await.len(), 10);
        let snapshot = manager.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.mode, "free_form");
        assert_eq!(snapshot.transcript.last().unwrap().content, COMPLETION_MESSAGE);
    }

    #[tokio::test]
    async fn model_failure_yields_apology() {
        let manager = manager(None, None);
        let id = complete_guided(&manager).await;

        let reply = manager
            .handle_message(&id, "What's the price per square foot in downtown?")
            .await
            .unwrap();
        assert_eq!(reply.mode, "free_form");
        assert_eq!(reply.entries.len(), 2);
        assert_eq!(reply.entries[0].content, "What's the price per square foot in downtown?");
        assert_eq!(reply.entries[1].role, Speaker::Assistant);
        assert_eq!(reply.entries[1].content, CHAT_FALLBACK);
        assert!(reply.options.is_empty());
        assert!(manager.tasks().drain().await.is_empty());
    }

    #[tokio::test]
    async fn extraction_runs_on_cadence_and_merges_into_lead() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(Some(Arc::new(ScriptedLlm)), Some(store.clone()));
        let id = complete_guided(&manager).await;
        manager.tasks().drain().await;

        // 23 entries after the questionnaire; this turn crosses 24.
        let reply = manager.handle_message(&id, "Any options near Kondapur?").await.unwrap();
        assert_eq!(reply.entries[1].content, "Kondapur has several 2 BHK options in that range.");
        let reports = manager.tasks().drain().await;
        assert_eq!(
            reports
                .iter()
                .filter(|r| r.kind == TaskKind::ExtractPreferences)
                .count(),
            1
        );

        let snapshot = manager.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.lead.get(LeadField::LocationPreference), Some("Kondapur"));
        assert_eq!(snapshot.lead.get(LeadField::Budget), Some("80L"));
        assert_eq!(snapshot.lead.get(LeadField::Intent), Some("Invest"));
        let stored = store.get("lead_profiles", id.as_str()).await.unwrap();
        assert_eq!(stored["location_preference"], "Kondapur");

        // 25 -> 27 crosses no multiple of four.
        manager.handle_message(&id, "And schools nearby?").await.unwrap();
        let reports = manager.tasks().drain().await;
        assert!(reports.iter().all(|r| r.kind != TaskKind::ExtractPreferences));
    }

    /// Slow to answer "first", fails every extraction.
    struct SlowThenFailingLlm;

    #[async_trait]
    impl LlmProvider for SlowThenFailingLlm {
        fn model_name(&self) -> &str {
            "slow"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            if request.messages[0].content.starts_with(EXTRACTION_PROMPT) {
                return Err(LlmError::RequestFailed {
                    provider: "slow".to_string(),
                    reason: "upstream unavailable".to_string(),
                });
            }
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            if last == "first" {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Ok(CompletionResponse {
                content: format!("re:{last}"),
                input_tokens: 1,
                output_tokens: 1,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    #[tokio::test]
    async fn concurrent_turns_apply_in_arrival_order() {
        let manager = Arc::new(manager(Some(Arc::new(SlowThenFailingLlm)), None));
        let id = complete_guided(&manager).await;
        manager.tasks().drain().await;

        let first = tokio::spawn({
            let manager = Arc::clone(&manager);
            let id = id.clone();
            async move { manager.handle_message(&id, "first").await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = tokio::spawn({
            let manager = Arc::clone(&manager);
            let id = id.clone();
            async move { manager.handle_message(&id, "second").await }
        });

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_eq!(first.entries[0].content, "first");
        assert_eq!(first.entries[1].content, "re:first");
        assert_eq!(second.entries[1].content, "re:second");

        let transcript = manager.snapshot(&id).await.unwrap().transcript;
        let tail: Vec<&str> = transcript[transcript.len() - 4..]
            .iter()
            .map(|e| e.content.as_str())
            .collect();
        assert_eq!(tail, ["first", "re:first", "second", "re:second"]);
    }

    #[tokio::test]
    async fn extraction_failure_leaves_reply_intact() {
        let manager = manager(Some(Arc::new(SlowThenFailingLlm)), None);
        let id = complete_guided(&manager).await;
        manager.tasks().drain().await;

        // 23 -> 25 crosses 24, so extraction is attempted.
        let reply = manager.handle_message(&id, "second").await.unwrap();
        assert_eq!(reply.entries[1].content, "re:second");

        let reports: Vec<_> = manager
            .tasks()
            .drain()
            .await
            .into_iter()
            .filter(|r| r.kind == TaskKind::ExtractPreferences)
            .collect();
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0].result, Err(Error::Llm(_))));

        let snapshot = manager.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.transcript.last().unwrap().content, "re:second");
        assert_eq!(snapshot.lead.get(LeadField::Intent), Some("Invest"));
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let manager = manager(None, None);
        let id = manager.start_session().await.session_id;
        let err = manager.handle_message(&id, "  ").await.unwrap_err();
        assert!(matches!(err, ConversationError::EmptyMessage));
        assert_eq!(manager.snapshot(&id).await.unwrap().transcript.len(), 3);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let manager = manager(None, None);
        let err = manager
            .handle_message(&SessionId::from("session_missing"), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ConversationError::SessionNotFound(id) if id == "session_missing"));
    }

    #[tokio::test]
    async fn prune_idle_respects_timeout() {
        let manager = manager(None, None);
        manager.start_session().await;
        assert_eq!(manager.prune_idle().await, 0);

        let manager = manager_with_zero_timeout();
        manager.start_session().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(manager.prune_idle().await, 1);
        assert_eq!(manager.session_count().await, 0);
    }

    fn manager_with_zero_timeout() -> SessionManager {
        manager(None, None).with_idle_timeout(Duration::ZERO)
    }
}
