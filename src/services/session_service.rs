//! One player's session: feeds input to the state machine and carries out the work it requests.

use std::{sync::Arc, time::Duration};

use tokio::time::timeout;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    dao::{quiz_repository::QuizRepository, storage::StorageResult},
    dto::{frame::SessionFrame, quiz_text},
    error::SessionError,
    services::{
        generator::{GeneratorError, QuizGenerator},
        plot::ScorePlotter,
        storage_supervisor::{RetryPolicy, persist_with_retry},
    },
    state::{
        Command, Completion, InputEvent, QuizLookup, QuizStore, SessionMachine,
        layout::PLOT_ROWS,
    },
};

/// Presentation layer fed with a fresh frame after every state change.
pub trait Renderer: Send {
    /// Draw `frame`.
    fn render(&mut self, frame: &SessionFrame);
}

/// Tunables of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSettings {
    /// Upper bound on a single generation call; `None` waits indefinitely.
    pub generation_timeout: Option<Duration>,
    /// Backoff for failed store writes.
    pub retry: RetryPolicy,
}

/// A running quiz session.
pub struct Session {
    id: Uuid,
    span: Span,
    machine: SessionMachine,
    store: QuizStore,
    generator: Arc<dyn QuizGenerator>,
    plotter: Arc<dyn ScorePlotter>,
    renderer: Box<dyn Renderer>,
    settings: SessionSettings,
}

impl Session {
    /// Load the quiz store and show the name screen.
    ///
    /// Fails with [`SessionError::StorageUnavailable`] when the store cannot be read.
    pub async fn start(
        repository: Arc<dyn QuizRepository>,
        generator: Arc<dyn QuizGenerator>,
        plotter: Arc<dyn ScorePlotter>,
        renderer: Box<dyn Renderer>,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        let id = Uuid::new_v4();
        let span = info_span!("session", %id);
        let store = QuizStore::load(repository).instrument(span.clone()).await?;
        span.in_scope(|| info!(topics = store.len(), "session started"));

        let mut session = Self {
            id,
            span,
            machine: SessionMachine::new(),
            store,
            generator,
            plotter,
            renderer,
            settings,
        };
        session.render();
        Ok(session)
    }

    /// Session identifier used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// State machine of the session.
    pub fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    /// Quiz store backing the session.
    pub fn store(&self) -> &QuizStore {
        &self.store
    }

    /// Whether the player has left.
    pub fn is_finished(&self) -> bool {
        self.machine.is_finished()
    }

    /// Write any play still held only in memory, retrying per the session's policy.
    ///
    /// Called when input ends so a result awaiting a retry is not dropped on exit.
    pub async fn flush_pending(&mut self) -> Result<(), SessionError> {
        if !self.store.is_dirty() {
            return Ok(());
        }
        let span = self.span.clone();
        async {
            info!("writing unsaved play before exit");
            persist_with_retry(&mut self.store, self.settings.retry).await
        }
        .instrument(span)
        .await?;
        Ok(())
    }

    /// Feed one input event and carry out whatever work it triggers.
    pub async fn handle(&mut self, input: InputEvent) -> Result<(), SessionError> {
        if self.machine.is_finished() {
            return Ok(());
        }
        let command = self.machine.apply_input(input);
        let span = self.span.clone();
        self.run(command).instrument(span).await
    }

    async fn run(&mut self, command: Command) -> Result<(), SessionError> {
        match command {
            Command::Ignore => return Ok(()),
            Command::Render => {}
            Command::GenerateQuiz { topic } => {
                self.render();
                let completion = match self.prepare_quiz(&topic).await {
                    Ok(lookup) => {
                        info!(
                            requested = %topic,
                            topic = %lookup.quiz.topic,
                            is_new_quiz = lookup.is_new_quiz,
                            "quiz ready"
                        );
                        Completion::QuizReady(lookup)
                    }
                    Err(err) => {
                        warn!(requested = %topic, error = %err, "quiz generation failed");
                        Completion::GenerationFailed(err.to_string())
                    }
                };
                self.machine.complete(completion)?;
            }
            Command::RecordOutcome { score } => {
                self.render();
                let Some(lookup) = self.machine.quiz().cloned() else {
                    warn!("no quiz in progress; nothing to record");
                    return Ok(());
                };
                let result = match self.store.record_outcome(&lookup, score).await {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        warn!(error = %err, "failed to write recorded play");
                        persist_with_retry(&mut self.store, self.settings.retry).await
                    }
                };
                self.settle_persist(result)?;
            }
            Command::RetryPersist => {
                self.render();
                let result = persist_with_retry(&mut self.store, self.settings.retry).await;
                self.settle_persist(result)?;
            }
            Command::ReloadStore => {
                self.store.reload().await?;
                debug!(topics = self.store.len(), "quiz store reloaded for replay");
            }
            Command::PlotTopic { row } => {
                let Some(record) = self.store.records().take(PLOT_ROWS).nth(row) else {
                    return Ok(());
                };
                let topic = record.topic().to_string();
                let image = self.plotter.plot(&topic, &record.all_scores)?;
                self.machine.complete(Completion::PlotReady { topic, image })?;
            }
            Command::Leave => {
                info!(player = %self.machine.player().name, "player left");
            }
        }
        self.render();
        Ok(())
    }

    /// Ask the generator for a quiz, decode it and decide whether a stored one replaces it.
    async fn prepare_quiz(&self, topic: &str) -> Result<QuizLookup, SessionError> {
        let known = self.store.known_topics();
        let request = self.generator.generate(topic, &known);
        let text = match self.settings.generation_timeout {
            Some(limit) => timeout(limit, request)
                .await
                .map_err(|_| GeneratorError::Timeout(limit.as_secs()))??,
            None => request.await?,
        };
        let generated = quiz_text::decode(&text)?;
        let summarized = generated.topic.clone();
        Ok(self.store.lookup_or_create(&summarized, generated))
    }

    fn settle_persist(&mut self, result: StorageResult<()>) -> Result<(), SessionError> {
        let completion = match result {
            Ok(()) => Completion::OutcomeStored,
            Err(err) => {
                error!(error = %err, "play kept in memory only; waiting for retry");
                Completion::OutcomeNotStored(format!("Could not save your result: {err}"))
            }
        };
        self.machine.complete(completion)?;
        Ok(())
    }

    fn render(&mut self) {
        let frame = SessionFrame::build(&self.machine, &self.store);
        self.renderer.render(&frame);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::{FutureExt, future::BoxFuture};

    use super::*;
    use crate::{
        dao::{models::StoreDocument, quiz_repository::memory::MemoryRepository},
        dto::{frame::VisibleStage, quiz_text::fixtures::response},
        services::{generator::scripted::ScriptedGenerator, plot::SvgHistogramPlotter},
        state::{
            Choice, Stage,
            layout::{
                LEAVE_BUTTON, PERFORMANCE_BUTTON, REPLAY_BUTTON, choice_region, plot_row_region,
            },
        },
    };

    #[derive(Clone, Default)]
    struct RecordingRenderer {
        frames: Arc<Mutex<Vec<SessionFrame>>>,
    }

    impl RecordingRenderer {
        fn stages(&self) -> Vec<VisibleStage> {
            self.frames.lock().unwrap().iter().map(|f| f.stage).collect()
        }

        fn last(&self) -> SessionFrame {
            self.frames.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Renderer for RecordingRenderer {
        fn render(&mut self, frame: &SessionFrame) {
            self.frames.lock().unwrap().push(frame.clone());
        }
    }

    struct PendingGenerator;

    impl QuizGenerator for PendingGenerator {
        fn generate(
            &self,
            _topic: &str,
            _known_topics: &[String],
        ) -> BoxFuture<'static, Result<String, GeneratorError>> {
            futures::future::pending::<Result<String, GeneratorError>>().boxed()
        }
    }

    struct Harness {
        session: Session,
        repository: MemoryRepository,
        generator: ScriptedGenerator,
        renderer: RecordingRenderer,
        _plots: tempfile::TempDir,
    }

    async fn harness(repository: MemoryRepository) -> Harness {
        let generator = ScriptedGenerator::new();
        let renderer = RecordingRenderer::default();
        let plots = tempfile::tempdir().unwrap();
        let session = Session::start(
            Arc::new(repository.clone()),
            Arc::new(generator.clone()),
            Arc::new(SvgHistogramPlotter::new(plots.path())),
            Box::new(renderer.clone()),
            SessionSettings {
                generation_timeout: None,
                retry: RetryPolicy::no_retry(),
            },
        )
        .await
        .unwrap();
        Harness {
            session,
            repository,
            generator,
            renderer,
            _plots: plots,
        }
    }

    fn click((x, y): (i32, i32)) -> InputEvent {
        InputEvent::PointerClick { x, y }
    }

    async fn type_and_commit(session: &mut Session, text: &str) {
        for c in text.chars() {
            session.handle(InputEvent::KeyAppend(c)).await.unwrap();
        }
        session.handle(InputEvent::KeyCommit).await.unwrap();
    }

    /// Answer the five fixture questions (answers 1, 2, 3, 4, 1), getting `right[i]` right.
    async fn play_round(session: &mut Session, right: [bool; 5]) {
        let answers = [1, 2, 3, 4, 1];
        for (answer, right) in answers.into_iter().zip(right) {
            let number = if right { answer } else { answer % 4 + 1 };
            let target = choice_region(Choice::new(number).unwrap()).center();
            session.handle(click(target)).await.unwrap();
            session.handle(InputEvent::KeyCommit).await.unwrap();
        }
    }

    #[tokio::test]
    async fn full_round_is_recorded_and_persisted() {
        let mut h = harness(MemoryRepository::new()).await;
        h.generator.push(Ok(response("Volcanoes")));

        type_and_commit(&mut h.session, "Alice").await;
        type_and_commit(&mut h.session, "volcanoes").await;
        assert_eq!(h.session.machine().stage(), &Stage::Quiz { question_index: 0 });
        assert_eq!(h.session.machine().player().topic, "volcanoes");

        play_round(&mut h.session, [true, true, true, false, true]).await;

        assert_eq!(h.session.machine().stage(), &Stage::SessionEnd);
        assert_eq!(h.session.machine().player().score, 4);
        let document = h.repository.document().unwrap();
        assert_eq!(document.all_topics, vec!["Volcanoes".to_string()]);
        assert_eq!(document.all_quizzes[0].use_count, 1);
        assert_eq!(document.all_quizzes[0].all_score, vec![4]);
        assert_eq!(document.all_quizzes[0].correct_percentage, 80.0);

        let stages = h.renderer.stages();
        assert_eq!(stages.first(), Some(&VisibleStage::EnteringName));
        assert!(stages.contains(&VisibleStage::GeneratingQuiz));
        assert!(stages.contains(&VisibleStage::AnswerFeedback));
        assert_eq!(stages.last(), Some(&VisibleStage::SessionEnd));
    }

    #[tokio::test]
    async fn generator_failure_returns_to_topic_screen() {
        let mut h = harness(MemoryRepository::new()).await;
        h.generator.push(Err(GeneratorError::Unavailable("offline".into())));

        type_and_commit(&mut h.session, "Alice").await;
        type_and_commit(&mut h.session, "volcanoes").await;

        assert_eq!(h.session.machine().stage(), &Stage::ChoosingTopic);
        let frame = h.renderer.last();
        assert!(frame.notice.unwrap().contains("offline"));
        assert!(h.repository.document().is_none());
    }

    #[tokio::test]
    async fn malformed_response_returns_to_topic_screen() {
        let mut h = harness(MemoryRepository::new()).await;
        h.generator.push(Ok("Here is your quiz about volcanoes!".into()));

        type_and_commit(&mut h.session, "Alice").await;
        type_and_commit(&mut h.session, "volcanoes").await;

        assert_eq!(h.session.machine().stage(), &Stage::ChoosingTopic);
        assert!(h.session.machine().notice().unwrap().contains("malformed"));
        assert!(h.session.machine().quiz().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generator_times_out() {
        let renderer = RecordingRenderer::default();
        let plots = tempfile::tempdir().unwrap();
        let mut session = Session::start(
            Arc::new(MemoryRepository::new()),
            Arc::new(PendingGenerator),
            Arc::new(SvgHistogramPlotter::new(plots.path())),
            Box::new(renderer.clone()),
            SessionSettings {
                generation_timeout: Some(Duration::from_secs(5)),
                retry: RetryPolicy::no_retry(),
            },
        )
        .await
        .unwrap();

        type_and_commit(&mut session, "Alice").await;
        type_and_commit(&mut session, "volcanoes").await;

        assert_eq!(session.machine().stage(), &Stage::ChoosingTopic);
        assert!(renderer.last().notice.unwrap().contains("timed out after 5s"));
    }

    #[tokio::test]
    async fn failed_write_waits_for_retry_without_recording_twice() {
        let mut h = harness(MemoryRepository::new()).await;
        h.generator.push(Ok(response("Volcanoes")));
        type_and_commit(&mut h.session, "Alice").await;
        type_and_commit(&mut h.session, "volcanoes").await;

        h.repository.fail_saves(true);
        play_round(&mut h.session, [true; 5]).await;

        assert_eq!(
            h.session.machine().stage(),
            &Stage::Updating {
                awaiting_retry: true
            }
        );
        assert!(h.session.machine().notice().is_some());
        assert!(h.session.store().is_dirty());
        assert!(h.repository.document().is_none());

        h.repository.fail_saves(false);
        h.session.handle(InputEvent::KeyCommit).await.unwrap();

        assert_eq!(h.session.machine().stage(), &Stage::SessionEnd);
        let document = h.repository.document().unwrap();
        assert_eq!(document.all_quizzes[0].use_count, 1);
        assert_eq!(document.all_quizzes[0].all_score, vec![5]);
    }

    #[tokio::test]
    async fn pending_play_is_flushed_when_input_ends() {
        let mut h = harness(MemoryRepository::new()).await;
        h.generator.push(Ok(response("Volcanoes")));
        type_and_commit(&mut h.session, "Alice").await;
        type_and_commit(&mut h.session, "volcanoes").await;
        h.repository.fail_saves(true);
        play_round(&mut h.session, [true, true, false, true, true]).await;

        let err = h.session.flush_pending().await.unwrap_err();
        assert!(err.is_fatal());
        assert!(h.session.store().is_dirty());

        h.repository.fail_saves(false);
        h.session.flush_pending().await.unwrap();

        assert!(!h.session.store().is_dirty());
        let document = h.repository.document().unwrap();
        assert_eq!(document.all_quizzes[0].use_count, 1);
        assert_eq!(document.all_quizzes[0].all_score, vec![4]);
        assert_eq!(h.repository.save_count(), 1);

        h.session.flush_pending().await.unwrap();
        assert_eq!(h.repository.save_count(), 1);
    }

    #[tokio::test]
    async fn replay_reuses_stored_quiz_and_passes_known_topics() {
        let mut h = harness(MemoryRepository::new()).await;
        h.generator.push(Ok(response("Volcanoes")));
        h.generator.push(Ok(response("Volcanoes").replace("What about", "Other")));

        type_and_commit(&mut h.session, "Alice").await;
        type_and_commit(&mut h.session, "volcanoes").await;
        play_round(&mut h.session, [true, true, true, false, true]).await;

        h.session.handle(click(REPLAY_BUTTON.center())).await.unwrap();
        assert_eq!(h.session.machine().stage(), &Stage::ChoosingTopic);
        assert_eq!(h.session.machine().player().score, 0);
        assert_eq!(h.session.machine().player().topic, "");
        assert_eq!(h.session.machine().player().name, "Alice");

        type_and_commit(&mut h.session, "VOLCANOES").await;
        let lookup = h.session.machine().quiz().unwrap();
        assert!(!lookup.is_new_quiz);
        assert_eq!(lookup.quiz.questions[0].text, "What about Volcanoes #1?");

        play_round(&mut h.session, [false, false, true, true, true]).await;

        let requests = h.generator.requests();
        assert_eq!(requests[0].1, Vec::<String>::new());
        assert_eq!(
            requests[1],
            ("VOLCANOES".to_string(), vec!["Volcanoes".to_string()])
        );

        let document = h.repository.document().unwrap();
        assert_eq!(document.all_quizzes.len(), 1);
        assert_eq!(document.all_quizzes[0].use_count, 2);
        assert_eq!(document.all_quizzes[0].all_score, vec![4, 3]);
        assert_eq!(document.all_quizzes[0].correct_percentage, 70.0);
    }

    #[tokio::test]
    async fn performance_rows_open_plots() {
        let mut h = harness(MemoryRepository::new()).await;
        h.generator.push(Ok(response("Volcanoes")));
        type_and_commit(&mut h.session, "Alice").await;
        type_and_commit(&mut h.session, "volcanoes").await;
        play_round(&mut h.session, [true; 5]).await;
        h.session.handle(click(REPLAY_BUTTON.center())).await.unwrap();

        h.session
            .handle(click(PERFORMANCE_BUTTON.center()))
            .await
            .unwrap();
        let frame = h.renderer.last();
        assert_eq!(frame.stage, VisibleStage::Performance);
        assert_eq!(frame.performance.unwrap()[0].topic, "Volcanoes");

        // Rows without a topic do nothing.
        h.session.handle(click(plot_row_region(3).center())).await.unwrap();
        assert_eq!(h.renderer.last().stage, VisibleStage::Performance);

        h.session.handle(click(plot_row_region(0).center())).await.unwrap();
        let frame = h.renderer.last();
        assert_eq!(frame.stage, VisibleStage::Plot);
        assert!(frame.plot_image.unwrap().exists());

        h.session.handle(InputEvent::PointerRightClick).await.unwrap();
        assert_eq!(h.renderer.last().stage, VisibleStage::Performance);
        h.session.handle(InputEvent::PointerRightClick).await.unwrap();
        assert_eq!(h.session.machine().stage(), &Stage::ChoosingTopic);
    }

    #[tokio::test]
    async fn leaving_ends_the_session() {
        let mut h = harness(MemoryRepository::with_document(StoreDocument::default())).await;
        h.generator.push(Ok(response("Volcanoes")));
        type_and_commit(&mut h.session, "Alice").await;
        type_and_commit(&mut h.session, "volcanoes").await;
        play_round(&mut h.session, [true; 5]).await;

        h.session.handle(click(LEAVE_BUTTON.center())).await.unwrap();

        assert!(h.session.is_finished());
        assert_eq!(h.renderer.last().stage, VisibleStage::Left);
        let rendered = h.renderer.frames.lock().unwrap().len();
        h.session.handle(InputEvent::KeyCommit).await.unwrap();
        assert_eq!(h.renderer.frames.lock().unwrap().len(), rendered);
    }

    #[tokio::test]
    async fn unreadable_store_prevents_start() {
        let repository = MemoryRepository::new();
        repository.fail_loads(true);

        let result = Session::start(
            Arc::new(repository),
            Arc::new(ScriptedGenerator::new()),
            Arc::new(SvgHistogramPlotter::new("unused")),
            Box::new(RecordingRenderer::default()),
            SessionSettings::default(),
        )
        .await;

        assert!(matches!(result, Err(SessionError::StorageUnavailable(_))));
    }
}
