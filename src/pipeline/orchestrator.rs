//! Resumable course pipeline.
//!
//! Stages run strictly in order:
//! Setup → Research → Synthesis → Writing → Publish → Done
//!
//! After research, after synthesis and after every newly written lesson the
//! checkpoint record is updated and saved, so a crash loses at most the unit
//! in flight. Stage failures are not retried here; the next run resumes.

use super::prompts::{lesson_prompt, research_notes_prompt, synthesis_prompt};
use super::publish::{README_FILE, render_readme};
use crate::checkpoint::{CheckpointRecord, CheckpointStore, ResumeAnalyzer, ResumeInfo};
use crate::client::{
    Researcher, TextGenerator, VersionControl, extract_sources, format_search_results,
};
use crate::content::{ContentBudgeter, extract_lesson_outline, lesson_key, lesson_path, slug};
use crate::models::{Config, PipelineState, Result, ScriptoriumError, StageOutput};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Research,
    Synthesis,
    Writing,
    Publish,
    Done,
}

impl Stage {
    /// The stage that follows this one. `Done` is terminal.
    pub fn next(self) -> Self {
        match self {
            Stage::Setup => Stage::Research,
            Stage::Research => Stage::Synthesis,
            Stage::Synthesis => Stage::Writing,
            Stage::Writing => Stage::Publish,
            Stage::Publish | Stage::Done => Stage::Done,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Research => "research",
            Stage::Synthesis => "synthesis",
            Stage::Writing => "writing",
            Stage::Publish => "publish",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// External services the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub researcher: Arc<dyn Researcher>,
    /// Turns search results into research notes
    pub note_taker: Arc<dyn TextGenerator>,
    /// Writes the knowledge base and the lessons
    pub author: Arc<dyn TextGenerator>,
    pub version_control: Arc<dyn VersionControl>,
}

/// Tunables for one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Base for namespaces when no repository directory is given
    pub output_dir: PathBuf,
    pub notes_temperature: f64,
    pub synthesis_temperature: f64,
    pub lesson_temperature: f64,
    pub max_output_tokens: u32,
    pub max_input_tokens: usize,
    pub remote_url: Option<String>,
    pub show_progress: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.output.dir.clone(),
            notes_temperature: config.generation.notes_temperature,
            synthesis_temperature: config.generation.synthesis_temperature,
            lesson_temperature: config.generation.lesson_temperature,
            max_output_tokens: config.generation.max_output_tokens,
            max_input_tokens: config.generation.max_input_tokens,
            remote_url: config.git.remote_url.clone().filter(|url| !url.is_empty()),
            show_progress: true,
        }
    }
}

/// One run's inputs.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub topic: String,
    pub target_audience: String,
    /// Existing directory to place the namespace in, instead of the output dir
    pub repo_dir: Option<PathBuf>,
}

impl RunRequest {
    pub fn new(topic: impl Into<String>, target_audience: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            target_audience: target_audience.into(),
            repo_dir: None,
        }
    }

    pub fn with_repo_dir(mut self, repo_dir: impl Into<PathBuf>) -> Self {
        self.repo_dir = Some(repo_dir.into());
        self
    }
}

/// Per-run checkpoint handles produced by setup.
struct RunContext {
    store: CheckpointStore,
    record: CheckpointRecord,
    resume: ResumeInfo,
}

impl RunContext {
    /// Fold the state into the record and persist it.
    fn save(&mut self, state: &PipelineState) -> Result<()> {
        self.record.absorb(state);
        self.store.save(&self.record)
    }
}

/// Drives a topic from nothing (or a partial checkpoint) to a published course.
pub struct Orchestrator {
    collaborators: Collaborators,
    settings: PipelineSettings,
    budgeter: ContentBudgeter,
}

impl Orchestrator {
    pub fn new(
        collaborators: Collaborators,
        settings: PipelineSettings,
        budgeter: ContentBudgeter,
    ) -> Self {
        Self {
            collaborators,
            settings,
            budgeter,
        }
    }

    /// Run every stage for `request`, resuming from whatever the namespace already holds.
    pub async fn run(&self, request: &RunRequest) -> Result<PipelineState> {
        let start = Instant::now();
        let mut state = PipelineState::new(&request.topic, &request.target_audience);

        info!(topic = %request.topic, audience = %request.target_audience, "Starting pipeline");

        debug!(stage = %Stage::Setup, "Entering stage");
        let mut ctx = self.setup(request, &mut state).await?;

        let mut stage = Stage::Setup.next();
        while stage != Stage::Done {
            debug!(stage = %stage, "Entering stage");
            match stage {
                Stage::Research => self.research(&mut ctx, &mut state).await?,
                Stage::Synthesis => self.synthesis(&mut ctx, &mut state).await?,
                Stage::Writing => self.writing(&mut ctx, &mut state).await?,
                Stage::Publish => self.publish(&mut state).await?,
                Stage::Setup | Stage::Done => {}
            }
            stage = stage.next();
        }

        info!(
            namespace = %state.namespace.display(),
            lessons = state.lesson_count(),
            written = state.report.lessons_written,
            reused = state.report.lessons_reused,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Pipeline complete"
        );

        Ok(state)
    }

    async fn setup(&self, request: &RunRequest, state: &mut PipelineState) -> Result<RunContext> {
        let base = match &request.repo_dir {
            Some(dir) => {
                let dir = expand_home(dir);
                if !dir.is_dir() {
                    return Err(ScriptoriumError::MissingDirectory(dir));
                }
                dir
            }
            None => {
                fs::create_dir_all(&self.settings.output_dir)
                    .map_err(|e| ScriptoriumError::io("creating output directory", e))?;
                self.settings.output_dir.clone()
            }
        };

        let namespace = base.join(slug::resolve(&request.topic));
        fs::create_dir_all(namespace.join("lessons"))
            .map_err(|e| ScriptoriumError::io("creating namespace", e))?;
        state.namespace = fs::canonicalize(&namespace)
            .map_err(|e| ScriptoriumError::io("resolving namespace path", e))?;

        if let Err(e) = self
            .collaborators
            .version_control
            .ensure_repo(&state.namespace)
            .await
        {
            warn!(error = %e, "Could not initialize version control, continuing without it");
        }

        let store = CheckpointStore::new(&state.namespace);
        let record = store.load();
        let resume = ResumeAnalyzer::inspect(&record, store.exists(), &state.lessons_dir())?;

        if resume.is_resuming() {
            info!(
                namespace = %state.namespace.display(),
                skip_research = resume.can_skip_research,
                skip_synthesis = resume.can_skip_synthesis,
                lessons_done = resume.completed_lessons.len(),
                "Resuming from checkpoint"
            );
        } else {
            info!(namespace = %state.namespace.display(), "Starting fresh");
        }

        Ok(RunContext {
            store,
            record,
            resume,
        })
    }

    async fn research(&self, ctx: &mut RunContext, state: &mut PipelineState) -> Result<()> {
        if ctx.resume.can_skip_research {
            info!("Research found in checkpoint, skipping");
            state.apply(StageOutput::Research {
                sources: ctx.record.research_sources.clone(),
                raw_notes: ctx.record.raw_notes.clone(),
            });
            state.report.research_skipped = true;
            return Ok(());
        }

        info!(topic = %state.topic, "Researching");
        let response = self.collaborators.researcher.search(&state.topic).await?;
        let sources = extract_sources(&response);
        let search_results = self.budgeter.fit_for_prompt(
            &format_search_results(&response),
            self.settings.max_input_tokens,
            "Search results",
        );

        let (system, user) =
            research_notes_prompt(&state.topic, &state.target_audience, &search_results);
        let raw_notes = self
            .collaborators
            .note_taker
            .generate(&system, &user, self.settings.notes_temperature, None)
            .await?;

        info!(sources = sources.len(), notes_chars = raw_notes.len(), "Research complete");
        state.apply(StageOutput::Research { sources, raw_notes });
        ctx.save(state)
    }

    async fn synthesis(&self, ctx: &mut RunContext, state: &mut PipelineState) -> Result<()> {
        if ctx.resume.can_skip_synthesis {
            let knowledge_base = ctx.record.knowledge_base.clone();
            let lesson_outline = if ctx.record.lesson_outline.is_empty() {
                extract_lesson_outline(&knowledge_base)
            } else {
                ctx.record.lesson_outline.clone()
            };
            info!(lessons = lesson_outline.len(), "Knowledge base found in checkpoint, skipping");
            state.apply(StageOutput::Synthesis {
                knowledge_base,
                lesson_outline,
            });
            state.report.synthesis_skipped = true;
            return Ok(());
        }

        info!("Synthesizing knowledge base");
        let raw_notes = self.budgeter.fit_for_prompt(
            &state.raw_notes,
            self.settings.max_input_tokens,
            "Raw research notes",
        );
        let (system, user) = synthesis_prompt(&state.topic, &raw_notes);
        let knowledge_base = self
            .collaborators
            .author
            .generate(
                &system,
                &user,
                self.settings.synthesis_temperature,
                Some(self.settings.max_output_tokens),
            )
            .await?;
        let lesson_outline = extract_lesson_outline(&knowledge_base);

        info!(lessons = lesson_outline.len(), "Synthesis complete");
        state.apply(StageOutput::Synthesis {
            knowledge_base,
            lesson_outline,
        });
        ctx.save(state)
    }

    async fn writing(&self, ctx: &mut RunContext, state: &mut PipelineState) -> Result<()> {
        let outline = state.lesson_outline.clone();
        let lessons_dir = state.lessons_dir();

        let pb = if self.settings.show_progress {
            ProgressBar::new(outline.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("##-"));
        }

        for (i, title) in outline.iter().enumerate() {
            let key = lesson_key(i + 1, title);
            let path = lesson_path(&lessons_dir, &key);
            pb.set_message(title.clone());

            if ctx.resume.completed_lessons.contains(&key) {
                debug!(lesson = %key, "Lesson already on disk, reusing");
                let content = fs::read_to_string(&path)
                    .map_err(|e| ScriptoriumError::io(format!("reading lesson {key}"), e))?;
                state.apply(StageOutput::Lesson { key, content });
                state.report.lessons_reused += 1;
                pb.inc(1);
                continue;
            }

            info!(lesson = i + 1, total = outline.len(), title = %title, "Writing lesson");
            let (system, user) = lesson_prompt(
                &state.topic,
                title,
                &state.target_audience,
                &state.knowledge_base,
            );
            let content = self
                .collaborators
                .author
                .generate(
                    &system,
                    &user,
                    self.settings.lesson_temperature,
                    Some(self.settings.max_output_tokens),
                )
                .await?;

            write_new_file(&path, &content)?;
            state.apply(StageOutput::Lesson { key, content });
            state.report.lessons_written += 1;
            ctx.save(state)?;
            pb.inc(1);
        }

        pb.finish_with_message(format!(
            "{} written, {} reused",
            state.report.lessons_written, state.report.lessons_reused
        ));
        Ok(())
    }

    async fn publish(&self, state: &mut PipelineState) -> Result<()> {
        fs::write(state.namespace.join(README_FILE), render_readme(state))
            .map_err(|e| ScriptoriumError::io("writing README", e))?;

        let vcs = &self.collaborators.version_control;
        let message = format!("Add course: {}", state.topic);
        if vcs.commit(&state.namespace, &message).await? {
            info!(message = %message, "Committed course");
        } else {
            debug!("Nothing new to commit");
        }

        let url = match &self.settings.remote_url {
            Some(remote) => {
                vcs.push(&state.namespace, remote).await?;
                remote.clone()
            }
            None => format!("file://{}", state.namespace.display()),
        };

        info!(url = %url, "Course published");
        state.apply(StageOutput::Published { url });
        Ok(())
    }
}

/// Write a lesson file that must not exist yet.
///
/// The body goes to a hidden sibling first and is linked into place only once
/// complete, so `lessons/` never holds a truncated `lesson_*.md`.
fn write_new_file(path: &Path, content: &str) -> Result<()> {
    let context = || format!("writing {}", path.display());
    let staging = staging_path(path);

    let written = write_staged(&staging, content).and_then(|()| fs::hard_link(&staging, path));
    let _ = fs::remove_file(&staging);
    written.map_err(|e| ScriptoriumError::io(context(), e))
}

fn write_staged(staging: &Path, content: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(staging)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}

/// `lessons/.lesson_01_x.md.partial` for `lessons/lesson_01_x.md`.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CHECKPOINT_FILE;
    use crate::content::DEFAULT_OUTLINE;
    use crate::pipeline::testing::{
        FakeGenerator, FakeResearcher, FakeVersionControl, knowledge_base_with, word_budgeter,
    };
    use tempfile::TempDir;

    const OUTLINE: [&str; 5] = [
        "What Is a Cache?",
        "Eviction Policies",
        "Cache Invalidation",
        "Distributed Caching",
        "Measuring Hit Rates",
    ];

    struct Harness {
        researcher: Arc<FakeResearcher>,
        note_taker: Arc<FakeGenerator>,
        author: Arc<FakeGenerator>,
        vcs: Arc<FakeVersionControl>,
    }

    impl Harness {
        fn new(author: FakeGenerator) -> Self {
            Self::with_vcs(author, FakeVersionControl::default())
        }

        fn with_vcs(author: FakeGenerator, vcs: FakeVersionControl) -> Self {
            Self {
                researcher: Arc::new(FakeResearcher::default()),
                note_taker: Arc::new(FakeGenerator::notes()),
                author: Arc::new(author),
                vcs: Arc::new(vcs),
            }
        }

        fn orchestrator(&self, settings: PipelineSettings) -> Orchestrator {
            let collaborators = Collaborators {
                researcher: self.researcher.clone(),
                note_taker: self.note_taker.clone(),
                author: self.author.clone(),
                version_control: self.vcs.clone(),
            };
            Orchestrator::new(collaborators, settings, word_budgeter())
        }

        fn generation_calls(&self) -> usize {
            self.researcher.calls() + self.note_taker.calls() + self.author.calls()
        }
    }

    fn settings(output_dir: &Path) -> PipelineSettings {
        PipelineSettings {
            output_dir: output_dir.to_path_buf(),
            show_progress: false,
            ..PipelineSettings::from_config(&Config::default())
        }
    }

    fn lesson_files(namespace: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(namespace.join("lessons"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_stage_order() {
        let mut stage = Stage::Setup;
        let mut seen = vec![stage];
        while stage != Stage::Done {
            stage = stage.next();
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                Stage::Setup,
                Stage::Research,
                Stage::Synthesis,
                Stage::Writing,
                Stage::Publish,
                Stage::Done
            ]
        );
        assert_eq!(Stage::Done.next(), Stage::Done);
        assert_eq!(Stage::Writing.to_string(), "writing");
    }

    #[tokio::test]
    async fn test_fresh_run_produces_course() {
        let temp = TempDir::new().unwrap();
        let harness = Harness::new(FakeGenerator::author(&OUTLINE));
        let orchestrator = harness.orchestrator(settings(temp.path()));

        let state = orchestrator
            .run(&RunRequest::new("Intro to Caching", "backend developers"))
            .await
            .unwrap();

        assert!(state.namespace.ends_with("intro-to-caching"));
        assert_eq!(state.lesson_outline, OUTLINE);
        assert_eq!(state.lesson_count(), 5);
        assert_eq!(state.research_sources.len(), 1);
        assert!(!state.raw_notes.is_empty());
        assert!(state.knowledge_base.contains("## LESSON OUTLINE"));
        assert_eq!(state.report.lessons_written, 5);
        assert_eq!(state.report.lessons_reused, 0);
        assert!(!state.report.research_skipped);

        assert_eq!(harness.researcher.calls(), 1);
        assert_eq!(harness.note_taker.calls(), 1);
        assert_eq!(harness.author.calls(), 6);

        let files = lesson_files(&state.namespace);
        assert_eq!(files[0], "lesson_01_what_is_a_cache.md");
        assert_eq!(files.len(), 5);
        let first = fs::read_to_string(state.namespace.join("lessons").join(&files[0])).unwrap();
        assert!(first.starts_with("# What Is a Cache?"));

        let record = CheckpointStore::new(&state.namespace).load();
        assert_eq!(record.topic, "Intro to Caching");
        assert_eq!(record.lesson_outline, OUTLINE);
        assert_eq!(record.completed_lessons.len(), 5);
        assert!(record.updated_at.is_some());

        assert!(state.namespace.join(README_FILE).exists());
        assert_eq!(
            *harness.vcs.commits.lock().unwrap(),
            vec!["Add course: Intro to Caching".to_string()]
        );
        assert!(harness.vcs.pushes.lock().unwrap().is_empty());
        assert_eq!(
            state.publish_url,
            format!("file://{}", state.namespace.display())
        );
    }

    #[tokio::test]
    async fn test_rerun_of_finished_course_generates_nothing() {
        let temp = TempDir::new().unwrap();
        let request = RunRequest::new("Intro to Caching", "backend developers");

        let first = Harness::new(FakeGenerator::author(&OUTLINE));
        let original = first
            .orchestrator(settings(temp.path()))
            .run(&request)
            .await
            .unwrap();

        let second = Harness::new(FakeGenerator::author(&OUTLINE));
        let rerun = second
            .orchestrator(settings(temp.path()))
            .run(&request)
            .await
            .unwrap();

        assert_eq!(second.generation_calls(), 0);
        assert!(rerun.report.research_skipped);
        assert!(rerun.report.synthesis_skipped);
        assert_eq!(rerun.report.lessons_reused, 5);
        assert_eq!(rerun.report.lessons_written, 0);
        assert_eq!(rerun.lessons, original.lessons);
        assert_eq!(rerun.research_sources, original.research_sources);
    }

    #[tokio::test]
    async fn test_crash_mid_writing_resumes_remaining_lessons() {
        let temp = TempDir::new().unwrap();
        let request = RunRequest::new("Intro to Caching", "backend developers");

        // Call 1 is synthesis, calls 2-3 are lessons 1-2, call 4 (lesson 3) fails.
        let crashing = Harness::new(FakeGenerator::failing_author(&OUTLINE, 4));
        let err = crashing
            .orchestrator(settings(temp.path()))
            .run(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, ScriptoriumError::Timeout(_)));

        let namespace = temp.path().join("intro-to-caching");
        assert_eq!(lesson_files(&namespace).len(), 2);
        let record = CheckpointStore::new(&namespace).load();
        assert_eq!(record.completed_lessons.len(), 2);
        assert!(!record.knowledge_base.is_empty());

        let resumed = Harness::new(FakeGenerator::author(&OUTLINE));
        let state = resumed
            .orchestrator(settings(temp.path()))
            .run(&request)
            .await
            .unwrap();

        assert_eq!(resumed.researcher.calls(), 0);
        assert_eq!(resumed.note_taker.calls(), 0);
        assert_eq!(resumed.author.calls(), 3);
        assert_eq!(state.report.lessons_reused, 2);
        assert_eq!(state.report.lessons_written, 3);
        assert_eq!(lesson_files(&state.namespace).len(), 5);

        let keys: Vec<&String> = state.lessons.keys().collect();
        assert!(keys[0].starts_with("lesson_01_"));
        assert!(keys[4].starts_with("lesson_05_"));
    }

    #[tokio::test]
    async fn test_malformed_synthesis_falls_back_to_default_outline() {
        let temp = TempDir::new().unwrap();
        let author = FakeGenerator::new(|_, prompt| {
            Ok(if prompt.contains("Lesson title: ") {
                "lesson body".to_string()
            } else {
                "A knowledge base without any outline section.".to_string()
            })
        });
        let harness = Harness::new(author);

        let state = harness
            .orchestrator(settings(temp.path()))
            .run(&RunRequest::new("Kubernetes", "ops"))
            .await
            .unwrap();

        assert_eq!(state.lesson_outline, DEFAULT_OUTLINE);
        assert_eq!(lesson_files(&state.namespace).len(), 4);
        assert_eq!(
            lesson_files(&state.namespace)[0],
            "lesson_01_introduction_and_fundamentals.md"
        );
    }

    #[tokio::test]
    async fn test_missing_repo_dir_is_rejected() {
        let temp = TempDir::new().unwrap();
        let harness = Harness::new(FakeGenerator::author(&OUTLINE));
        let request = RunRequest::new("Caching", "devs").with_repo_dir(temp.path().join("nope"));

        let err = harness
            .orchestrator(settings(temp.path()))
            .run(&request)
            .await
            .unwrap_err();

        assert!(matches!(err, ScriptoriumError::MissingDirectory(_)));
        assert_eq!(harness.generation_calls(), 0);
        assert!(!temp.path().join("caching").exists());
    }

    #[tokio::test]
    async fn test_repo_dir_hosts_namespace() {
        let output = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let harness = Harness::new(FakeGenerator::author(&OUTLINE[..2]));
        let request = RunRequest::new("Caching", "devs").with_repo_dir(repo.path());

        let state = harness
            .orchestrator(settings(output.path()))
            .run(&request)
            .await
            .unwrap();

        assert_eq!(
            state.namespace,
            fs::canonicalize(repo.path().join("caching")).unwrap()
        );
        assert!(!output.path().join("caching").exists());
    }

    #[tokio::test]
    async fn test_notes_only_checkpoint_skips_research() {
        let temp = TempDir::new().unwrap();
        let namespace = temp.path().join("caching");
        fs::create_dir_all(&namespace).unwrap();
        let record = CheckpointRecord {
            topic: "Caching".to_string(),
            raw_notes: "saved notes".to_string(),
            ..Default::default()
        };
        CheckpointStore::new(&namespace).save(&record).unwrap();

        let harness = Harness::new(FakeGenerator::author(&OUTLINE[..3]));
        let state = harness
            .orchestrator(settings(temp.path()))
            .run(&RunRequest::new("Caching", "devs"))
            .await
            .unwrap();

        assert_eq!(harness.researcher.calls(), 0);
        assert_eq!(harness.note_taker.calls(), 0);
        assert_eq!(harness.author.calls(), 4);
        assert_eq!(state.raw_notes, "saved notes");
        assert!(state.report.research_skipped);
        assert!(!state.report.synthesis_skipped);
    }

    #[tokio::test]
    async fn test_empty_recorded_outline_is_rederived() {
        let temp = TempDir::new().unwrap();
        let namespace = temp.path().join("caching");
        fs::create_dir_all(&namespace).unwrap();
        let record = CheckpointRecord {
            raw_notes: "notes".to_string(),
            knowledge_base: knowledge_base_with(&OUTLINE[..2]),
            ..Default::default()
        };
        CheckpointStore::new(&namespace).save(&record).unwrap();

        let harness = Harness::new(FakeGenerator::author(&OUTLINE));
        let state = harness
            .orchestrator(settings(temp.path()))
            .run(&RunRequest::new("Caching", "devs"))
            .await
            .unwrap();

        assert_eq!(state.lesson_outline, OUTLINE[..2]);
        assert_eq!(harness.author.calls(), 2);
    }

    #[tokio::test]
    async fn test_lesson_on_disk_is_never_rewritten() {
        let temp = TempDir::new().unwrap();
        let namespace = temp.path().join("caching");
        fs::create_dir_all(namespace.join("lessons")).unwrap();
        fs::write(
            namespace.join("lessons/lesson_01_what_is_a_cache.md"),
            "hand edited",
        )
        .unwrap();
        // Checkpoint says nothing about lessons; the directory is authoritative.
        let record = CheckpointRecord {
            raw_notes: "notes".to_string(),
            knowledge_base: knowledge_base_with(&OUTLINE[..2]),
            lesson_outline: OUTLINE[..2].iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        CheckpointStore::new(&namespace).save(&record).unwrap();

        let harness = Harness::new(FakeGenerator::author(&OUTLINE));
        let state = harness
            .orchestrator(settings(temp.path()))
            .run(&RunRequest::new("Caching", "devs"))
            .await
            .unwrap();

        assert_eq!(harness.author.calls(), 1);
        assert_eq!(state.lessons["lesson_01_what_is_a_cache"], "hand edited");
        assert_eq!(
            fs::read_to_string(namespace.join("lessons/lesson_01_what_is_a_cache.md")).unwrap(),
            "hand edited"
        );
        let saved = CheckpointStore::new(&namespace).load();
        assert_eq!(saved.completed_lessons.len(), 2);
    }

    #[tokio::test]
    async fn test_version_control_failure_at_setup_is_tolerated() {
        let temp = TempDir::new().unwrap();
        let vcs = FakeVersionControl {
            fail_ensure: true,
            ..Default::default()
        };
        let harness = Harness::with_vcs(FakeGenerator::author(&OUTLINE[..1]), vcs);

        let state = harness
            .orchestrator(settings(temp.path()))
            .run(&RunRequest::new("Caching", "devs"))
            .await
            .unwrap();

        assert_eq!(state.lesson_count(), 1);
        assert_eq!(harness.vcs.commits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remote_url_is_pushed_and_reported() {
        let temp = TempDir::new().unwrap();
        let harness = Harness::new(FakeGenerator::author(&OUTLINE[..1]));
        let settings = PipelineSettings {
            remote_url: Some("git@example.com:courses/caching.git".to_string()),
            ..settings(temp.path())
        };

        let state = harness
            .orchestrator(settings)
            .run(&RunRequest::new("Caching", "devs"))
            .await
            .unwrap();

        assert_eq!(state.publish_url, "git@example.com:courses/caching.git");
        assert_eq!(
            *harness.vcs.pushes.lock().unwrap(),
            vec!["git@example.com:courses/caching.git".to_string()]
        );
    }

    #[tokio::test]
    async fn test_checkpoint_file_lives_in_namespace() {
        let temp = TempDir::new().unwrap();
        let harness = Harness::new(FakeGenerator::author(&OUTLINE[..1]));
        let state = harness
            .orchestrator(settings(temp.path()))
            .run(&RunRequest::new("Caching", "devs"))
            .await
            .unwrap();

        assert!(state.namespace.join(CHECKPOINT_FILE).is_file());
    }

    #[test]
    fn test_expand_home() {
        let plain = PathBuf::from("/srv/courses");
        assert_eq!(expand_home(&plain), plain);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/courses")), home.join("courses"));
            assert_eq!(expand_home(Path::new("~")), home);
        }
    }

    #[test]
    fn test_write_new_file_leaves_no_staging_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lesson_01_basics.md");

        write_new_file(&path, "body").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "body");
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_new_file_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lesson_01_basics.md");
        fs::write(&path, "original").unwrap();

        let err = write_new_file(&path, "replacement").unwrap_err();

        assert!(matches!(err, ScriptoriumError::Io { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
        assert!(!staging_path(&path).exists());
    }

    #[tokio::test]
    async fn test_interrupted_lesson_write_is_regenerated() {
        let temp = TempDir::new().unwrap();
        let namespace = temp.path().join("caching");
        let lessons = namespace.join("lessons");
        fs::create_dir_all(&lessons).unwrap();
        // What a crash in the middle of writing lesson 1 leaves behind.
        fs::write(
            staging_path(&lessons.join("lesson_01_what_is_a_cache.md")),
            "# What Is a Ca",
        )
        .unwrap();
        let record = CheckpointRecord {
            raw_notes: "notes".to_string(),
            knowledge_base: knowledge_base_with(&OUTLINE[..1]),
            ..Default::default()
        };
        CheckpointStore::new(&namespace).save(&record).unwrap();

        let harness = Harness::new(FakeGenerator::author(&OUTLINE));
        let state = harness
            .orchestrator(settings(temp.path()))
            .run(&RunRequest::new("Caching", "devs"))
            .await
            .unwrap();

        assert_eq!(harness.author.calls(), 1);
        assert_eq!(state.report.lessons_written, 1);
        assert!(state.lessons["lesson_01_what_is_a_cache"].starts_with("# What Is a Cache?"));
        assert_eq!(lesson_files(&namespace), vec!["lesson_01_what_is_a_cache.md"]);
    }

    #[tokio::test]
    async fn test_research_is_checkpointed_before_synthesis() {
        let temp = TempDir::new().unwrap();
        let request = RunRequest::new("Intro to Caching", "backend developers");

        // Call 1 is synthesis.
        let crashing = Harness::new(FakeGenerator::failing_author(&OUTLINE, 1));
        crashing
            .orchestrator(settings(temp.path()))
            .run(&request)
            .await
            .unwrap_err();

        let namespace = temp.path().join("intro-to-caching");
        let record = CheckpointStore::new(&namespace).load();
        assert!(!record.raw_notes.is_empty());
        assert_eq!(record.research_sources.len(), 1);
        assert!(record.knowledge_base.is_empty());
        assert!(record.lesson_outline.is_empty());

        let resumed = Harness::new(FakeGenerator::author(&OUTLINE));
        let state = resumed
            .orchestrator(settings(temp.path()))
            .run(&request)
            .await
            .unwrap();

        assert_eq!(resumed.researcher.calls(), 0);
        assert_eq!(resumed.note_taker.calls(), 0);
        assert_eq!(resumed.author.calls(), 6);
        assert!(state.report.research_skipped);
        assert_eq!(state.research_sources.len(), 1);
    }

    #[tokio::test]
    async fn test_dot_topic_stays_inside_output_dir() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("outputs");
        let harness = Harness::new(FakeGenerator::author(&OUTLINE[..1]));

        let state = harness
            .orchestrator(settings(&output))
            .run(&RunRequest::new("..", "devs"))
            .await
            .unwrap();

        assert_eq!(
            state.namespace,
            fs::canonicalize(output.join(slug::UNTITLED_SLUG)).unwrap()
        );
        assert!(!temp.path().join(CHECKPOINT_FILE).exists());
        assert!(!temp.path().join("lessons").exists());
    }
}
