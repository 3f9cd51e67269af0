//! Scripted collaborators for pipeline tests.

use crate::client::{Researcher, SearchHit, SearchResponse, TextGenerator, VersionControl};
use crate::content::{ContentBudgeter, UnitCounter};
use crate::models::{Result, ScriptoriumError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct WordCounter;

impl UnitCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

pub fn word_budgeter() -> ContentBudgeter {
    ContentBudgeter::new(Arc::new(WordCounter))
}

#[derive(Default)]
pub struct FakeResearcher {
    pub calls: AtomicUsize,
}

impl FakeResearcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Researcher for FakeResearcher {
    async fn search(&self, topic: &str) -> Result<SearchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SearchResponse {
            query: topic.to_string(),
            results: vec![SearchHit {
                title: Some(format!("{topic} explained")),
                url: "https://example.com/guide".to_string(),
                content: format!("All about {topic}."),
                raw_content: None,
                score: 0.87,
            }],
        })
    }
}

type Responder = dyn Fn(usize, &str) -> Result<String> + Send + Sync;

/// Generator answering with a closure of (1-based call number, user prompt).
pub struct FakeGenerator {
    calls: AtomicUsize,
    responder: Box<Responder>,
}

impl FakeGenerator {
    pub fn new(responder: impl Fn(usize, &str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            responder: Box::new(responder),
        }
    }

    /// Research-notes generator.
    pub fn notes() -> Self {
        Self::new(|_, _| Ok("# Research notes\n\nCaches trade memory for latency.".to_string()))
    }

    /// Knowledge-base and lesson author with a fixed outline.
    pub fn author(outline: &[&str]) -> Self {
        let knowledge_base = knowledge_base_with(outline);
        Self::new(move |_, prompt| Ok(author_reply(&knowledge_base, prompt)))
    }

    /// Like `author`, but lesson call number `fail_on` fails.
    pub fn failing_author(outline: &[&str], fail_on: usize) -> Self {
        let knowledge_base = knowledge_base_with(outline);
        Self::new(move |call, prompt| {
            if call == fail_on {
                return Err(ScriptoriumError::Timeout(std::time::Duration::from_secs(1)));
            }
            Ok(author_reply(&knowledge_base, prompt))
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _temperature: f64,
        _max_output_tokens: Option<u32>,
    ) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        (self.responder)(call, user_prompt)
    }
}

pub fn knowledge_base_with(outline: &[&str]) -> String {
    let mut kb = String::from("## Concept Map\nEverything connects.\n\n## LESSON OUTLINE\n");
    for (i, title) in outline.iter().enumerate() {
        kb.push_str(&format!("{}. {title}\n", i + 1));
    }
    kb
}

fn author_reply(knowledge_base: &str, prompt: &str) -> String {
    match prompt
        .lines()
        .find_map(|line| line.strip_prefix("Lesson title: "))
    {
        Some(title) => format!("# {title}\n\nLesson body for {title}."),
        None => knowledge_base.to_string(),
    }
}

#[derive(Default)]
pub struct FakeVersionControl {
    pub fail_ensure: bool,
    pub ensured: AtomicUsize,
    pub commits: Mutex<Vec<String>>,
    pub pushes: Mutex<Vec<String>>,
}

#[async_trait]
impl VersionControl for FakeVersionControl {
    async fn ensure_repo(&self, _path: &Path) -> Result<()> {
        self.ensured.fetch_add(1, Ordering::SeqCst);
        if self.fail_ensure {
            return Err(ScriptoriumError::VersionControl {
                command: "init".to_string(),
                stderr: "git not installed".to_string(),
            });
        }
        Ok(())
    }

    async fn commit(&self, _path: &Path, message: &str) -> Result<bool> {
        self.commits.lock().unwrap().push(message.to_string());
        Ok(true)
    }

    async fn push(&self, _path: &Path, remote_url: &str) -> Result<()> {
        self.pushes.lock().unwrap().push(remote_url.to_string());
        Ok(())
    }
}
