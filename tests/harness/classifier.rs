// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Scripted classifier oracle with fixed, replayable outputs.

use async_trait::async_trait;
use registrar_admission::classifier::{Classifier, ClassifierError};
use registrar_admission::window::ActivityEntry;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// How the classifier misbehaves, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    None,
    /// Every call returns a transport-style error
    Unavailable,
    /// Every call hangs for the given duration before answering
    Stall(Duration),
}

/// Classifier returning pre-programmed verdicts.
pub struct ScriptedClassifier {
    unsafe_domains: HashSet<String>,
    scores: Mutex<VecDeque<f64>>,
    default_score: f64,
    failure: Failure,
    /// Window snapshots seen by spam scoring, in call order
    seen: Mutex<Vec<(String, Vec<ActivityEntry>)>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self {
            unsafe_domains: HashSet::new(),
            scores: Mutex::new(VecDeque::new()),
            default_score: 0.0,
            failure: Failure::None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Flag `domain` as inappropriate content.
    pub fn with_unsafe(mut self, domain: &str) -> Self {
        self.unsafe_domains.insert(domain.to_string());
        self
    }

    /// Spam scores handed out in order; `default_score` after they run out.
    pub fn with_scores(self, scores: impl IntoIterator<Item = f64>) -> Self {
        self.scores.lock().unwrap().extend(scores);
        self
    }

    pub fn with_default_score(mut self, score: f64) -> Self {
        self.default_score = score;
        self
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failure = failure;
        self
    }

    pub fn seen(&self) -> Vec<(String, Vec<ActivityEntry>)> {
        self.seen.lock().unwrap().clone()
    }

    async fn misbehave(&self) -> Result<(), ClassifierError> {
        match self.failure {
            Failure::None => Ok(()),
            Failure::Unavailable => Err(ClassifierError::Status(503)),
            Failure::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn is_unsafe_content(&self, domain: &str) -> Result<bool, ClassifierError> {
        self.misbehave().await?;
        Ok(self.unsafe_domains.contains(domain))
    }

    async fn spam_score(
        &self,
        recent: &[ActivityEntry],
        domain: &str,
    ) -> Result<f64, ClassifierError> {
        self.misbehave().await?;
        self.seen
            .lock()
            .unwrap()
            .push((domain.to_string(), recent.to_vec()));
        let next = self.scores.lock().unwrap().pop_front();
        Ok(next.unwrap_or(self.default_score))
    }
}
