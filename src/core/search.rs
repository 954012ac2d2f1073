//! Debounced search-as-you-type against the prompt and style libraries
//!
//! Each keystroke aborts the pending probe and schedules a fresh one after
//! the debounce window. Outcomes carry the sequence number of the query
//! that produced them; the consumer must drop any outcome that is no longer
//! current, so only the latest query's result is ever applied.

use crate::data::{PromptStyle, SavedPrompt};
use crate::store::{PromptLookup, StyleLookup};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchKind {
    Prompt,
    Style,
}

#[derive(Debug)]
pub enum SearchOutcome {
    Prompts { seq: u64, results: Vec<SavedPrompt> },
    Styles { seq: u64, results: Vec<PromptStyle> },
    /// Store failure; surfaced once, never retried here
    Failed { seq: u64, error: String },
}

impl SearchOutcome {
    pub fn seq(&self) -> u64 {
        match self {
            SearchOutcome::Prompts { seq, .. } => *seq,
            SearchOutcome::Styles { seq, .. } => *seq,
            SearchOutcome::Failed { seq, .. } => *seq,
        }
    }
}

pub struct LibrarySearch {
    prompts: Arc<dyn PromptLookup>,
    styles: Arc<dyn StyleLookup>,
    debounce: Duration,
    /// How many most-used prompts the empty query falls back to
    top_n: usize,
    seq: u64,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<SearchOutcome>,
}

impl LibrarySearch {
    pub fn new(
        prompts: Arc<dyn PromptLookup>,
        styles: Arc<dyn StyleLookup>,
        debounce_ms: u64,
        top_n: usize,
    ) -> (Self, mpsc::UnboundedReceiver<SearchOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                prompts,
                styles,
                debounce: Duration::from_millis(debounce_ms),
                top_n,
                seq: 0,
                pending: None,
                tx,
            },
            rx,
        )
    }

    /// Feed one keystroke's worth of query text.
    ///
    /// The previous pending probe is aborted; the new one fires after the
    /// debounce window of inactivity.
    pub fn input(&mut self, kind: SearchKind, text: &str) {
        self.seq += 1;
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        let seq = self.seq;
        let text = text.to_string();
        let prompts = Arc::clone(&self.prompts);
        let styles = Arc::clone(&self.styles);
        let tx = self.tx.clone();
        let debounce = self.debounce;
        let top_n = self.top_n;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            debug!("Search probe firing: {:?} {:?}", kind, text);
            let outcome = match kind {
                SearchKind::Prompt => {
                    let result = if text.is_empty() {
                        prompts.top_n(top_n).await
                    } else {
                        prompts.search_by_text(&text).await
                    };
                    match result {
                        Ok(results) => SearchOutcome::Prompts { seq, results },
                        Err(e) => SearchOutcome::Failed {
                            seq,
                            error: e.to_string(),
                        },
                    }
                }
                SearchKind::Style => {
                    if text.is_empty() {
                        SearchOutcome::Styles {
                            seq,
                            results: Vec::new(),
                        }
                    } else {
                        match styles.search_by_name(&text).await {
                            Ok(results) => SearchOutcome::Styles { seq, results },
                            Err(e) => SearchOutcome::Failed {
                                seq,
                                error: e.to_string(),
                            },
                        }
                    }
                }
            };
            let _ = tx.send(outcome);
        }));
    }

    /// Whether an outcome belongs to the latest query. Anything stale must
    /// be discarded, not applied.
    pub fn is_current(&self, outcome: &SearchOutcome) -> bool {
        outcome.seq() == self.seq
    }
}
