// Copyright 2025 Cowboy AI, LLC.

//! Lazy merge of per-graph element cursors

use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Sleep;
use tracing::{debug, warn};

use crate::element::Element;
use crate::graph::ElementCursor;

/// A single graph's failure, reported in place of its remaining elements
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Graph {graph_id} failed: {message}")]
pub struct GraphFailure {
    /// Failing graph
    pub graph_id: String,
    /// What went wrong
    pub message: String,
}

impl GraphFailure {
    /// Failure with a message
    pub fn new(graph_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            graph_id: graph_id.into(),
            message: message.into(),
        }
    }

    /// Failure for a graph that did not answer in time
    pub fn timed_out(graph_id: impl Into<String>, after: Duration) -> Self {
        Self::new(graph_id, format!("timed out after {}ms", after.as_millis()))
    }
}

struct ActiveCursor {
    graph_id: String,
    cursor: ElementCursor,
    deadline: Option<Pin<Box<Sleep>>>,
}

enum Source {
    Cursor(ActiveCursor),
    Failed(GraphFailure),
}

/// Elements from every selected graph as one lazy stream.
///
/// Graphs are drained one after another in selection order. A graph that
/// fails, or does not yield within the pull timeout, produces a single
/// `Err(GraphFailure)` and is dropped; the remaining graphs carry on.
/// Closing or dropping the stream drops every underlying cursor.
pub struct ElementStream {
    sources: VecDeque<Source>,
    pull_timeout: Duration,
}

impl ElementStream {
    /// Stream yielding nothing
    pub fn empty() -> Self {
        Self {
            sources: VecDeque::new(),
            pull_timeout: Duration::MAX,
        }
    }

    pub(crate) fn new(pull_timeout: Duration) -> Self {
        Self {
            sources: VecDeque::new(),
            pull_timeout,
        }
    }

    pub(crate) fn push_cursor(&mut self, graph_id: impl Into<String>, cursor: ElementCursor) {
        self.sources.push_back(Source::Cursor(ActiveCursor {
            graph_id: graph_id.into(),
            cursor,
            deadline: None,
        }));
    }

    pub(crate) fn push_failure(&mut self, failure: GraphFailure) {
        self.sources.push_back(Source::Failed(failure));
    }

    /// Graphs with elements or failures still to report
    pub fn pending_graphs(&self) -> usize {
        self.sources.len()
    }

    /// Drop every remaining cursor. The stream ends afterwards.
    pub fn close(&mut self) {
        let open = self.sources.len();
        self.sources.clear();
        if open > 0 {
            debug!(open, "closed merged element stream early");
        }
    }

    /// Drain the stream, separating elements from graph failures
    pub async fn partition(mut self) -> (Vec<Element>, Vec<GraphFailure>) {
        let mut elements = Vec::new();
        let mut failures = Vec::new();
        while let Some(item) = self.next().await {
            match item {
                Ok(element) => elements.push(element),
                Err(failure) => failures.push(failure),
            }
        }
        (elements, failures)
    }
}

impl std::fmt::Debug for ElementStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementStream")
            .field("pending_graphs", &self.sources.len())
            .field("pull_timeout", &self.pull_timeout)
            .finish()
    }
}

impl Stream for ElementStream {
    type Item = Result<Element, GraphFailure>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            let Some(front) = this.sources.front_mut() else {
                return Poll::Ready(None);
            };
            let active = match front {
                Source::Failed(_) => {
                    if let Some(Source::Failed(failure)) = this.sources.pop_front() {
                        return Poll::Ready(Some(Err(failure)));
                    }
                    continue;
                }
                Source::Cursor(active) => active,
            };

            match active.cursor.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(element))) => {
                    active.deadline = None;
                    return Poll::Ready(Some(Ok(element)));
                }
                Poll::Ready(Some(Err(err))) => {
                    let failure = GraphFailure::new(active.graph_id.clone(), err.to_string());
                    warn!(graph_id = %failure.graph_id, error = %err, "graph failed mid-stream");
                    this.sources.pop_front();
                    return Poll::Ready(Some(Err(failure)));
                }
                Poll::Ready(None) => {
                    debug!(graph_id = %active.graph_id, "graph stream exhausted");
                    this.sources.pop_front();
                }
                Poll::Pending => {
                    let pull_timeout = this.pull_timeout;
                    let deadline = active
                        .deadline
                        .get_or_insert_with(|| Box::pin(tokio::time::sleep(pull_timeout)));
                    if deadline.as_mut().poll(cx).is_pending() {
                        return Poll::Pending;
                    }
                    let failure = GraphFailure::timed_out(active.graph_id.clone(), pull_timeout);
                    warn!(graph_id = %failure.graph_id, "graph stream timed out");
                    this.sources.pop_front();
                    return Poll::Ready(Some(Err(failure)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphError;
    use futures::stream;

    fn cursor(items: Vec<Result<Element, GraphError>>) -> ElementCursor {
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_concatenates_in_order_and_isolates_failures() {
        let mut merged = ElementStream::new(Duration::from_secs(1));
        merged.push_cursor("g1", cursor(vec![Ok(Element::entity("a", 1)), Ok(Element::entity("a", 2))]));
        merged.push_failure(GraphFailure::new("g2", "unreachable"));
        merged.push_cursor(
            "g3",
            cursor(vec![
                Ok(Element::entity("b", 3)),
                Err(GraphError::Execution("disk".into())),
                Ok(Element::entity("b", 4)),
            ]),
        );
        merged.push_cursor("g4", cursor(vec![Ok(Element::entity("c", 5))]));

        let items: Vec<_> = merged.collect().await;
        let rendered: Vec<String> = items
            .iter()
            .map(|item| match item {
                Ok(element) => format!("ok:{}", element.group()),
                Err(failure) => format!("err:{}", failure.graph_id),
            })
            .collect();
        assert_eq!(rendered, vec!["ok:a", "ok:a", "err:g2", "ok:b", "err:g3", "ok:c"]);
    }

    #[tokio::test]
    async fn test_stalled_graph_times_out() {
        let mut merged = ElementStream::new(Duration::from_millis(20));
        merged.push_cursor("stalled", Box::pin(stream::pending::<Result<Element, GraphError>>()));
        merged.push_cursor("live", cursor(vec![Ok(Element::entity("a", 1))]));

        let (elements, failures) = merged.partition().await;
        assert_eq!(elements.len(), 1);
        assert_eq!(failures, vec![GraphFailure::timed_out("stalled", Duration::from_millis(20))]);
    }

    #[tokio::test]
    async fn test_close_ends_the_stream() {
        let mut merged = ElementStream::new(Duration::from_secs(1));
        merged.push_cursor("g1", cursor(vec![Ok(Element::entity("a", 1))]));
        merged.push_cursor("g2", cursor(vec![Ok(Element::entity("a", 2))]));
        assert_eq!(merged.pending_graphs(), 2);

        assert!(merged.next().await.is_some());
        merged.close();
        assert_eq!(merged.pending_graphs(), 0);
        assert!(merged.next().await.is_none());
        assert!(ElementStream::empty().next().await.is_none());
    }
}
