//! Test utilities: a scripted in-memory page.
//!
//! `MockSession` is a tiny fake DOM. Nodes carry text, attributes and a
//! vertical offset; queries are answered from a table keyed by
//! `(scope, expression)`. All state sits behind `Arc<Mutex<_>>` so tests can
//! assert on recorded calls after the pipeline has run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::Locator;
use crate::traits::{PageSession, Scope};

/// Handle to a node of the fake DOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockNode(pub usize);

#[derive(Default)]
struct NodeData {
    text: String,
    attrs: HashMap<String, String>,
    y: f64,
    text_fault: bool,
    offset_fault: bool,
}

enum Answer {
    Matches(Vec<usize>),
    /// Empty for the first `misses` queries, then `Matches`.
    Delayed { misses: usize, ids: Vec<usize> },
    Fault,
}

enum Extents {
    Script(Vec<f64>),
    /// Grows by 100 on every measurement.
    Growing,
}

#[derive(Default)]
struct Dom {
    nodes: Vec<NodeData>,
    answers: HashMap<(Option<usize>, String), Answer>,
    extents: Option<Extents>,
    extent_calls: usize,
    title: Option<String>,
    reveals: usize,
    queries: Vec<String>,
    session_lost: bool,
}

#[derive(Clone, Default)]
pub struct MockSession {
    dom: Arc<Mutex<Dom>>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with the given text at vertical offset `y`.
    pub fn node(&self, text: &str, y: f64) -> usize {
        let mut dom = self.dom.lock().unwrap();
        dom.nodes.push(NodeData {
            text: text.to_string(),
            y,
            ..Default::default()
        });
        dom.nodes.len() - 1
    }

    pub fn set_attr(&self, id: usize, name: &str, value: &str) {
        let mut dom = self.dom.lock().unwrap();
        dom.nodes[id].attrs.insert(name.to_string(), value.to_string());
    }

    /// Reading this node's text fails with a query fault.
    pub fn fault_text(&self, id: usize) {
        self.dom.lock().unwrap().nodes[id].text_fault = true;
    }

    /// Reading this node's offset fails with a query fault.
    pub fn fault_offset(&self, id: usize) {
        self.dom.lock().unwrap().nodes[id].offset_fault = true;
    }

    /// Document-level `expr` resolves to `ids`.
    pub fn on(&self, expr: &str, ids: &[usize]) {
        self.answer(None, expr, Answer::Matches(ids.to_vec()));
    }

    /// `expr` evaluated inside node `scope` resolves to `ids`.
    pub fn on_within(&self, scope: usize, expr: &str, ids: &[usize]) {
        self.answer(Some(scope), expr, Answer::Matches(ids.to_vec()));
    }

    /// Document-level `expr` matches nothing for the first `misses` polls.
    pub fn on_after(&self, expr: &str, misses: usize, ids: &[usize]) {
        self.answer(
            None,
            expr,
            Answer::Delayed {
                misses,
                ids: ids.to_vec(),
            },
        );
    }

    pub fn fault_on(&self, expr: &str) {
        self.answer(None, expr, Answer::Fault);
    }

    pub fn fault_within(&self, scope: usize, expr: &str) {
        self.answer(Some(scope), expr, Answer::Fault);
    }

    /// Successive `content_extent` readings; the last value repeats.
    pub fn with_extents(&self, extents: &[f64]) {
        self.dom.lock().unwrap().extents = Some(Extents::Script(extents.to_vec()));
    }

    /// Every `content_extent` reading is larger than the previous one.
    pub fn with_growing_extent(&self) {
        self.dom.lock().unwrap().extents = Some(Extents::Growing);
    }

    pub fn with_title(&self, title: &str) {
        self.dom.lock().unwrap().title = Some(title.to_string());
    }

    /// Every call from now on fails as if the browser went away.
    pub fn lose_session(&self) {
        self.dom.lock().unwrap().session_lost = true;
    }

    pub fn reveals(&self) -> usize {
        self.dom.lock().unwrap().reveals
    }

    pub fn extent_calls(&self) -> usize {
        self.dom.lock().unwrap().extent_calls
    }

    /// Number of queries issued for `expr`, any scope.
    pub fn query_count(&self, expr: &str) -> usize {
        self.dom
            .lock()
            .unwrap()
            .queries
            .iter()
            .filter(|q| q.as_str() == expr)
            .count()
    }

    fn answer(&self, scope: Option<usize>, expr: &str, answer: Answer) {
        self.dom
            .lock()
            .unwrap()
            .answers
            .insert((scope, expr.to_string()), answer);
    }

    fn check_session(dom: &Dom) -> Result<(), AppError> {
        if dom.session_lost {
            return Err(AppError::SessionUnavailable("mock browser closed".into()));
        }
        Ok(())
    }
}

impl PageSession for MockSession {
    type Element = MockNode;

    async fn query(
        &self,
        scope: Scope<'_, MockNode>,
        locator: &Locator,
    ) -> Result<Vec<MockNode>, AppError> {
        let mut dom = self.dom.lock().unwrap();
        Self::check_session(&dom)?;
        dom.queries.push(locator.expr.clone());

        let key = match scope {
            Scope::Document => (None, locator.expr.clone()),
            Scope::Within(node) => (Some(node.0), locator.expr.clone()),
        };
        let ids = match dom.answers.get_mut(&key) {
            None => Vec::new(),
            Some(Answer::Matches(ids)) => ids.clone(),
            Some(Answer::Delayed { misses, ids }) => {
                if *misses > 0 {
                    *misses -= 1;
                    Vec::new()
                } else {
                    ids.clone()
                }
            }
            Some(Answer::Fault) => {
                return Err(AppError::QueryFailed(format!(
                    "mock fault for {}",
                    locator.expr
                )));
            }
        };
        Ok(ids.into_iter().map(MockNode).collect())
    }

    async fn text(&self, element: &MockNode) -> Result<String, AppError> {
        let dom = self.dom.lock().unwrap();
        Self::check_session(&dom)?;
        let node = &dom.nodes[element.0];
        if node.text_fault {
            return Err(AppError::QueryFailed("stale node".into()));
        }
        Ok(node.text.clone())
    }

    async fn attribute(&self, element: &MockNode, name: &str) -> Result<Option<String>, AppError> {
        let dom = self.dom.lock().unwrap();
        Self::check_session(&dom)?;
        Ok(dom.nodes[element.0].attrs.get(name).cloned())
    }

    async fn vertical_offset(&self, element: &MockNode) -> Result<f64, AppError> {
        let dom = self.dom.lock().unwrap();
        Self::check_session(&dom)?;
        let node = &dom.nodes[element.0];
        if node.offset_fault {
            return Err(AppError::QueryFailed("detached node".into()));
        }
        Ok(node.y)
    }

    async fn content_extent(&self) -> Result<f64, AppError> {
        let mut dom = self.dom.lock().unwrap();
        Self::check_session(&dom)?;
        let call = dom.extent_calls;
        dom.extent_calls += 1;
        let extent = match &dom.extents {
            None => 1000.0,
            Some(Extents::Growing) => 100.0 * (call as f64 + 1.0),
            Some(Extents::Script(values)) => match values.get(call).or(values.last()) {
                Some(v) => *v,
                None => 0.0,
            },
        };
        Ok(extent)
    }

    async fn reveal_more(&self) -> Result<(), AppError> {
        let mut dom = self.dom.lock().unwrap();
        Self::check_session(&dom)?;
        dom.reveals += 1;
        Ok(())
    }

    async fn page_title(&self) -> Result<Option<String>, AppError> {
        let dom = self.dom.lock().unwrap();
        Self::check_session(&dom)?;
        Ok(dom.title.clone())
    }
}
