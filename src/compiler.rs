//! Compiles resource lifecycles into state-gated stub rules.
//!
//! All rules of a scenario hang off a single linear chain of states. Each
//! requested step takes the chain's current state as its precondition and
//! moves it to a fresh one, so the rules fire strictly in registration
//! order even when many of them share a path.

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    interchange::{Method, SCENARIO_STARTED},
    lifecycle::{LifecycleError, LifecyclePlan, Phase, Progress, Step},
    stub::{StubResponse, StubRule, FALLBACK_PRIORITY},
};

/// A resource as seen by the compiler: where it lives and what it looks like.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub name: String,
    pub path: String,
    pub initial: Value,
    /// One snapshot per `Update` step, consumed in order.
    pub updates: Vec<Value>,
}

impl ResourceDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>, initial: Value) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            initial,
            updates: vec![],
        }
    }

    pub fn with_update(mut self, snapshot: Value) -> Self {
        self.updates.push(snapshot);
        self
    }

    /// Payload the resource carries after `updates_applied` updates.
    fn payload(&self, updates_applied: usize) -> &Value {
        match updates_applied {
            0 => &self.initial,
            n => &self.updates[n - 1],
        }
    }
}

/// The cursor of a scenario's state chain.
#[derive(Debug, Clone)]
pub struct StateChain {
    cursor: String,
    allocated: usize,
}

impl Default for StateChain {
    fn default() -> Self {
        Self {
            cursor: String::from(SCENARIO_STARTED),
            allocated: 0,
        }
    }
}

impl StateChain {
    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Moves the cursor to a fresh state and returns `(required, next)`.
    fn advance(&mut self, step: Step, resource: &str) -> (String, String) {
        self.allocated += 1;
        let next = format!("{:03}-{}-{}", self.allocated, step, resource);
        let required = std::mem::replace(&mut self.cursor, next.clone());
        (required, next)
    }
}

/// Turns `steps` into rules appended to `chain`, updating `progress`.
///
/// The plan and its snapshots are validated before the chain is touched;
/// on error neither `chain` nor `progress` change.
pub fn compile(
    chain: &mut StateChain,
    resource: &ResourceDescriptor,
    progress: &mut Progress,
    steps: &[Step],
) -> Result<Vec<StubRule>, LifecycleError> {
    let plan = LifecyclePlan::new(progress.phase, steps)?;
    let needed = progress.updates_applied + plan.updates();
    if needed > resource.updates.len() {
        return Err(LifecycleError::MissingUpdateSnapshot {
            needed,
            available: resource.updates.len(),
        });
    }

    let mut rules = Vec::with_capacity(plan.transitions.len());
    for transition in &plan.transitions {
        if transition.is_repeat_of_terminal() {
            continue;
        }
        if transition.step == Step::Update {
            progress.updates_applied += 1;
        }
        let payload = resource.payload(progress.updates_applied);
        let rule = match transition.step {
            Step::GetNotFound => {
                StubRule::new(Method::GET, &resource.path, StubResponse::not_found(&resource.path))
                    .with_priority(FALLBACK_PRIORITY)
            }
            step => {
                let (method, response) = step_response(step, payload, transition.to);
                let (required, next) = chain.advance(step, &resource.name);
                StubRule::new(method, &resource.path, response).with_transition(required, next)
            }
        };
        debug!(
            path = %rule.path,
            step = %transition.step,
            required = ?rule.required_state,
            next = ?rule.new_state,
            "compiled lifecycle rule"
        );
        rules.push(rule);
    }
    progress.phase = plan.end();
    Ok(rules)
}

fn step_response(step: Step, payload: &Value, phase: Phase) -> (Method, StubResponse) {
    match step {
        Step::Create => (Method::PUT, StubResponse::json(201, snapshot(payload, phase))),
        Step::Update => (Method::PUT, StubResponse::json(200, snapshot(payload, phase))),
        Step::Delete => (Method::DELETE, StubResponse::empty(202)),
        Step::GetNotFound => (Method::GET, StubResponse::empty(404)),
        Step::GetCreating | Step::GetActive | Step::GetUpdating => {
            (Method::GET, StubResponse::json(200, snapshot(payload, phase)))
        }
    }
}

/// Copy of `payload` whose `status.state` reports `phase`.
pub fn snapshot(payload: &Value, phase: Phase) -> Value {
    let mut body = match payload {
        Value::Object(fields) => fields.clone(),
        other => {
            let mut fields = Map::new();
            fields.insert(String::from("spec"), other.clone());
            fields
        }
    };
    let status = body
        .entry("status")
        .or_insert_with(|| Value::Object(Map::new()));
    if !status.is_object() {
        *status = Value::Object(Map::new());
    }
    if let Value::Object(status) = status {
        status.insert(String::from("state"), Value::String(phase.to_string()));
    }
    Value::Object(body)
}
