//! Test utilities for etcha-lib.
//!
//! [`MockExecutor`] stands in for a shell: scripts are looked up by their
//! exact text and answered with canned responses, and every invocation is
//! recorded so tests can assert on ordering and the environment each script
//! saw.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::env::EnvVars;
use crate::exec::{ExecConfig, ExecError, ExecRequest, Executor};

#[derive(Debug, Clone)]
enum Response {
  Ok(String),
  Fail(String),
  Hang,
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct MockCall {
  pub script: String,
  pub env: EnvVars,
  pub exec: ExecConfig,
}

/// Scripted executor. Unknown scripts succeed with empty output.
///
/// Several responses for the same script are consumed in order; the last one
/// repeats.
#[derive(Debug, Default)]
pub struct MockExecutor {
  responses: Mutex<HashMap<String, VecDeque<Response>>>,
  calls: Mutex<Vec<MockCall>>,
}

impl MockExecutor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn ok(self, script: &str, output: &str) -> Self {
    self.respond(script, Response::Ok(output.to_string()))
  }

  pub fn fail(self, script: &str, output: &str) -> Self {
    self.respond(script, Response::Fail(output.to_string()))
  }

  /// Never complete; only cancellation ends the call.
  pub fn hang(self, script: &str) -> Self {
    self.respond(script, Response::Hang)
  }

  fn respond(self, script: &str, response: Response) -> Self {
    self
      .responses
      .lock()
      .unwrap()
      .entry(script.to_string())
      .or_default()
      .push_back(response);
    self
  }

  pub fn calls(&self) -> Vec<MockCall> {
    self.calls.lock().unwrap().clone()
  }

  pub fn scripts(&self) -> Vec<String> {
    self.calls().into_iter().map(|c| c.script).collect()
  }

  fn next_response(&self, script: &str) -> Option<Response> {
    let mut responses = self.responses.lock().unwrap();
    let queue = responses.get_mut(script)?;
    if queue.len() > 1 {
      queue.pop_front()
    } else {
      queue.front().cloned()
    }
  }
}

impl Executor for MockExecutor {
  async fn run(&self, request: &ExecRequest<'_>) -> Result<String, ExecError> {
    self.calls.lock().unwrap().push(MockCall {
      script: request.script.to_string(),
      env: request.env.clone(),
      exec: request.exec.clone(),
    });

    match self.next_response(request.script) {
      None => Ok(String::new()),
      Some(Response::Ok(output)) => Ok(output),
      Some(Response::Fail(output)) => Err(ExecError::Failed { code: Some(1), output }),
      Some(Response::Hang) => std::future::pending().await,
    }
  }
}
