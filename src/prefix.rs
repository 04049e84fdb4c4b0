//! Commit prefix suggestions computed by a user supplied script.
//!
//! Scripts are JavaScript evaluated by an embedded interpreter with no host
//! objects installed: the only names visible to a script besides the
//! language built-ins are the bindings passed in explicitly. Every run has
//! a loop and recursion budget and a wall-clock limit.
//!
//! The wall-clock limit bounds how long the caller waits, not how long the
//! script runs: a timed-out script is abandoned on its worker thread and
//! keeps going until it finishes or hits the loop budget. Work that does not
//! loop in script code (a backtracking regex, a huge `repeat`) is not
//! bounded by anything but process exit.

use crate::errors::{GitBoardError, Result};
use boa_engine::{property::Attribute, Context, JsError, JsString, Source};
use std::{
    sync::mpsc::{self, RecvTimeoutError},
    time::Duration,
};

pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_millis(1000);

const LOOP_ITERATION_LIMIT: u64 = 10_000_000;
const RECURSION_LIMIT: usize = 512;

/// Evaluates a script against an allow-list of string bindings.
pub trait ScriptEvaluator {
    /// Value of the script converted to text, `None` when it produced nothing.
    fn evaluate(
        &self,
        script: &str,
        bindings: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Option<String>>;
}

/// JavaScript sandbox backed by boa, one fresh context per evaluation.
///
/// Scripts that time out are left running on a detached thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsSandbox;

impl JsSandbox {
    pub fn new() -> Self {
        Self
    }
}

fn sandbox_error(error: JsError) -> GitBoardError {
    GitBoardError::Sandbox(error.to_string())
}

fn run_script(script: &str, bindings: &[(String, String)]) -> Result<Option<String>> {
    let mut context = Context::default();
    context
        .runtime_limits_mut()
        .set_loop_iteration_limit(LOOP_ITERATION_LIMIT);
    context.runtime_limits_mut().set_recursion_limit(RECURSION_LIMIT);

    for (name, value) in bindings {
        context
            .register_global_property(
                JsString::from(name.as_str()),
                JsString::from(value.as_str()),
                Attribute::READONLY,
            )
            .map_err(sandbox_error)?;
    }

    // Run as a function body first so `return` works, then as a plain
    // program whose completion value is the result.
    let wrapped = format!("(function () {{\n{}\n}})()", script);
    let mut value = context
        .eval(Source::from_bytes(&wrapped))
        .map_err(sandbox_error)?;

    if value.is_undefined() {
        value = match context.eval(Source::from_bytes(script)) {
            Ok(value) => value,
            Err(e) => {
                log::debug!("Script has no completion value: {}", e);
                return Ok(None);
            }
        };
    }

    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }

    let text = value.to_string(&mut context).map_err(sandbox_error)?;
    Ok(Some(text.to_std_string_escaped()))
}

impl ScriptEvaluator for JsSandbox {
    fn evaluate(
        &self,
        script: &str,
        bindings: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Option<String>> {
        let script = script.to_string();
        let bindings: Vec<(String, String)> = bindings
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        let (sender, receiver) = mpsc::sync_channel(1);
        std::thread::Builder::new()
            .name("git-board-script".to_string())
            .spawn(move || {
                let _ = sender.send(run_script(&script, &bindings));
            })
            .map_err(|e| GitBoardError::Sandbox(format!("failed to spawn script worker: {}", e)))?;

        match receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(GitBoardError::Sandbox(format!(
                "script timed out after {} ms",
                timeout.as_millis()
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(GitBoardError::Sandbox(
                "script worker terminated before returning a result".to_string(),
            )),
        }
    }
}

/// Suggests a commit prefix for a branch; never fails.
pub struct CommitPrefixEvaluator<E: ScriptEvaluator> {
    evaluator: E,
    script: Option<String>,
    timeout: Duration,
}

impl<E: ScriptEvaluator> CommitPrefixEvaluator<E> {
    pub fn new(evaluator: E, script: Option<String>, timeout: Duration) -> Self {
        Self {
            evaluator,
            script,
            timeout,
        }
    }

    pub fn prefix_for(&self, branch_name: &str) -> String {
        let script = match self.script.as_deref() {
            Some(script) if !script.trim().is_empty() => script,
            _ => return String::new(),
        };

        log::info!("Executing commit prefix script for {}", branch_name);
        match self
            .evaluator
            .evaluate(script, &[("branchName", branch_name)], self.timeout)
        {
            Ok(Some(prefix)) => prefix.trim().to_string(),
            Ok(None) => String::new(),
            Err(e) => {
                log::warn!("⚠️  No commit prefix suggested: {}", e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn prefix(script: &str, branch_name: &str) -> String {
        CommitPrefixEvaluator::new(
            JsSandbox::new(),
            Some(script.to_string()),
            DEFAULT_SCRIPT_TIMEOUT,
        )
        .prefix_for(branch_name)
    }

    #[test]
    fn test_script_with_return_statement() {
        assert_eq!(prefix("return branchName.split('/')[0]", "feature/7-x"), "feature");
    }

    #[test]
    fn test_script_as_plain_expression() {
        assert_eq!(prefix("branchName.toUpperCase()", "feature/7-x"), "FEATURE/7-X");
    }

    #[test]
    fn test_multi_line_script() {
        let script = "const [kind, rest] = branchName.split('/');\nconst issue = rest.split('-')[0];\nreturn `${kind}(#${issue}):`;";
        assert_eq!(prefix(script, "bugfix/12-crash-on-start"), "bugfix(#12):");
    }

    #[test]
    fn test_infinite_loop_yields_empty_prefix_within_timeout() {
        let started = Instant::now();
        assert_eq!(prefix("while(true){}", "feature/7-x"), "");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_evaluate_returns_at_deadline_without_waiting_for_worker() {
        let started = Instant::now();
        let result = JsSandbox::new().evaluate(
            "while(true){}",
            &[("branchName", "feature/7-x")],
            Duration::from_millis(50),
        );

        assert!(matches!(result, Err(GitBoardError::Sandbox(_))));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_throwing_script_yields_empty_prefix() {
        assert_eq!(prefix("throw new Error('nope')", "feature/7-x"), "");
        assert_eq!(prefix("this is not javascript", "feature/7-x"), "");
    }

    #[test]
    fn test_missing_or_empty_script_yields_empty_prefix() {
        assert_eq!(prefix("", "feature/7-x"), "");
        assert_eq!(prefix("   \n", "feature/7-x"), "");
        assert_eq!(prefix("return undefined", "feature/7-x"), "");

        let evaluator = CommitPrefixEvaluator::new(JsSandbox::new(), None, DEFAULT_SCRIPT_TIMEOUT);
        assert_eq!(evaluator.prefix_for("feature/7-x"), "");
    }

    #[test]
    fn test_non_string_results_are_converted() {
        assert_eq!(prefix("return branchName.length", "feature/7-x"), "11");
    }

    #[test]
    fn test_no_host_capabilities_are_exposed() {
        let script = "return [typeof require, typeof process, typeof fetch, typeof console].join(',')";
        assert_eq!(
            prefix(script, "feature/7-x"),
            "undefined,undefined,undefined,undefined"
        );
    }

    #[test]
    fn test_only_bound_variables_are_visible() {
        let sandbox = JsSandbox::new();
        let value = sandbox
            .evaluate(
                "return typeof branchName + ':' + typeof issueNumber",
                &[("branchName", "feature/1-a")],
                DEFAULT_SCRIPT_TIMEOUT,
            )
            .unwrap();
        assert_eq!(value, Some("string:undefined".to_string()));
    }
}
