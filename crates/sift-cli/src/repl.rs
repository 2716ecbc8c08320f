//! Interactive question loop.

use parking_lot::Mutex;
use sift_core::{EvaluationResult, WorkflowResult};
use sift_runtime::{ProgressSink, WorkflowEngine};
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const PROMPT: &str = "❖ Query: ";
const NO_ANSWER: &str = "✗ Unable to find a satisfactory answer.";
const EMPTY_ANSWER: &str = "No suitable answer could be produced.";

fn attempt_line(evaluation: &EvaluationResult, attempt: u32) -> String {
    let reason = if evaluation.reason.trim().is_empty() {
        "Trying a different approach..."
    } else {
        evaluation.reason.as_str()
    };
    format!("✗ Attempt {}: {}", attempt, reason)
}

/// Progress sink for one-shot use on stdout.
pub fn print_attempt(evaluation: &EvaluationResult, attempt: u32) {
    println!("{}", attempt_line(evaluation, attempt));
}

/// The line shown for a finished workflow.
pub fn render_result(result: &WorkflowResult) -> String {
    if result.evaluation.satisfactory || !result.answers_history.is_empty() {
        let answer = if result.answer.trim().is_empty() {
            EMPTY_ANSWER
        } else {
            result.answer.as_str()
        };
        format!("⌾ {}", answer)
    } else {
        NO_ANSWER.to_string()
    }
}

/// Writes attempt lines to the REPL's output while a query runs.
struct AttemptPrinter<'a, W: Write + Send> {
    out: Mutex<&'a mut W>,
}

impl<W: Write + Send> ProgressSink for AttemptPrinter<'_, W> {
    fn on_unsatisfactory(&self, evaluation: &EvaluationResult, attempt: u32) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "{}", attempt_line(evaluation, attempt));
    }
}

/// Read queries until `quit`, `exit` or end of input.
pub async fn run<R, W>(
    engine: &WorkflowEngine,
    max_attempts: Option<u32>,
    input: R,
    output: &mut W,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send,
{
    writeln!(output, "Type 'quit' or 'exit' to leave the assistant.\n")?;
    let mut lines = input.lines();

    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(output, "\nGoodbye!")?;
            return Ok(());
        };

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("quit") || query.eq_ignore_ascii_case("exit") {
            writeln!(output, "Goodbye!")?;
            return Ok(());
        }

        let result = {
            let printer = AttemptPrinter {
                out: Mutex::new(&mut *output),
            };
            engine.answer(query, max_attempts, Some(&printer)).await
        };

        tracing::debug!(
            attempts = result.attempts,
            llm_calls = result.usage.llm_calls,
            total_tokens = result.usage.total_tokens,
            "Query finished"
        );
        writeln!(output, "{}\n", render_result(&result))?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sift_core::{LlmUsage, SearchResult};
    use sift_runtime::{
        ChatMessage, Completion, CompletionClient, CompletionError, SearchError, SearchFanout,
        SearchProvider, TokenUsage,
    };
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    struct Replies(Mutex<VecDeque<&'static str>>);

    #[async_trait]
    impl CompletionClient for Replies {
        async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<Completion, CompletionError> {
            let content = self
                .0
                .lock()
                .pop_front()
                .ok_or_else(|| CompletionError::HttpError("no more replies".into()))?;
            Ok(Completion {
                content: content.to_string(),
                usage: TokenUsage::default(),
                model: "test".into(),
            })
        }

        fn name(&self) -> &str {
            "test"
        }
    }

    struct OneHit;

    #[async_trait]
    impl SearchProvider for OneHit {
        async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
            Ok(vec![SearchResult::new(query, "https://example.com").with_content("Paris")])
        }

        fn name(&self) -> &str {
            "one-hit"
        }
    }

    fn engine(replies: &[&'static str]) -> WorkflowEngine {
        let client = Arc::new(Replies(Mutex::new(replies.iter().copied().collect())));
        let search = SearchFanout::new(Arc::new(OneHit), Duration::from_secs(5), 2048);
        WorkflowEngine::new(client, search)
    }

    async fn session(engine: &WorkflowEngine, input: &str) -> String {
        let mut output = Vec::new();
        run(engine, Some(2), input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_quit_and_blank_lines() {
        let out = session(&engine(&[]), "\n   \nQUIT\nnever asked\n").await;

        assert!(out.starts_with("Type 'quit' or 'exit' to leave the assistant.\n"));
        assert!(out.ends_with("Goodbye!\n"));
        assert_eq!(out.matches(PROMPT).count(), 3);
    }

    #[tokio::test]
    async fn test_end_of_input_says_goodbye() {
        let out = session(&engine(&[]), "").await;
        assert!(out.ends_with("\nGoodbye!\n"));
    }

    #[tokio::test]
    async fn test_answer_and_attempt_lines() {
        let engine = engine(&[
            r#"["a", "b"]"#,
            "Maybe Lyon.",
            r#"{"satisfactory": false, "reason": ""}"#,
            r#"["c", "d"]"#,
            "Paris.",
            r#"{"satisfactory": true, "reason": "ok"}"#,
        ]);
        let out = session(&engine, "capital of France\nexit\n").await;

        assert!(out.contains("✗ Attempt 1: Trying a different approach...\n"));
        assert!(out.contains("⌾ Paris.\n"));
        assert!(!out.contains("Attempt 2"));
    }

    #[tokio::test]
    async fn test_failed_query_reports_no_answer() {
        let engine = engine(&[r#"["a", "b"]"#, ""]);
        let out = session(&engine, "anything\n").await;

        assert!(out.contains(NO_ANSWER));
    }

    fn result(satisfactory: bool, answer: &str, history: &[&str]) -> WorkflowResult {
        WorkflowResult {
            answer: answer.to_string(),
            evaluation: EvaluationResult {
                satisfactory,
                reason: String::new(),
            },
            attempts: 1,
            answers_history: history.iter().map(|s| s.to_string()).collect(),
            records: Vec::new(),
            usage: LlmUsage::default(),
        }
    }

    #[test]
    fn test_render_result() {
        assert_eq!(render_result(&result(true, "Paris", &["Paris"])), "⌾ Paris");
        assert_eq!(render_result(&result(false, "Lyon", &["Lyon"])), "⌾ Lyon");
        assert_eq!(render_result(&result(true, "", &[])), format!("⌾ {}", EMPTY_ANSWER));
        assert_eq!(render_result(&result(false, "", &[])), NO_ANSWER);
    }
}
