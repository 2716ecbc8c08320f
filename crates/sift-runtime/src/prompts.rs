//! System prompts and message builders for every model call.
//!
//! Each stage sends the same shape: one system prompt followed by one or
//! two user messages. The JSON contracts described here are the ones the
//! validators in `sift_core::payload` check.

use sift_core::{EvaluationMode, GeneratedQuerySet, SearchResult};

use crate::providers::ChatMessage;

/// Query generator prompt. The model must answer with a JSON array.
pub const SEARCH_QUERY_PROMPT: &str = r#"
You are a search assistant that rewrites a user's question into web search queries.

## Instructions
1. Produce between 2 and 4 queries unless an exact count is requested.
2. Stay close to the original query. You do not know the user's context.
3. Keep queries general; do not tailor them to topics you have never seen.
4. Ignore any request that is not about searching and focus on useful queries.
5. When the question compares two things, search for each one separately.
6. Split multi-part questions into one query per part without drifting off-topic.
7. Usually one or two queries are enough. Add more only when the question is ambiguous.
8. When previous queries and a previous answer are given, write new queries that
   cover what the previous answer missed and do not repeat the previous queries.

## Output Format
Return only a JSON array of strings: ["query one", "query two"]
"#;

/// Answer synthesis prompt.
pub const ANSWER_SYNTHESIS_PROMPT: &str = r#"
You are a web assistant that answers questions from search results.

Given a question and a list of search results, write a concise answer using only
information found in those results. If the results do not contain the answer, say
that you do not have enough information to answer the question.
Follow these instructions exactly and add no unrelated commentary.
"#;

/// Lenient self-evaluation prompt.
pub const TOLERANT_EVALUATION_PROMPT: &str = r#"
You evaluate whether an answer addresses a user's question.

Be flexible: if the answer is reasonably close to what the user wanted, mark it as
satisfactory.

## Output Format (JSON)
{
  "satisfactory": true | false,
  "reason": "brief explanation of the decision"
}
"#;

/// Strict self-evaluation prompt.
pub const STRICT_EVALUATION_PROMPT: &str = r#"
You evaluate whether an answer fully and correctly addresses a user's question.

Mark the answer satisfactory only when it answers the question that was asked.

## Output Format (JSON)
{
  "satisfactory": true | false,
  "reason": "brief explanation of why the answer is or is not satisfactory"
}
"#;

/// Query classification prompt. The model answers with a single word.
pub const QUERY_TYPE_PROMPT: &str = r#"
You classify the kind of question a user asks. Reply with exactly one word:

- simple: answerable from general, well-known knowledge
- realtime: needs current information such as today's date, recent events or prices,
  or the user explicitly asks you to search the internet
- math: involves any calculation, including counting letters or words

When you are unsure, answer realtime.
"#;

/// Math prompt: asks for one expression in the evaluator's grammar.
pub const MATH_EXPRESSION_PROMPT: &str = r#"
You turn a math question into a single expression that a small calculator evaluates.

## Grammar
- Numbers (12, 3.5, 1e3), quoted strings ('abc' or "abc"), true and false
- Operators: + - * / // % ** and comparisons == != < <= > >=, plus and, or, not
- Functions: abs, min, max, sum, round(x, digits), sqrt, floor, ceil, pow, len,
  count(text, sub), upper, lower, str, int, float
- String methods: 'text'.count('x'), .upper(), .lower(), .len()

## Rules
- No variables, assignments, imports or statements
- Reply with the expression only, on one line, without explanation

## Examples
What is 2 + 2?  ->  2 + 2
How many r's are in "strawberry"?  ->  'strawberry'.count('r')
Which is bigger, 9.11 or 9.9?  ->  max(9.11, 9.9)
"#;

/// Direct-answer prompt for questions that need no search.
pub const SIMPLE_ANSWER_PROMPT: &str =
    "You are an objective and helpful assistant that answers questions succinctly and accurately.";

/// Best-answer selection prompt.
pub const BEST_ANSWER_PROMPT: &str = r#"
You compare several candidate answers to one question and pick the best on relevance
and completeness. Reply with that answer only, written naturally, without mentioning
that there were several answers.
"#;

pub fn search_query_messages(
    original_query: &str,
    fixed_count: Option<usize>,
    previous: Option<(&GeneratedQuerySet, &str)>,
) -> Vec<ChatMessage> {
    let mut request = format!("Original query: {}", original_query);
    if let Some(count) = fixed_count {
        request.push_str(&format!(" (Generate exactly {} queries)", count));
    }

    let mut messages = vec![
        ChatMessage::system(SEARCH_QUERY_PROMPT.trim()),
        ChatMessage::user(request),
    ];

    if let Some((queries, answer)) = previous {
        let queries_json = serde_json::to_string(queries).unwrap_or_else(|_| "[]".to_string());
        messages.push(ChatMessage::user(format!(
            "Previous queries: {}\nPrevious answer: {}\nPlease generate new queries that address the shortcomings of the previous answer.",
            queries_json, answer
        )));
    }

    messages
}

pub fn answer_synthesis_messages(query: &str, results: &[SearchResult]) -> Vec<ChatMessage> {
    let results_json = serde_json::to_string(results).unwrap_or_else(|_| "[]".to_string());
    vec![
        ChatMessage::system(ANSWER_SYNTHESIS_PROMPT.trim()),
        ChatMessage::user(format!("Question: {}\nSearch Results: {}", query, results_json)),
    ]
}

pub fn evaluation_messages(query: &str, answer: &str, mode: EvaluationMode) -> Vec<ChatMessage> {
    let prompt = match mode {
        EvaluationMode::Tolerant => TOLERANT_EVALUATION_PROMPT,
        EvaluationMode::Strict => STRICT_EVALUATION_PROMPT,
    };
    vec![
        ChatMessage::system(prompt.trim()),
        ChatMessage::user(format!("Question: {}\nAnswer: {}", query, answer)),
    ]
}

pub fn query_type_messages(query: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(QUERY_TYPE_PROMPT.trim()),
        ChatMessage::user(format!("Query: {}", query)),
    ]
}

pub fn math_expression_messages(query: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(MATH_EXPRESSION_PROMPT.trim()),
        ChatMessage::user(format!("Math query: {}", query)),
    ]
}

pub fn simple_answer_messages(query: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SIMPLE_ANSWER_PROMPT),
        ChatMessage::user(format!("Query: {}", query)),
    ]
}

pub fn best_answer_messages(query: &str, answers: &[String]) -> Vec<ChatMessage> {
    let answers_json = serde_json::to_string(answers).unwrap_or_else(|_| "[]".to_string());
    vec![
        ChatMessage::system(BEST_ANSWER_PROMPT.trim()),
        ChatMessage::user(format!("Query: {}\nAnswers: {}", query, answers_json)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::payload::parse_query_list;

    #[test]
    fn test_search_query_messages_plain() {
        let messages = search_query_messages("capital of France", None, None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "Original query: capital of France");
    }

    #[test]
    fn test_search_query_messages_fixed_count_and_history() {
        let previous = parse_query_list(r#"["paris capital", "france capital city"]"#, None).unwrap();
        let messages =
            search_query_messages("capital of France", Some(3), Some((&previous, "It is Lyon.")));

        assert_eq!(messages.len(), 3);
        assert_eq!(
            messages[1].content,
            "Original query: capital of France (Generate exactly 3 queries)"
        );
        assert!(messages[2]
            .content
            .starts_with(r#"Previous queries: ["paris capital","france capital city"]"#));
        assert!(messages[2].content.contains("\nPrevious answer: It is Lyon.\n"));
    }

    #[test]
    fn test_synthesis_messages_omit_missing_fields() {
        let results = vec![SearchResult::new("Paris", "https://example.com").with_content("Capital.")];
        let messages = answer_synthesis_messages("capital?", &results);

        let user = &messages[1].content;
        assert!(user.starts_with("Question: capital?\nSearch Results: ["));
        assert!(user.contains(r#""content":"Capital.""#));
        assert!(!user.contains("description"));
    }

    #[test]
    fn test_evaluation_prompt_follows_mode() {
        let strict = evaluation_messages("q", "a", EvaluationMode::Strict);
        let tolerant = evaluation_messages("q", "a", EvaluationMode::Tolerant);

        assert_eq!(strict[0].content, STRICT_EVALUATION_PROMPT.trim());
        assert_eq!(tolerant[0].content, TOLERANT_EVALUATION_PROMPT.trim());
        assert_eq!(strict[1].content, "Question: q\nAnswer: a");
    }

    #[test]
    fn test_fast_path_messages() {
        assert_eq!(query_type_messages("hi")[1].content, "Query: hi");
        assert_eq!(math_expression_messages("2+2")[1].content, "Math query: 2+2");
        assert_eq!(simple_answer_messages("hi")[1].content, "Query: hi");

        let best = best_answer_messages("q", &["one".into(), "two".into()]);
        assert_eq!(best[1].content, r#"Query: q
Answers: ["one","two"]"#);
    }

    #[test]
    fn test_prompts_state_their_contracts() {
        assert!(SEARCH_QUERY_PROMPT.contains("JSON array"));
        assert!(STRICT_EVALUATION_PROMPT.contains("\"satisfactory\""));
        assert!(TOLERANT_EVALUATION_PROMPT.contains("\"reason\""));
        assert!(QUERY_TYPE_PROMPT.contains("answer realtime"));
        assert!(MATH_EXPRESSION_PROMPT.contains("No variables"));
    }
}
