//! Prompt construction and model-output parsing for the traversal loop.
//!
//! The three prompts constrain the model hard: sufficiency must be a literal
//! `True`/`False`, decomposition must be a bare JSON array of strings, answer
//! generation must either answer briefly or emit [`UNANSWERABLE_MARKER`]
//! verbatim. Parsing is fail-closed: anything off-contract is reported to the
//! caller as a miss, never guessed at.

/// Exact marker the answer prompt instructs the model to emit when the
/// evidence does not support an answer.
pub const UNANSWERABLE_MARKER: &str =
    "The question cannot be answered using the provided documents.";

/// Render the supporting documents as a JSON array of strings
fn render_docs(docs: &[String]) -> String {
    serde_json::to_string(docs).unwrap_or_else(|_| "[]".to_string())
}

/// Binary sufficiency assessment: can `query` be completely answered from
/// `docs` alone?
pub fn sufficiency_prompt(query: &str, docs: &[String]) -> String {
    format!(
        r#"**Document Answer Assessment Task**

You are a system that only responds with a "True" or "False" and no other text. I will provide you with a query string and some supporting documents as input. Your task is to determine whether or not the query can be completely answered using the information in the documents. Return "True" if it can, or "False" if it cannot.

**Examples:**

Example 1:
* Query: "Who is the CEO of Pongo?"
* Supporting documents: []
* Output: False

Example 2:
* Query: "Were Scott Derrickson and Ed Wood of the same nationality?"
* Supporting documents: ["Scott Derrickson is American.", "Ed Wood currently lives in Albania"]
* Output: False

Example 3:
* Query: "What is the Pongo CEO's favorite color?"
* Supporting documents: ["The CEO of Pongo is Caleb John", "Caleb John's favorite color is red."]
* Output: True

*Query:* {query}

*Documents:* {docs}"#,
        query = query,
        docs = render_docs(docs),
    )
}

/// Break `query` into up to `queries_per_step` self-contained sub-queries,
/// each searchable without the others' context.
pub fn decomposition_prompt(query: &str, docs: &[String], queries_per_step: usize) -> String {
    format!(
        r#"**Query Expansion Task**

You are a system that only responds in a valid JSON array of strings with no other text. I will provide you with a query string and some supporting documents as input. Your task is to break down the query into smaller, specific queries that can be entered into a search system to find the answer. Each query will be searched upon without context of the others, so ensure each will provide valuable information on its own. You will return these component queries in a JSON array.

Generate up to {queries_per_step} queries in your output list.

**Examples:**

Example 1:
* Query: "Were Scott Derrickson and Ed Wood of the same nationality?"
* Supporting documents: []
* Reasoning: We have two pieces of information this input query needs, so we make specific queries for each
* Output: ["What nationality is Scott Derrickson", "What nationality is Ed Wood"]

Example 2:
* Query: "What is the Pongo CEO's favorite color?"
* Supporting documents: []
* Reasoning: We do not know who the CEO of Pongo is, so we first need to find that information before looking into other queries.
* Output: ["Who is the CEO of Pongo?"]

Example 3 (second step to example 2):
* Query: "What is the Pongo CEO's favorite color?"
* Supporting documents: ["The CEO of Pongo is Caleb John"]
* Reasoning: We know that the CEO of Pongo is Caleb John from Document 0, so we fill that information into the output query
* Output: ["What is Caleb John's favorite color?"]

**Input:**

*Query: "{query}"*
*Supporting documents: {docs}*
Output:"#,
        queries_per_step = queries_per_step,
        query = query,
        docs = render_docs(docs),
    )
}

/// Brief Q&A over the final evidence set
pub fn answer_prompt(query: &str, docs: &[String]) -> String {
    format!(
        r#"**Q&A Task**

You are a helpful assistant, please answer the below question based on the provided documents. Make your answers as brief as possible. If the question cannot be answered using the provided documents, say exactly "{marker}"

*Question:* {query}

*Documents:* {docs}"#,
        marker = UNANSWERABLE_MARKER,
        query = query,
        docs = render_docs(docs),
    )
}

/// Parse the sufficiency response: `Some(true)` / `Some(false)` for the two
/// literal tokens (case-insensitive, surrounding whitespace tolerated),
/// `None` for anything else.
pub fn parse_sufficiency(response: &str) -> Option<bool> {
    let token = response.trim();
    if token.eq_ignore_ascii_case("true") {
        Some(true)
    } else if token.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse the decomposition response as a JSON array of strings, truncated to
/// `limit`. Tolerates a single leading/trailing code-fence line; anything
/// else unparsable yields `None`.
pub fn parse_sub_queries(response: &str, limit: usize) -> Option<Vec<String>> {
    let body = strip_code_fence(response.trim());
    let mut queries: Vec<String> = serde_json::from_str(body.as_ref()).ok()?;
    queries.truncate(limit);
    Some(queries)
}

/// Strip one leading and one trailing fence line (```json ... ```), if present
fn strip_code_fence(text: &str) -> std::borrow::Cow<'_, str> {
    if !text.starts_with("```") {
        return std::borrow::Cow::Borrowed(text);
    }
    let mut lines: Vec<&str> = text.lines().collect();
    lines.remove(0);
    if lines.last().is_some_and(|l| l.trim_start().starts_with("```")) {
        lines.pop();
    }
    std::borrow::Cow::Owned(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sufficiency_prompt_contains_inputs() {
        let docs = vec!["Scott Derrickson is American.".to_string()];
        let prompt = sufficiency_prompt("Were they the same nationality?", &docs);
        assert!(prompt.contains("Were they the same nationality?"));
        assert!(prompt.contains("Scott Derrickson is American."));
    }

    #[test]
    fn test_decomposition_prompt_contains_limit() {
        let prompt = decomposition_prompt("q", &[], 4);
        assert!(prompt.contains("Generate up to 4 queries"));
    }

    #[test]
    fn test_answer_prompt_contains_marker() {
        let prompt = answer_prompt("q", &[]);
        assert!(prompt.contains(UNANSWERABLE_MARKER));
    }

    #[test]
    fn test_parse_sufficiency_tokens() {
        assert_eq!(parse_sufficiency("True"), Some(true));
        assert_eq!(parse_sufficiency("  true \n"), Some(true));
        assert_eq!(parse_sufficiency("FALSE"), Some(false));
        assert_eq!(parse_sufficiency("maybe"), None);
        assert_eq!(parse_sufficiency(""), None);
        assert_eq!(parse_sufficiency("True, because ..."), None);
    }

    #[test]
    fn test_parse_sub_queries_plain_array() {
        let parsed = parse_sub_queries(r#"["a", "b"]"#, 5);
        assert_eq!(parsed, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_parse_sub_queries_fenced() {
        let fenced = "```json\n[\"What nationality is Scott Derrickson\", \"What nationality is Ed Wood\"]\n```";
        let parsed = parse_sub_queries(fenced, 5).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], "What nationality is Scott Derrickson");
    }

    #[test]
    fn test_parse_sub_queries_fenced_without_language_tag() {
        let fenced = "```\n[\"a\"]\n```";
        assert_eq!(parse_sub_queries(fenced, 5), Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_parse_sub_queries_truncates_to_limit() {
        let parsed = parse_sub_queries(r#"["a", "b", "c", "d"]"#, 2).unwrap();
        assert_eq!(parsed, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_parse_sub_queries_rejects_garbage() {
        assert_eq!(parse_sub_queries("Sure! Here are some queries:", 5), None);
        assert_eq!(parse_sub_queries("{\"queries\": []}", 5), None);
        assert_eq!(parse_sub_queries("[1, 2]", 5), None);
    }

    #[test]
    fn test_parse_sub_queries_empty_array_is_parsable() {
        // An empty list parses; the engine treats it as a decomposition miss.
        assert_eq!(parse_sub_queries("[]", 5), Some(vec![]));
    }
}
