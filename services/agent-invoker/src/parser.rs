//! Parses an agent's free-text reply into a [`DecisionReply`] (§6.1).
//!
//! The original (`llm/response_parser.py`) tries increasingly permissive
//! extraction strategies against one raw reply and keeps the first that
//! parses as valid JSON matching the grammar. No `regex` crate anywhere in
//! this workspace's dependency stack, so every stage here is manual string
//! scanning (`str::find`), not a pattern match.

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no JSON object could be extracted from the reply")]
    NoJsonFound,
    #[error("extracted text is not valid JSON matching the decision grammar: {0}")]
    InvalidGrammar(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExitPlanSpec {
    pub profit_target: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub invalidation: Option<String>,
}

/// One proposed order, still in raw agent-supplied form (§6.1). Validation
/// and symbol/side/quantity correction against the real position happen
/// downstream in `dispatch`, never here.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderSpec {
    pub action: String,
    pub symbol: String,
    pub side: Option<String>,
    pub quantity: Option<Decimal>,
    pub leverage: Option<u32>,
    pub position_id: Option<String>,
    pub exit_plan: Option<ExitPlanSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionReply {
    pub decision: String,
    pub reasoning: String,
    pub confidence: Option<Decimal>,
    #[serde(default)]
    pub orders: Vec<OrderSpec>,
}

fn validate_grammar(value: &serde_json::Value) -> Result<DecisionReply, ParseError> {
    serde_json::from_value(value.clone()).map_err(|e| ParseError::InvalidGrammar(e.to_string()))
}

fn try_parse(candidate: &str) -> Option<DecisionReply> {
    let value: serde_json::Value = serde_json::from_str(candidate.trim()).ok()?;
    validate_grammar(&value).ok()
}

/// Stage 1: a `[Response]` (or `Response:`) labelled section, the format the
/// system prompt asks for.
fn extract_labelled_section(reply: &str) -> Option<&str> {
    for marker in ["[Response]", "[RESPONSE]", "Response:"] {
        if let Some(start) = reply.find(marker) {
            return Some(&reply[start + marker.len()..]);
        }
    }
    None
}

/// Stage 2: the first fenced code block, optionally tagged ```json.
fn extract_fenced_block(reply: &str) -> Option<&str> {
    let start = reply.find("```")?;
    let after_open = &reply[start + 3..];
    let after_open = after_open.strip_prefix("json").unwrap_or(after_open);
    let end = after_open.find("```")?;
    Some(&after_open[..end])
}

/// Stage 3: the substring from the first `{` to the last `}` in the text.
fn extract_brace_span(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&reply[start..=end])
}

/// Try, in order: a `[Response]` section, a fenced code block, the
/// first-`{`-to-last-`}` span, then the whole reply verbatim. The first
/// stage that both extracts something and validates against the decision
/// grammar wins (§6.1).
pub fn parse_reply(reply: &str) -> Result<DecisionReply, ParseError> {
    let candidates = [
        extract_labelled_section(reply),
        extract_fenced_block(reply),
        extract_brace_span(reply),
        Some(reply),
    ];

    let mut last_grammar_error: Option<String> = None;
    let mut any_json_found = false;
    for candidate in candidates.into_iter().flatten() {
        match serde_json::from_str::<serde_json::Value>(candidate.trim()) {
            Ok(value) => {
                any_json_found = true;
                match validate_grammar(&value) {
                    Ok(reply) => return Ok(reply),
                    Err(ParseError::InvalidGrammar(msg)) => last_grammar_error = Some(msg),
                    Err(other) => return Err(other),
                }
            }
            Err(_) => continue,
        }
    }

    match last_grammar_error {
        Some(msg) => Err(ParseError::InvalidGrammar(msg)),
        None if any_json_found => Err(ParseError::InvalidGrammar("no candidate matched the grammar".into())),
        None => Err(ParseError::NoJsonFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_labelled_response_section() {
        let reply = "Some preamble.\n[Response]\n{\"decision\": \"hold\", \"reasoning\": \"flat\", \"orders\": []}";
        let parsed = parse_reply(reply).unwrap();
        assert_eq!(parsed.decision, "hold");
        assert_eq!(parsed.orders.len(), 0);
    }

    #[test]
    fn parses_a_fenced_json_block() {
        let reply = "Here is my call:\n```json\n{\"decision\": \"trade\", \"reasoning\": \"momentum\", \"orders\": [{\"action\": \"open\", \"symbol\": \"BTCUSDT\", \"side\": \"buy\", \"quantity\": 0.1, \"leverage\": 5}]}\n```\nGood luck.";
        let parsed = parse_reply(reply).unwrap();
        assert_eq!(parsed.decision, "trade");
        assert_eq!(parsed.orders.len(), 1);
        assert_eq!(parsed.orders[0].symbol, "BTCUSDT");
    }

    #[test]
    fn falls_back_to_brace_span_when_unlabelled_and_unfenced() {
        let reply = "I think {\"decision\": \"hold\", \"reasoning\": \"no edge\", \"orders\": []} is right.";
        let parsed = parse_reply(reply).unwrap();
        assert_eq!(parsed.decision, "hold");
    }

    #[test]
    fn falls_back_to_whole_reply_when_it_is_bare_json() {
        let reply = "{\"decision\": \"hold\", \"reasoning\": \"nothing to do\", \"orders\": []}";
        let parsed = parse_reply(reply).unwrap();
        assert_eq!(parsed.decision, "hold");
    }

    #[test]
    fn no_json_anywhere_is_reported_distinctly_from_bad_grammar() {
        assert_eq!(parse_reply("I have decided to hold."), Err(ParseError::NoJsonFound));
    }

    #[test]
    fn json_missing_required_fields_is_a_grammar_error() {
        let err = parse_reply("{\"foo\": 1}").unwrap_err();
        assert!(matches!(err, ParseError::InvalidGrammar(_)));
    }
}
