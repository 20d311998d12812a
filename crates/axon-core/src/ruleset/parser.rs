//! Ruleset DSL Parser
//!
//! Line-based, one declaration per line, `#` comments:
//!
//! ```text
//! mode strict
//! symbol alpha onehot 0,10
//! symbol pulse values 0.5,0.25,-0.1
//! trigger alpha 0.92 emit_token
//! heuristic critic_max 0.7
//! ```
//!
//! The first malformed line aborts the parse with a single diagnostic.

use super::{ReflexTrigger, Ruleset, RulesetError, SymbolDef, VectorSpec};

fn parse_error(line: usize, message: impl Into<String>) -> RulesetError {
    RulesetError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_index_list(line: usize, raw: &str) -> Result<Vec<usize>, RulesetError> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| parse_error(line, format!("bad one-hot index: {part}")))
        })
        .collect()
}

fn parse_value_list(line: usize, raw: &str) -> Result<Vec<f32>, RulesetError> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|_| parse_error(line, format!("bad value: {part}")))
        })
        .collect()
}

/// Parse a ruleset document.
pub fn parse_ruleset(source: &str) -> Result<Ruleset, RulesetError> {
    let mut ruleset = Ruleset::default();

    for (index, raw_line) in source.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let keyword = parts.next().unwrap_or_default();
        match keyword {
            "mode" => {
                let tag = parts
                    .next()
                    .ok_or_else(|| parse_error(line_no, "mode requires a tag"))?;
                ruleset.constraint_mode = tag.to_string();
            }
            "symbol" => {
                let token = parts
                    .next()
                    .ok_or_else(|| parse_error(line_no, "symbol requires a token"))?;
                let kind = parts
                    .next()
                    .ok_or_else(|| parse_error(line_no, "symbol requires a vector spec"))?;
                let body = parts
                    .next()
                    .ok_or_else(|| parse_error(line_no, "symbol spec requires a list"))?;
                if parts.next().is_some() {
                    return Err(parse_error(line_no, "trailing tokens after symbol spec"));
                }
                let spec = match kind {
                    "onehot" => VectorSpec::OneHot(parse_index_list(line_no, body)?),
                    "values" => VectorSpec::Values(parse_value_list(line_no, body)?),
                    other => {
                        return Err(parse_error(
                            line_no,
                            format!("unknown vector spec kind: {other}"),
                        ));
                    }
                };
                ruleset.symbol_definitions.push(SymbolDef {
                    token: token.to_string(),
                    spec,
                });
            }
            "trigger" => {
                let target = parts
                    .next()
                    .ok_or_else(|| parse_error(line_no, "trigger requires a target"))?;
                let threshold = parts
                    .next()
                    .ok_or_else(|| parse_error(line_no, "trigger requires a threshold"))?
                    .parse::<f64>()
                    .map_err(|_| parse_error(line_no, "trigger threshold is not a number"))?;
                let action = parts
                    .next()
                    .ok_or_else(|| parse_error(line_no, "trigger requires an action"))?;
                ruleset.reflex_triggers.push(ReflexTrigger {
                    target: target.to_string(),
                    similarity_threshold: threshold,
                    action: action.to_string(),
                });
            }
            "heuristic" => {
                let key = parts
                    .next()
                    .ok_or_else(|| parse_error(line_no, "heuristic requires a key"))?;
                let value = parts
                    .next()
                    .ok_or_else(|| parse_error(line_no, "heuristic requires a value"))?;
                ruleset
                    .heuristic_overrides
                    .push((key.to_string(), value.to_string()));
            }
            other => {
                return Err(parse_error(line_no, format!("unknown keyword: {other}")));
            }
        }
    }

    Ok(ruleset)
}

// ============================================================================
// TESTS
// ============================================================================
