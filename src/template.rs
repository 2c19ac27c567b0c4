//! Command templating
//!
//! Expands a command body before submission: `$name` variable substitution
//! plus optional prologue/epilogue wrapping. Pure functions, no session
//! involvement.

use regex::{Captures, Regex};

/// Replace every `$name` token in `body` with its value.
///
/// A token only matches when immediately followed by whitespace, a newline,
/// or end-of-text; the trailing character is preserved. Matching is literal,
/// not an expression language, and a variable absent from the body is simply
/// not substituted. Substitution runs in the order variables are supplied;
/// the trailing-character rule keeps a shorter name from matching inside a
/// longer token, but a substituted value that itself contains a `$name` token
/// is rewritten by a later variable. That ordering hazard is accepted, not
/// guarded.
pub fn substitute_variables(body: &str, variables: &[(String, String)]) -> String {
    let mut out = body.to_string();

    for (name, value) in variables {
        if name.is_empty() {
            continue;
        }
        let pattern = format!(r"\${}(\s|\z)", regex::escape(name));
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            // Escaped names always compile; skip rather than fail.
            Err(_) => continue,
        };
        out = re
            .replace_all(&out, |caps: &Captures<'_>| {
                let trailing = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}{}", value, trailing)
            })
            .into_owned();
    }

    out
}

/// Apply variable substitution, then wrap the body with the prologue and
/// epilogue blocks when present.
///
/// With no prologue and no epilogue the result is exactly the substituted
/// body, byte for byte.
pub fn expand_body(
    body: &str,
    variables: &[(String, String)],
    prologue: Option<&str>,
    epilogue: Option<&str>,
) -> String {
    let mut text = substitute_variables(body, variables);

    if let Some(prologue) = prologue.filter(|p| !p.is_empty()) {
        text = format!("{}\n{}", prologue, text);
    }
    if let Some(epilogue) = epilogue.filter(|e| !e.is_empty()) {
        text = format!("{}\n{}", text, epilogue);
    }

    text
}
