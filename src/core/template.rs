//! `{placeholder}` substitution for advisory messages

use anyhow::{Result, bail};

/// Names of the `{placeholder}` tokens used in a template, in order of
/// appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if !name.is_empty()
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    names.push(name);
                }
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}

/// Fails if the template references a placeholder outside `allowed`.
pub fn validate(template: &str, allowed: &[&str]) -> Result<()> {
    for name in placeholders(template) {
        if !allowed.contains(&name) {
            bail!(
                "Unknown placeholder {{{name}}} in message \"{template}\" (allowed: {})",
                allowed.join(", ")
            );
        }
    }
    Ok(())
}

pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    vars.iter().fold(template.to_string(), |out, (name, value)| {
        out.replace(&format!("{{{name}}}"), value)
    })
}
