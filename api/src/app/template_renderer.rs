//! Template rendering
//!
//! Substitutes `{name}`-style placeholders and resolves inline spintax blocks
//! such as `{Hi|Hello|Hey}`. Both steps are pure apart from the injected RNG.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use rand::Rng;
use regex::{Captures, Regex};

use crate::domain::entities::{Event, Talent};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Innermost brace group holding at least one alternative separator
fn spintax_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}]*\|[^{}]*)\}").expect("spintax pattern is valid"))
}

/// Named values available to a template
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: BTreeMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Variables for an outreach message. Missing event details render empty.
    pub fn for_invitation(talent: &Talent, event: &Event) -> Self {
        Self::new()
            .set("name", talent.name.clone())
            .set("eventName", event.name.clone())
            .set("eventType", event.event_type.clone().unwrap_or_default())
            .set("eventCity", event.city.clone().unwrap_or_default())
            .set(
                "eventDate",
                event
                    .starts_at
                    .map(|at| at.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            )
    }
}

/// Replace every known `{key}` with its value in a single pass.
/// Unknown placeholders are left untouched; substituted values are not rescanned.
pub fn render_template(template: &str, vars: &TemplateVars) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Resolve spintax blocks innermost first, picking one alternative uniformly
pub fn resolve_spintax<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    let pattern = spintax_pattern();
    let mut current = text.to_string();

    while pattern.is_match(&current) {
        current = pattern
            .replace_all(&current, |caps: &Captures| {
                let options: Vec<&str> = caps[1].split('|').collect();
                let pick = rng.gen_range(0..options.len());
                options[pick].to_string()
            })
            .into_owned();
    }

    current
}

/// Render a template then resolve any remaining spintax
pub fn render_message<R: Rng + ?Sized>(template: &str, vars: &TemplateVars, rng: &mut R) -> String {
    resolve_spintax(&render_template(template, vars), rng)
}
