//! Named endpoints and which one is active.

use crate::error::ErrorKind;
use reqwest::Url;
use std::collections::BTreeMap;

pub const DEFAULT_CONTEXT_NAME: &str = "default";
/// Local dev server started by `dagster dev`.
pub const DEFAULT_URL: &str = "http://localhost:3000/graphql";
pub const DEFAULT_RUNS_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub name: String,
    pub url: String,
    pub runs_limit: usize,
}

impl Context {
    pub fn new(name: impl Into<String>, url: impl Into<String>, runs_limit: usize) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            runs_limit,
        }
    }

    /// Parse the context form input: `<name> <url> [runs_limit]`.
    pub fn parse_form(input: &str) -> Result<Self, ErrorKind> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let (name, url, limit) = match parts.as_slice() {
            [name, url] => (*name, *url, DEFAULT_RUNS_LIMIT),
            [name, url, limit] => {
                let limit = limit.parse::<usize>().map_err(|_| {
                    ErrorKind::InvalidOperation(format!("runs limit must be a number, got '{limit}'"))
                })?;
                (*name, *url, limit)
            }
            _ => {
                return Err(ErrorKind::InvalidOperation(
                    "usage: <name> <url> [runs_limit]".to_string(),
                ))
            }
        };
        validate_url(url)?;
        Ok(Self::new(name, url, limit))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_NAME, DEFAULT_URL, DEFAULT_RUNS_LIMIT)
    }
}

/// Absolute http(s) URL or `InvalidOperation`.
pub fn validate_url(url: &str) -> Result<(), ErrorKind> {
    let parsed =
        Url::parse(url).map_err(|e| ErrorKind::InvalidOperation(format!("invalid url '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ErrorKind::InvalidOperation(format!(
            "invalid url '{url}': unsupported scheme '{other}'"
        ))),
    }
}

/// Known contexts plus the active selection. Exactly one context is active at all
/// times; an ad-hoc URL override shadows it until the next `switch_to`.
#[derive(Debug, Clone)]
pub struct ContextStore {
    contexts: BTreeMap<String, Context>,
    active: String,
    adhoc: Option<Context>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(Vec::new(), None)
    }
}

impl ContextStore {
    /// Falls back to the first known context when `active` is missing or unknown,
    /// and to the built-in default when there are no contexts at all.
    pub fn new(contexts: Vec<Context>, active: Option<&str>) -> Self {
        let mut map: BTreeMap<String, Context> =
            contexts.into_iter().map(|c| (c.name.clone(), c)).collect();
        if map.is_empty() {
            let fallback = Context::default();
            map.insert(fallback.name.clone(), fallback);
        }
        let active = match active {
            Some(name) if map.contains_key(name) => name.to_string(),
            _ => map.keys().next().cloned().unwrap_or_default(),
        };
        Self {
            contexts: map,
            active,
            adhoc: None,
        }
    }

    pub fn list(&self) -> Vec<&Context> {
        self.contexts.values().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Context> {
        self.contexts.get(name)
    }

    pub fn add(&mut self, ctx: Context) -> Result<(), ErrorKind> {
        if ctx.name.trim().is_empty() {
            return Err(ErrorKind::InvalidOperation("context name is empty".to_string()));
        }
        if ctx.url.trim().is_empty() {
            return Err(ErrorKind::InvalidOperation("context url is empty".to_string()));
        }
        if ctx.runs_limit == 0 {
            return Err(ErrorKind::InvalidOperation(
                "runs limit must be greater than zero".to_string(),
            ));
        }
        if self.contexts.contains_key(&ctx.name) {
            return Err(ErrorKind::DuplicateName(ctx.name));
        }
        self.contexts.insert(ctx.name.clone(), ctx);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Context, ErrorKind> {
        if name == self.active {
            return Err(ErrorKind::InvalidOperation(format!(
                "cannot delete the active context '{name}'"
            )));
        }
        self.contexts
            .remove(name)
            .ok_or_else(|| ErrorKind::NotFound(name.to_string()))
    }

    /// Select `name` and drop any ad-hoc override. The caller rebuilds views.
    pub fn switch_to(&mut self, name: &str) -> Result<(), ErrorKind> {
        if !self.contexts.contains_key(name) {
            return Err(ErrorKind::NotFound(name.to_string()));
        }
        self.active = name.to_string();
        self.adhoc = None;
        Ok(())
    }

    /// Point the active context at another URL for this session only.
    pub fn set_adhoc_url(&mut self, url: &str) -> Result<(), ErrorKind> {
        validate_url(url)?;
        let base = self.active_saved();
        self.adhoc = Some(Context::new(base.name.clone(), url, base.runs_limit));
        Ok(())
    }

    /// Session-only runs limit for the active context (the `--limit` flag).
    pub fn override_runs_limit(&mut self, runs_limit: usize) -> Result<(), ErrorKind> {
        if runs_limit == 0 {
            return Err(ErrorKind::InvalidOperation(
                "runs limit must be greater than zero".to_string(),
            ));
        }
        let mut ctx = self.active();
        ctx.runs_limit = runs_limit;
        self.adhoc = Some(ctx);
        Ok(())
    }

    pub fn adhoc(&self) -> Option<&Context> {
        self.adhoc.as_ref()
    }

    /// The endpoint fetches go to: the ad-hoc override if set, else the active context.
    pub fn active(&self) -> Context {
        self.adhoc.clone().unwrap_or_else(|| self.active_saved())
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn active_url(&self) -> String {
        self.active().url
    }

    fn active_saved(&self) -> Context {
        self.contexts.get(&self.active).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> ContextStore {
        ContextStore::new(
            vec![
                Context::new("default", DEFAULT_URL, 20),
                Context::new("staging", "https://staging.example.com/graphql", 50),
            ],
            Some("default"),
        )
    }

    #[test]
    fn empty_store_gets_default_context() {
        let s = ContextStore::default();
        assert_eq!(s.active(), Context::default());
        assert_eq!(s.list().len(), 1);
    }

    #[test]
    fn unknown_active_falls_back_to_first() {
        let s = ContextStore::new(vec![Context::new("b", DEFAULT_URL, 5)], Some("zzz"));
        assert_eq!(s.active_name(), "b");
    }

    #[test]
    fn add_rejects_duplicates_and_bad_input() {
        let mut s = store();
        assert_eq!(
            s.add(Context::new("staging", DEFAULT_URL, 1)),
            Err(ErrorKind::DuplicateName("staging".into()))
        );
        assert!(matches!(
            s.add(Context::new("prod", DEFAULT_URL, 0)),
            Err(ErrorKind::InvalidOperation(_))
        ));
        assert!(matches!(
            s.add(Context::new(" ", DEFAULT_URL, 5)),
            Err(ErrorKind::InvalidOperation(_))
        ));
        assert!(s.add(Context::new("prod", "https://prod/graphql", 5)).is_ok());
        assert_eq!(s.list().len(), 3);
    }

    #[test]
    fn remove_guards_active_and_unknown() {
        let mut s = store();
        assert!(matches!(s.remove("default"), Err(ErrorKind::InvalidOperation(_))));
        assert_eq!(s.remove("nope"), Err(ErrorKind::NotFound("nope".into())));
        assert_eq!(s.remove("staging").map(|c| c.runs_limit), Ok(50));
        assert_eq!(s.list().len(), 1);
    }

    #[test]
    fn switch_clears_adhoc_override() {
        let mut s = store();
        s.set_adhoc_url("http://10.0.0.5:3000/graphql").unwrap();
        assert_eq!(s.active_url(), "http://10.0.0.5:3000/graphql");
        // Override inherits the saved context's name and limit.
        assert_eq!(s.active().name, "default");
        assert_eq!(s.active().runs_limit, 20);

        s.switch_to("staging").unwrap();
        assert!(s.adhoc().is_none());
        assert_eq!(s.active_url(), "https://staging.example.com/graphql");
        assert_eq!(s.switch_to("missing"), Err(ErrorKind::NotFound("missing".into())));
        assert_eq!(s.active_name(), "staging");
    }

    #[test]
    fn limit_override_keeps_url() {
        let mut s = store();
        s.override_runs_limit(5).unwrap();
        assert_eq!(s.active().runs_limit, 5);
        assert_eq!(s.active_url(), DEFAULT_URL);
        assert!(s.override_runs_limit(0).is_err());
        // Saved context untouched.
        assert_eq!(s.get("default").map(|c| c.runs_limit), Some(20));
    }

    #[test]
    fn adhoc_url_is_validated() {
        let mut s = store();
        assert!(s.set_adhoc_url("not a url").is_err());
        assert!(s.set_adhoc_url("ftp://host/graphql").is_err());
        assert!(s.adhoc().is_none());
    }

    #[test]
    fn parse_form_defaults_limit() {
        let ctx = Context::parse_form("prod https://prod.example.com/graphql").unwrap();
        assert_eq!(ctx.runs_limit, DEFAULT_RUNS_LIMIT);
        let ctx = Context::parse_form("prod https://prod.example.com/graphql 5").unwrap();
        assert_eq!(ctx.runs_limit, 5);
        assert!(Context::parse_form("prod").is_err());
        assert!(Context::parse_form("prod https://x/graphql abc").is_err());
        assert!(Context::parse_form("prod nope").is_err());
    }
}
