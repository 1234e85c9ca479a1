// src/client/route_table.rs

//! Static route registry of the web client.

use std::collections::{BTreeMap, BTreeSet};

use url::Url;

/// Access requirements attached to a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    /// Roles allowed on the route. `None` admits every authenticated user.
    pub roles: Option<BTreeSet<String>>,
}

impl RouteMeta {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn authenticated() -> Self {
        Self {
            requires_auth: true,
            roles: None,
        }
    }

    pub fn roles(roles: &[&str]) -> Self {
        Self {
            requires_auth: true,
            roles: Some(roles.iter().map(|r| r.to_string()).collect()),
        }
    }

    pub fn allows_role(&self, role: Option<&str>) -> bool {
        match (&self.roles, role) {
            (None, _) => true,
            (Some(allowed), Some(role)) => allowed.contains(role),
            (Some(_), None) => false,
        }
    }
}

/// A resolved navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Path without query or fragment.
    pub path: String,
    /// Path as requested, including query and fragment.
    pub full_path: String,
    /// Pattern of the matched route, if any.
    pub route: Option<String>,
    pub params: BTreeMap<String, String>,
    pub meta: RouteMeta,
}

#[derive(Debug, Clone)]
struct RouteRecord {
    pattern: String,
    segments: Vec<String>,
    meta: RouteMeta,
}

impl RouteRecord {
    fn matches(&self, segments: &[&str]) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        let mut rest = segments.iter();
        for (idx, expected) in self.segments.iter().enumerate() {
            if expected == "*" {
                let tail: Vec<&str> = segments[idx..].to_vec();
                params.insert("pathMatch".to_string(), tail.join("/"));
                return Some(params);
            }
            let actual = rest.next()?;
            match expected.strip_prefix(':') {
                Some(name) => {
                    params.insert(name.to_string(), actual.to_string());
                }
                None if expected == actual => {}
                None => return None,
            }
        }
        rest.next().is_none().then_some(params)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteRecord>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route. Patterns use `:name` for parameters and a final
    /// `*` for a catch-all. The first registered match wins.
    pub fn route(mut self, pattern: &str, meta: RouteMeta) -> Self {
        self.routes.push(RouteRecord {
            pattern: pattern.to_string(),
            segments: split_path(pattern).into_iter().map(str::to_string).collect(),
            meta,
        });
        self
    }

    /// Resolves a full path. Unknown paths resolve to a public destination.
    pub fn resolve(&self, full_path: &str) -> Destination {
        let path = path_of(full_path);
        let segments = split_path(&path);

        let matched = self
            .routes
            .iter()
            .find_map(|record| record.matches(&segments).map(|params| (record, params)));

        match matched {
            Some((record, params)) => Destination {
                path,
                full_path: full_path.to_string(),
                route: Some(record.pattern.clone()),
                params,
                meta: record.meta.clone(),
            },
            None => Destination {
                path,
                full_path: full_path.to_string(),
                route: None,
                params: BTreeMap::new(),
                meta: RouteMeta::public(),
            },
        }
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Path component of a client-relative URL.
fn path_of(full_path: &str) -> String {
    Url::parse("http://client.local/")
        .and_then(|base| base.join(full_path))
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| {
            full_path
                .split(['?', '#'])
                .next()
                .unwrap_or("/")
                .to_string()
        })
}
