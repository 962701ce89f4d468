// src/utils/robots.rs

//! Minimal robots.txt evaluation.
//!
//! Supports `User-agent`, `Allow` and `Disallow` with prefix matching. The
//! longest matching rule decides; `Allow` wins a tie.

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    allow: bool,
    path: String,
}

#[derive(Debug, Clone, Default)]
struct Group {
    agents: Vec<String>,
    rules: Vec<Rule>,
}

/// Parsed robots.txt file.
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    groups: Vec<Group>,
}

impl RobotsRules {
    /// Parse robots.txt content. Unknown lines are ignored.
    pub fn parse(content: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        let mut in_rules = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if in_rules || groups.is_empty() {
                        groups.push(Group::default());
                        in_rules = false;
                    }
                    if let Some(group) = groups.last_mut() {
                        group.agents.push(value.to_lowercase());
                    }
                }
                "allow" | "disallow" => {
                    in_rules = true;
                    let Some(group) = groups.last_mut() else {
                        continue;
                    };
                    // An empty Disallow allows everything
                    if value.is_empty() {
                        continue;
                    }
                    group.rules.push(Rule {
                        allow: key == "allow",
                        path: value.to_string(),
                    });
                }
                _ => {}
            }
        }

        Self { groups }
    }

    /// Whether `user_agent` may fetch `url`.
    pub fn is_allowed(&self, user_agent: &str, url: &Url) -> bool {
        let token = user_agent
            .split('/')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();

        let named = self.groups.iter().find(|g| {
            g.agents
                .iter()
                .any(|a| a != "*" && !a.is_empty() && token.contains(a.as_str()))
        });
        let group = named.or_else(|| self.groups.iter().find(|g| g.agents.iter().any(|a| a == "*")));
        let Some(group) = group else {
            return true;
        };

        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        group
            .rules
            .iter()
            .filter(|r| target.starts_with(&r.path))
            .max_by(|a, b| {
                a.path
                    .len()
                    .cmp(&b.path.len())
                    .then_with(|| a.allow.cmp(&b.allow))
            })
            .is_none_or(|r| r.allow)
    }
}

/// Location of the robots.txt governing `url`.
pub fn robots_url(url: &Url) -> Option<Url> {
    let host = url.host_str()?;
    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}/robots.txt", url.scheme(), host, port),
        None => format!("{}://{}/robots.txt", url.scheme(), host),
    };
    Url::parse(&origin).ok()
}
