//! robots.txt compliance, cached per origin.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use robotstxt::DefaultMatcher;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

/// Answers "may this agent fetch this URL" using each origin's robots.txt.
///
/// A robots.txt that is missing or cannot be fetched allows everything.
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    agent: String,
    cache: Arc<Mutex<HashMap<String, Arc<str>>>>,
}

impl RobotsPolicy {
    pub fn new(user_agent: &str) -> Self {
        Self {
            agent: agent_token(user_agent),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The product token matched against `User-agent:` lines.
    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub async fn is_allowed(&self, client: &Client, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();

        // Held across the fetch so each origin's robots.txt is requested once.
        let mut cache = self.cache.lock().await;
        let body = match cache.get(&origin) {
            Some(body) => body.clone(),
            None => {
                let body: Arc<str> = fetch_robots(client, &origin).await.into();
                cache.insert(origin, body.clone());
                body
            }
        };
        drop(cache);

        allowed_by(&body, &self.agent, url.as_str())
    }
}

async fn fetch_robots(client: &Client, origin: &str) -> String {
    let robots_url = format!("{}/robots.txt", origin);
    match client.get(&robots_url).send().await {
        Ok(response) if response.status().is_success() => {
            response.text().await.unwrap_or_default()
        }
        Ok(response) => {
            debug!("{} returned {}; allowing all", robots_url, response.status());
            String::new()
        }
        Err(e) => {
            debug!("Could not fetch {}: {}; allowing all", robots_url, e);
            String::new()
        }
    }
}

/// Check a robots.txt body for one agent.
pub fn allowed_by(robots_body: &str, agent: &str, url: &str) -> bool {
    if robots_body.trim().is_empty() {
        return true;
    }
    let mut matcher = DefaultMatcher::default();
    matcher.one_agent_allowed_by_robots(robots_body, agent, url)
}

/// "Mozilla/5.0 (X11; ...)" -> "Mozilla", "storefeed/0.3 (...)" -> "storefeed".
pub fn agent_token(user_agent: &str) -> String {
    let token: String = user_agent
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if token.is_empty() {
        "*".to_string()
    } else {
        token
    }
}
