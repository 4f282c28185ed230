//! User agent handling for HTTP requests.

pub const USER_AGENT: &str = "storefeed/0.3 (product feed crawler)";

/// Real browser user agents for impersonate mode.
pub const IMPERSONATE_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
];

fn random_user_agent() -> &'static str {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as usize)
        .unwrap_or(0);
    IMPERSONATE_USER_AGENTS[nanos % IMPERSONATE_USER_AGENTS.len()]
}

/// Resolve the configured user agent.
/// - empty => the storefeed agent
/// - "impersonate" => a real browser agent
/// - other => used verbatim
pub fn resolve_user_agent(configured: &str) -> String {
    match configured.trim() {
        "" => USER_AGENT.to_string(),
        "impersonate" => random_user_agent().to_string(),
        custom => custom.to_string(),
    }
}
