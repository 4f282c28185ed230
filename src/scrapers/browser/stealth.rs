//! Evasion scripts evaluated after each navigation.

pub const STEALTH_SCRIPTS: &[&str] = &[
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    r#"
    window.chrome = window.chrome || { runtime: {}, app: {} };
    "#,
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['vi-VN', 'vi', 'en-US', 'en'],
        configurable: true
    });
    "#,
];

/// User agent presented by the browser instead of the headless default.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
