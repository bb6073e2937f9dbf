//! User agent handling for HTTP requests.

pub const USER_AGENT: &str = concat!(
    "lep-downloader/",
    env!("CARGO_PKG_VERSION"),
    " (podcast archive downloader)"
);

/// Desktop browser user agent for sites that reject unknown clients.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0";

/// Resolve user agent from config value.
/// - None => default lep-downloader user agent
/// - "browser" => desktop browser user agent
/// - other => custom user agent string
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config {
        None => USER_AGENT.to_string(),
        Some("browser") => BROWSER_USER_AGENT.to_string(),
        Some(custom) => custom.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_user_agent_default() {
        assert!(resolve_user_agent(None).starts_with("lep-downloader/"));
    }

    #[test]
    fn test_resolve_user_agent_browser() {
        assert!(resolve_user_agent(Some("browser")).contains("Mozilla"));
    }

    #[test]
    fn test_resolve_user_agent_custom() {
        assert_eq!(resolve_user_agent(Some("MyBot/1.0")), "MyBot/1.0");
    }
}
