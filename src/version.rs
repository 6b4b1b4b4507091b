/// Build-time override for packaged releases; falls back to the crate version.
pub const VERSION: &str = match option_env!("NOTIFIER_BUILD_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

pub fn user_agent() -> String {
    format!("finesse-notifier/{VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_version() {
        assert!(user_agent().starts_with("finesse-notifier/"));
        assert!(user_agent().ends_with(VERSION));
    }
}
