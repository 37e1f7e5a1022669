pub const API_BASE_ENV: &str = "PIXGATE_API_URL";
pub const DEFAULT_API_BASE: &str = "http://localhost:3000/api";
pub const FEATURE_HEADER: &str = "x-feature-type";
pub const FEATURE_FIELD: &str = "feature";
pub const PROCESS_ROUTE: &str = "/api/process";

pub fn normalize_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Upstream base from `PIXGATE_API_URL`, or the local default.
pub fn api_base_from(value: Option<String>) -> String {
    value
        .map(|value| normalize_base(&value))
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_is_trimmed_and_defaulted() {
        assert_eq!(api_base_from(None), DEFAULT_API_BASE);
        assert_eq!(api_base_from(Some("  ".to_string())), DEFAULT_API_BASE);
        assert_eq!(
            api_base_from(Some("https://api.example.com/v1/ ".to_string())),
            "https://api.example.com/v1"
        );
    }
}
