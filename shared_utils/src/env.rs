/// Reads an environment variable, returning `None` when it is unset or blank.
///
/// A variable that is set but only contains whitespace counts as unset, the
/// same way an empty `S3_BUCKET=` line in a `.env` file would. Values are
/// trimmed.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_optional_env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads an environment variable, falling back to `default` when unset or blank.
pub fn get_env_var_or(name: &str, default: &str) -> String {
    get_optional_env_var(name).unwrap_or_else(|| default.to_string())
}
