//! Search index naming.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use taskforge_core::defaults;

/// Generate a fresh index name: `{prefix}-{unix_millis}-{6 hex digits}`.
///
/// The prefix is lower-cased, reduced to `[a-z0-9-]` and truncated so the
/// whole name never exceeds [`defaults::INDEX_NAME_MAX_LEN`].
pub fn generate_index_name(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix: u32 = rand::thread_rng().gen_range(0..0x100_0000);
    let tail = format!("-{}-{:06x}", millis, suffix);

    let mut prefix = sanitize_prefix(prefix);
    prefix.truncate(defaults::INDEX_NAME_MAX_LEN.saturating_sub(tail.len()));
    let prefix = prefix.trim_end_matches('-');
    let prefix = if prefix.is_empty() {
        defaults::INDEX_NAME_PREFIX
    } else {
        prefix
    };

    format!("{}{}", prefix, tail)
}

fn sanitize_prefix(prefix: &str) -> String {
    prefix
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == '_' || c == ' ' { '-' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect::<String>()
        .trim_start_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid(name: &str) -> bool {
        name.len() <= defaults::INDEX_NAME_MAX_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }

    #[test]
    fn test_default_prefix_shape() {
        let name = generate_index_name("project");
        let parts: Vec<&str> = name.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "project");
        assert!(parts[1].parse::<u128>().is_ok());
        assert_eq!(parts[2].len(), 6);
        assert!(is_valid(&name));
    }

    #[test]
    fn test_names_are_unique() {
        let a = generate_index_name("project");
        let b = generate_index_name("project");
        assert_ne!(a, b);
    }

    #[test]
    fn test_long_and_dirty_prefix_is_clamped() {
        let name = generate_index_name("My_Very Long Tenant Prefix That Goes On!!");
        assert!(is_valid(&name), "{}", name);
        assert!(name.starts_with("my-very-long"));
    }

    #[test]
    fn test_unusable_prefix_falls_back() {
        let name = generate_index_name("***");
        assert!(name.starts_with("project-"));
    }
}
