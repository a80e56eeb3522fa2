/// Shared SELECT fragments so every query maps onto the same row structs
pub struct QueryBuilder;

impl QueryBuilder {
    pub const REPOSITORY_SELECT: &'static str = r#"
        SELECT id, owner_id, owner_name, name, description, default_branch,
               topics, is_empty, is_mirror, has_wiki, size_bytes
        FROM repositories
    "#;

    pub const MIRROR_SELECT: &'static str = r#"
        SELECT repo_id, interval_secs, next_update, enable_prune,
               remote_username, remote_password, lfs_enabled, lfs_endpoint,
               last_error, updated_at
        FROM mirrors
    "#;

    pub const PUSH_MIRROR_SELECT: &'static str = r#"
        SELECT id, repo_id, remote_name, remote_username, remote_password,
               interval_secs, created_at, last_update, last_error
        FROM push_mirrors
    "#;

    pub const RELEASE_SELECT: &'static str = r#"
        SELECT id, repo_id, tag_name, lower_tag_name, sha1, num_commits,
               is_draft, is_tag, publisher_id, created_at
        FROM releases
    "#;

    /// `base` followed by a filter clause
    pub fn select_where(base: &str, filter: &str) -> String {
        format!("{base} WHERE {filter}")
    }

    /// Filter for a release listing; drafts and plain tags are opt-in
    pub fn release_filter(include_drafts: bool, include_tags: bool) -> String {
        let mut filter = String::from("repo_id = $1");
        if !include_drafts {
            filter.push_str(" AND is_draft = FALSE");
        }
        if !include_tags {
            filter.push_str(" AND is_tag = FALSE");
        }
        filter
    }
}
