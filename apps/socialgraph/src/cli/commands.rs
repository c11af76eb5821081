//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::config::{Backend, Config, read_snapshot_file};
use crate::credentials::{login, new_user_with_password};
use crate::loaders::{self, ImportLimits, LoadReport};
use serde::Serialize;
use socialgraph_core::{
    FollowOutcome, ProfileUpdate, SearchMode, SerializableGraph, Session, SocialError,
    UserSummary, snapshot_from_bytes, snapshot_to_bytes,
};
use std::path::{Path, PathBuf};

// =============================================================================
// PATH VALIDATION
// =============================================================================

/// Validate file path for security.
///
/// Canonicalizes the path (resolving symlinks and "..") and requires a
/// regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, SocialError> {
    let canonical = path.canonicalize().map_err(|e| {
        SocialError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(SocialError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate output path for security.
///
/// The parent directory must exist; the result is the canonical parent plus
/// the original filename.
fn validate_output_path(path: &Path) -> Result<PathBuf, SocialError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        SocialError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(SocialError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| SocialError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn print_summaries(rows: &[UserSummary], empty: &str) {
    if rows.is_empty() {
        println!("{}", empty);
    }
    for row in rows {
        println!(" - {} ({})", row.username, row.name);
    }
}

fn print_load_report(json_mode: bool, label: &str, report: &LoadReport) {
    if json_mode {
        print_json(&serde_json::json!({
            "users": report.users,
            "edges": report.edges,
        }));
        return;
    }
    println!(
        "{}: {} users ({} skipped), {} follows edges ({} skipped).",
        label,
        report.users.inserted,
        report.users.skipped,
        report.edges.inserted,
        report.edges.skipped
    );
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &Config) -> Result<(), SocialError> {
    let session = config.open_session()?;
    if config.backend == Backend::File {
        tracing::warn!("File backend: changes made through the API are not written back");
    }

    println!("SocialGraph Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", config.host);
    println!("  Port:     {}", config.port);
    println!("  Backend:  {}", config.backend.as_str());
    println!("  Database: {:?}", config.database);
    println!("  Fulltext: {}", config.fulltext);
    println!();
    println!("Endpoints:");
    println!("  POST  /users                           - Register");
    println!("  POST  /login                           - Login");
    println!("  GET   /users/{{username}}                - Profile");
    println!("  PATCH /users/{{username}}                - Edit profile");
    println!("  POST  /follow, /unfollow               - Relationships");
    println!("  GET   /users/{{username}}/following      - Following");
    println!("  GET   /users/{{username}}/followers      - Followers");
    println!("  GET   /users/{{username}}/recommendations");
    println!("  GET   /mutual?a=&b=                    - Mutual connections");
    println!("  GET   /search?q=                       - Search");
    println!("  GET   /popular                         - Popular users");
    println!("  GET   /status, /health");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", config.host, config.port);
    api::run_server(&addr, session, config).await
}

// =============================================================================
// LIFECYCLE COMMANDS
// =============================================================================

/// Show store status.
pub fn cmd_status(config: &Config, json_mode: bool) -> Result<(), SocialError> {
    let session = config.open_session()?;
    let stats = session.stats();

    if json_mode {
        print_json(&serde_json::json!({
            "database": config.database.to_string_lossy(),
            "backend": config.backend.as_str(),
            "fulltext": session.graph().fulltext_enabled(),
            "user_count": stats.user_count,
            "edge_count": stats.edge_count,
            "indexed_tokens": stats.indexed_tokens,
        }));
        return Ok(());
    }

    println!("SocialGraph Status");
    println!("==================");
    println!("Database: {:?}", config.database);
    println!("Backend:  {}", config.backend.as_str());
    println!("Fulltext: {}", session.graph().fulltext_enabled());
    println!();
    println!("Users:          {}", stats.user_count);
    println!("Follows edges:  {}", stats.edge_count);
    println!("Indexed tokens: {}", stats.indexed_tokens);

    Ok(())
}

/// Initialize new database.
pub fn cmd_init(config: &Config, force: bool) -> Result<(), SocialError> {
    let db_path = &config.database;
    if config.backend == Backend::Memory {
        println!("Memory backend: nothing to initialize");
        return Ok(());
    }
    if db_path.exists() && !force {
        return Err(SocialError::IoError(
            "Database already exists. Use --force to overwrite.".to_string(),
        ));
    }
    if db_path.exists() {
        std::fs::remove_file(db_path)
            .map_err(|e| SocialError::IoError(format!("Remove db: {}", e)))?;
    }

    let session = config.open_session()?;
    config.save_session(&session)?;
    println!(
        "Initialized new {} database at {:?}",
        config.backend.as_str(),
        db_path
    );
    Ok(())
}

/// Delete all users and relationships.
pub fn cmd_reset(config: &Config, force: bool) -> Result<(), SocialError> {
    if !force {
        return Err(SocialError::InvalidFormat(
            "Reset deletes everything. Use --force to confirm.".to_string(),
        ));
    }
    let mut session = config.open_session()?;
    session.reset()?;
    config.save_session(&session)?;
    println!("Deleted all users and relationships.");
    Ok(())
}

// =============================================================================
// ACCOUNT COMMANDS
// =============================================================================

/// Register a user.
pub fn cmd_register(
    config: &Config,
    json_mode: bool,
    username: &str,
    name: &str,
    email: &str,
    bio: &str,
    password: &str,
) -> Result<(), SocialError> {
    let mut session = config.open_session()?;
    let user = session.register(&new_user_with_password(
        username, name, email, bio, password,
    ))?;
    config.save_session(&session)?;

    let profile = user.profile();
    if json_mode {
        print_json(&profile);
    } else {
        println!("Registered: {} ({}) <{}>", profile.username, profile.name, profile.email);
    }
    Ok(())
}

/// Verify a username/password pair.
pub fn cmd_login(
    config: &Config,
    json_mode: bool,
    username: &str,
    password: &str,
) -> Result<(), SocialError> {
    let session = config.open_session()?;
    let profile = login(&session, username, password);

    if json_mode {
        print_json(&serde_json::json!({ "ok": profile.is_some(), "profile": profile }));
        return Ok(());
    }
    match profile {
        Some(p) => println!("Login OK. Welcome, {}!", p.name),
        None => println!("Login failed."),
    }
    Ok(())
}

/// Show a profile.
pub fn cmd_profile(config: &Config, json_mode: bool, username: &str) -> Result<(), SocialError> {
    let session = config.open_session()?;
    let profile = session.profile(username);

    if json_mode {
        print_json(&profile);
        return Ok(());
    }
    match profile {
        Some(p) => {
            println!("username: {}", p.username);
            println!("name: {}", p.name);
            println!("email: {}", p.email);
            println!("bio: {}", p.bio);
            println!("createdAt: {}", p.created_at.millis());
            println!("updatedAt: {}", p.updated_at.millis());
        }
        None => println!("Profile not found."),
    }
    Ok(())
}

/// Edit a profile. Blank values keep the stored field.
pub fn cmd_edit(
    config: &Config,
    json_mode: bool,
    username: &str,
    name: Option<String>,
    email: Option<String>,
    bio: Option<String>,
) -> Result<(), SocialError> {
    let keep_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let update = ProfileUpdate {
        name: keep_blank(name),
        bio: keep_blank(bio),
        email: keep_blank(email),
    };

    let mut session = config.open_session()?;
    let user = session.update(username, &update)?;
    config.save_session(&session)?;

    if json_mode {
        print_json(&user.profile());
    } else {
        println!("Updated: {} ({}) <{}>", user.username, user.name, user.email);
    }
    Ok(())
}

// =============================================================================
// RELATIONSHIP COMMANDS
// =============================================================================

/// Follow a user.
pub fn cmd_follow(config: &Config, json_mode: bool, src: &str, dst: &str) -> Result<(), SocialError> {
    let mut session = config.open_session()?;
    let outcome = session.follow_outcome(src, dst)?;
    config.save_session(&session)?;

    if json_mode {
        print_json(&serde_json::json!({
            "ok": outcome.succeeded(),
            "created": outcome == FollowOutcome::Created,
        }));
        return Ok(());
    }
    match outcome {
        FollowOutcome::Created => println!("Followed."),
        FollowOutcome::AlreadyFollowing => println!("Already following."),
        FollowOutcome::Rejected => println!("Cannot follow yourself."),
    }
    Ok(())
}

/// Unfollow a user.
pub fn cmd_unfollow(
    config: &Config,
    json_mode: bool,
    src: &str,
    dst: &str,
) -> Result<(), SocialError> {
    let mut session = config.open_session()?;
    let removed = session.unfollow(src, dst)?;
    config.save_session(&session)?;

    if json_mode {
        print_json(&serde_json::json!({ "removed": removed }));
    } else {
        println!("Removed {} relationship(s).", removed);
    }
    Ok(())
}

/// List who a user follows.
pub fn cmd_following(
    config: &Config,
    json_mode: bool,
    username: &str,
    limit: usize,
    skip: usize,
) -> Result<(), SocialError> {
    let session = config.open_session()?;
    let rows = session.following(username, limit, skip);
    if json_mode {
        print_json(&rows);
    } else {
        println!("Following:");
        print_summaries(&rows, "(none)");
    }
    Ok(())
}

/// List a user's followers.
pub fn cmd_followers(
    config: &Config,
    json_mode: bool,
    username: &str,
    limit: usize,
    skip: usize,
) -> Result<(), SocialError> {
    let session = config.open_session()?;
    let rows = session.followers(username, limit, skip);
    if json_mode {
        print_json(&rows);
    } else {
        println!("Followers:");
        print_summaries(&rows, "(none)");
    }
    Ok(())
}

/// Users followed by both `a` and `b`.
pub fn cmd_mutual(
    config: &Config,
    json_mode: bool,
    a: &str,
    b: &str,
    limit: usize,
) -> Result<(), SocialError> {
    let session = config.open_session()?;
    let rows = session.mutual_connections(a, b, limit);
    if json_mode {
        print_json(&rows);
    } else {
        print_summaries(&rows, "No mutuals.");
    }
    Ok(())
}

// =============================================================================
// DISCOVERY COMMANDS
// =============================================================================

/// Friend-of-friend recommendations.
pub fn cmd_recommend(
    config: &Config,
    json_mode: bool,
    username: &str,
    limit: usize,
) -> Result<(), SocialError> {
    let session = config.open_session()?;
    let recs = session.recommend(username, limit);
    if json_mode {
        print_json(&recs);
        return Ok(());
    }
    if recs.is_empty() {
        println!("No recommendations.");
    }
    for r in &recs {
        println!(
            " - {} ({}), mutuals={}, followers={}",
            r.username, r.name, r.mutuals, r.followers
        );
    }
    Ok(())
}

/// Search users.
pub fn cmd_search(
    config: &Config,
    json_mode: bool,
    query: &str,
    limit: usize,
) -> Result<(), SocialError> {
    let session = config.open_session()?;
    let results = session.search(query, limit);
    if json_mode {
        print_json(&results);
        return Ok(());
    }
    if results.mode == SearchMode::Substring {
        tracing::debug!(query, "Substring search");
    }
    if results.is_empty() {
        println!("No users found.");
    }
    for hit in &results.hits {
        match hit.score {
            Some(score) => println!(" - {} ({}) score={}", hit.username, hit.name, score),
            None => println!(" - {} ({})", hit.username, hit.name),
        }
    }
    Ok(())
}

/// Users ranked by follower count.
pub fn cmd_popular(config: &Config, json_mode: bool, limit: usize) -> Result<(), SocialError> {
    let session = config.open_session()?;
    let rows = session.popular(limit);
    if json_mode {
        print_json(&rows);
        return Ok(());
    }
    for r in &rows {
        println!(
            " - {} ({}), followers={}",
            r.username, r.name, r.follower_count
        );
    }
    Ok(())
}

// =============================================================================
// LOADER COMMANDS
// =============================================================================

/// Load the demo accounts.
pub fn cmd_seed(config: &Config, json_mode: bool) -> Result<(), SocialError> {
    let mut session = config.open_session()?;
    let report = loaders::seed(&mut session)?;
    config.save_session(&session)?;
    print_load_report(json_mode, "Seeded", &report);
    if !json_mode {
        println!(
            "Test users: alice, bob, carol, dave (password '{}').",
            loaders::SEED_PASSWORD
        );
    }
    Ok(())
}

/// Generate a synthetic graph.
pub fn cmd_synthetic(
    config: &Config,
    json_mode: bool,
    users: usize,
    avg_degree: usize,
    seed: u64,
) -> Result<(), SocialError> {
    let mut session = config.open_session()?;
    let report = loaders::synthetic(&mut session, users, avg_degree, seed)?;
    config.save_session(&session)?;
    print_load_report(json_mode, "Imported synthetic graph", &report);
    Ok(())
}

/// Import an edge list.
pub fn cmd_import_edges(
    config: &Config,
    json_mode: bool,
    edges: &Path,
    profiles: Option<&Path>,
    limits: ImportLimits,
) -> Result<(), SocialError> {
    let edges = validate_file_path(edges)?;
    let mut session = config.open_session()?;
    let report = loaders::import_edges(&mut session, &edges, profiles, limits)?;
    config.save_session(&session)?;
    print_load_report(json_mode, "Imported edge list", &report);
    Ok(())
}

// =============================================================================
// SNAPSHOT COMMANDS
// =============================================================================

/// Export a snapshot.
pub fn cmd_export(config: &Config, output: &Path, format: &str) -> Result<(), SocialError> {
    let validated_output = validate_output_path(output)?;
    let session = config.open_session()?;
    let snapshot = session.snapshot();

    let data = match format {
        "socg" => snapshot_to_bytes(&snapshot)?,
        "json" => serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| SocialError::SerializationError(e.to_string()))?,
        _ => {
            return Err(SocialError::SerializationError(format!(
                "Unknown format: {}. Use: socg, json",
                format
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| SocialError::IoError(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

/// Decode a SOCG snapshot, falling back to JSON.
fn decode_snapshot(data: &[u8]) -> Result<SerializableGraph, SocialError> {
    match snapshot_from_bytes(data) {
        Ok(snapshot) => Ok(snapshot),
        Err(socg_err) => serde_json::from_slice::<SerializableGraph>(data).map_err(|_| {
            SocialError::SerializationError(format!("Could not parse snapshot: {}", socg_err))
        }),
    }
}

/// Replace all content with a snapshot.
pub fn cmd_import(config: &Config, input: &Path) -> Result<(), SocialError> {
    let validated_path = validate_file_path(input)?;
    let data = read_snapshot_file(&validated_path)?;
    let snapshot = decode_snapshot(&data)?;

    let mut session: Session = config.open_session()?;
    let stats = session.restore(snapshot)?;
    config.save_session(&session)?;

    println!(
        "Imported snapshot: {} users, {} follows edges",
        stats.user_count, stats.edge_count
    );
    Ok(())
}
