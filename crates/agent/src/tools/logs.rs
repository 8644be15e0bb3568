//! Log inspection tools

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

use super::path_utils::resolve_log_path;
use super::{ToolClass, ToolTrait};

type ToolResult = Result<String, Box<dyn std::error::Error + Send + Sync>>;

/// Lists the `*.log` files in the log directory
pub struct ListLogFilesTool {
    log_dir: PathBuf,
}

impl ListLogFilesTool {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }
}

#[async_trait]
impl ToolTrait for ListLogFilesTool {
    fn name(&self) -> &str {
        "list_log_files"
    }
    fn description(&self) -> &str {
        "List all available log files in the logs directory with their sizes."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }
    fn class(&self) -> ToolClass {
        ToolClass::AutoExecute
    }
    async fn execute(&self, _args: serde_json::Value) -> ToolResult {
        let dir = self.log_dir.display();
        if !self.log_dir.is_dir() {
            return Err(format!("Log directory '{}' does not exist", dir).into());
        }

        debug!("Listing log files in {:?}", self.log_dir);
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.log_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = entry.metadata().await?;
            if metadata.is_file() && path.extension().is_some_and(|ext| ext == "log") {
                files.push((entry.file_name().to_string_lossy().into_owned(), metadata.len()));
            }
        }

        if files.is_empty() {
            return Ok(format!("No .log files found in {}/ directory", dir));
        }

        files.sort();
        let mut result = format!("Available log files in {}/:\n\n", dir);
        for (name, size) in files {
            result.push_str(&format!("  - {} ({:.2} KB)\n", name, size as f64 / 1024.0));
        }
        Ok(result)
    }
}

#[derive(Deserialize)]
struct ReadLogArgs {
    filename: String,
}

/// Reads one log file with a size and line-count header
pub struct ReadLogFileTool {
    log_dir: PathBuf,
}

impl ReadLogFileTool {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }
}

#[async_trait]
impl ToolTrait for ReadLogFileTool {
    fn name(&self) -> &str {
        "read_log_file"
    }
    fn description(&self) -> &str {
        "Read contents of a log file from the logs directory."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Name of the log file (e.g., 'app.log', 'error.log')"
                }
            },
            "required": ["filename"]
        })
    }
    fn class(&self) -> ToolClass {
        ToolClass::AutoExecute
    }
    async fn execute(&self, args: serde_json::Value) -> ToolResult {
        let args: ReadLogArgs = serde_json::from_value(args)?;
        let content = read_log(&args.filename, &self.log_dir).await?;

        let line_count = content.matches('\n').count() + 1;
        Ok(format!(
            "File: {}\nSize: {} bytes\nLines: {}\n\n{}",
            args.filename,
            content.len(),
            line_count,
            content
        ))
    }
}

#[derive(Deserialize)]
struct SearchLogsArgs {
    filename: String,
    search_term: String,
}

/// Case-insensitive substring search over one log file
pub struct SearchLogsTool {
    log_dir: PathBuf,
}

impl SearchLogsTool {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }
}

#[async_trait]
impl ToolTrait for SearchLogsTool {
    fn name(&self) -> &str {
        "search_logs"
    }
    fn description(&self) -> &str {
        "Search for a specific term in a log file and return matching lines with line numbers."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "filename": { "type": "string", "description": "Name of the log file to search" },
                "search_term": {
                    "type": "string",
                    "description": "Term to search for (case-insensitive)"
                }
            },
            "required": ["filename", "search_term"]
        })
    }
    fn class(&self) -> ToolClass {
        ToolClass::AutoExecute
    }
    async fn execute(&self, args: serde_json::Value) -> ToolResult {
        let args: SearchLogsArgs = serde_json::from_value(args)?;
        let content = read_log(&args.filename, &self.log_dir).await?;

        let needle = args.search_term.to_lowercase();
        let matches: Vec<String> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| line.to_lowercase().contains(&needle))
            .map(|(i, line)| format!("Line {}: {}", i + 1, line.trim_end()))
            .collect();

        debug!(
            "{} matches for {:?} in {}",
            matches.len(),
            args.search_term,
            args.filename
        );

        if matches.is_empty() {
            return Ok(format!(
                "No matches found for '{}' in {}",
                args.search_term, args.filename
            ));
        }

        Ok(format!(
            "Found {} matches for '{}' in {}:\n\n{}",
            matches.len(),
            args.search_term,
            args.filename,
            matches.join("\n")
        ))
    }
}

async fn read_log(filename: &str, log_dir: &std::path::Path) -> Result<String, String> {
    let path = resolve_log_path(filename, log_dir)
        .await
        .map_err(|e| e.to_string())?;

    debug!("Reading log file {:?}", path);
    tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => format!(
            "Log file '{}' not found in {}/ directory",
            filename,
            log_dir.display()
        ),
        ErrorKind::PermissionDenied => format!("Permission denied reading '{}'", filename),
        _ => format!("could not read '{}': {}", filename, e),
    })
}
