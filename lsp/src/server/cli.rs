use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use jsonnet_core::token::Position;
use url::Url;

use crate::analyzer::{JsonnetAnalyzer, MemoryDocuments};

use super::config::ServerConfig;

const USAGE: &str = "Usage: jsonnet-lsp [--check <file> | --hover <file> <line> <col> | --complete <file> <line> <col>]
  --check <file>                  : Parse the file and report the first error
  --hover <file> <line> <col>     : Print hover information as JSON
  --complete <file> <line> <col>  : Print completion suggestions as JSON
Lines and columns are 1-based. Without arguments the server speaks LSP on stdio.";

enum Command {
    Check,
    Hover,
    Complete,
}

/// Runs a one-shot command when the arguments ask for one. `None` means the
/// server should start.
pub(crate) fn try_cli_analyze() -> anyhow::Result<Option<String>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    run_command(&args)
}

pub(crate) fn run_command(args: &[String]) -> anyhow::Result<Option<String>> {
    let Some(flag) = args.first() else {
        return Ok(None);
    };
    let command = match flag.as_str() {
        "--check" => Command::Check,
        "--hover" => Command::Hover,
        "--complete" => Command::Complete,
        "--help" | "-h" => return Ok(Some(USAGE.to_string())),
        other => bail!("unknown argument '{}'\n{}", other, USAGE),
    };

    let path = args.get(1).ok_or_else(|| anyhow!("missing file\n{}", USAGE))?;
    let (analyzer, uri) = load(path)?;

    let output = match command {
        Command::Check => {
            let result = analyzer.compile(&uri).ok_or_else(|| anyhow!("'{}' was not loaded", path))?;
            match result.error() {
                Some(err) => format!("{}: {}", path, err),
                None => format!("{}: ok", path),
            }
        }
        Command::Hover => {
            let pos = position(args)?;
            serde_json::to_string_pretty(&analyzer.hover(&uri, pos))?
        }
        Command::Complete => {
            let pos = position(args)?;
            serde_json::to_string_pretty(&analyzer.complete(&uri, pos))?
        }
    };
    Ok(Some(output))
}

fn load(path: &str) -> anyhow::Result<(JsonnetAnalyzer, Url)> {
    let file = PathBuf::from(path)
        .canonicalize()
        .with_context(|| format!("Failed to resolve '{}'", path))?;
    let content = std::fs::read_to_string(&file).with_context(|| format!("Failed to read file '{}'", path))?;
    let uri = Url::from_file_path(&file).map_err(|_| anyhow!("'{}' is not a valid file path", file.display()))?;

    let documents = Arc::new(MemoryDocuments::default());
    documents.insert(uri.clone(), content, 1);
    let analyzer = JsonnetAnalyzer::new(documents);
    analyzer.set_jpath(ServerConfig::default().jpath);
    Ok((analyzer, uri))
}

fn position(args: &[String]) -> anyhow::Result<Position> {
    let number = |i: usize, what: &str| -> anyhow::Result<u32> {
        let raw = args.get(i).ok_or_else(|| anyhow!("missing {}\n{}", what, USAGE))?;
        raw.parse::<u32>()
            .with_context(|| format!("{} must be a positive number, got '{}'", what, raw))
    };
    Ok(Position::at(number(2, "line")?, number(3, "column")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_arguments_starts_server() {
        assert!(run_command(&[]).unwrap().is_none());
    }

    #[test]
    fn test_check_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.jsonnet");
        let bad = dir.path().join("bad.jsonnet");
        fs::write(&good, "{ a: 1 }").unwrap();
        fs::write(&bad, "{ a: 1, a: 2 }").unwrap();

        let out = run_command(&args(&["--check", good.to_str().unwrap()])).unwrap().unwrap();
        assert!(out.ends_with(": ok"));
        let out = run_command(&args(&["--check", bad.to_str().unwrap()])).unwrap().unwrap();
        assert!(out.contains("Duplicate field: a"));
    }

    #[test]
    fn test_hover_and_complete_print_json() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.jsonnet");
        fs::write(&file, "local greeting = 'hi';\ngr").unwrap();
        let path = file.to_str().unwrap();

        let out = run_command(&args(&["--complete", path, "2", "3"])).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json[0]["label"], "greeting");
        assert_eq!(json[0]["kind"], "Variable");

        let out = run_command(&args(&["--hover", path, "2", "1"])).unwrap().unwrap();
        assert_eq!(out, "null");
    }

    #[test]
    fn test_bad_arguments() {
        assert!(run_command(&args(&["--frobnicate"])).is_err());
        assert!(run_command(&args(&["--check"])).is_err());
        assert!(run_command(&args(&["--check", "/definitely/not/here.jsonnet"])).is_err());
    }
}
