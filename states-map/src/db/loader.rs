//! Chargement d'un shapefile par `shp2pgsql`

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{AppError, Result};

/// Sortie d'un outil externe
#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

/// Exécute un outil externe et collecte ses sorties
pub async fn run_tool<I, S>(program: &Path, args: I) -> Result<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let tool = program.display().to_string();
    debug!(tool = %tool, "Running external tool");

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| AppError::external(&tool, format!("cannot run: {}", e)))?;

    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        status: output.status,
    })
}

/// Arguments de `shp2pgsql` : SRID 4326, index spatial
pub fn shp2pgsql_args(shp_path: &Path, table: &str) -> Vec<OsString> {
    vec![
        "-s".into(),
        "4326".into(),
        "-I".into(),
        shp_path.as_os_str().to_owned(),
        table.into(),
    ]
}

/// Génère le script SQL de chargement d'un shapefile
pub async fn shp2pgsql(program: &Path, shp_path: &Path, table: &str) -> Result<String> {
    let output = run_tool(program, shp2pgsql_args(shp_path, table)).await?;

    if output.stdout.trim().is_empty() {
        return Err(AppError::external(
            "shp2pgsql",
            format!("cannot upload file to database: {}", output.stderr.trim()),
        ));
    }
    if !output.status.success() {
        return Err(AppError::external(
            "shp2pgsql",
            format!("exited with {}: {}", output.status, output.stderr.trim()),
        ));
    }
    if !output.stderr.trim().is_empty() {
        warn!(stderr = %output.stderr.trim(), "shp2pgsql reported messages");
    }

    Ok(wrap_in_transaction(&output.stdout))
}

/// Encadre le script par BEGIN/COMMIT s'il n'en contient pas
pub fn wrap_in_transaction(sql: &str) -> String {
    let has_begin = sql.lines().any(|line| {
        let line = line.trim().trim_end_matches(';').trim();
        line.eq_ignore_ascii_case("begin") || line.eq_ignore_ascii_case("begin transaction")
    });

    if has_begin {
        sql.to_string()
    } else {
        format!("BEGIN;\n{}\nCOMMIT;\n", sql.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shp2pgsql_args() {
        let args = shp2pgsql_args(Path::new("/tmp/states/states.shp"), "exercise.states");
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["-s", "4326", "-I", "/tmp/states/states.shp", "exercise.states"]
        );
    }

    #[test]
    fn test_wrap_in_transaction() {
        let script = "SET CLIENT_ENCODING TO UTF8;\nBEGIN;\nCREATE TABLE t (gid serial);\nCOMMIT;\n";
        assert_eq!(wrap_in_transaction(script), script);

        let bare = "CREATE TABLE t (gid serial);\nINSERT INTO t DEFAULT VALUES;\n";
        let wrapped = wrap_in_transaction(bare);
        assert!(wrapped.starts_with("BEGIN;\n"));
        assert!(wrapped.ends_with("COMMIT;\n"));
        assert!(wrapped.contains("INSERT INTO t"));
    }

    #[tokio::test]
    async fn test_run_tool_missing_program() {
        let err = run_tool(Path::new("/nonexistent/shp2pgsql"), ["-?"])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ExternalTool);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_collects_output() {
        let output = run_tool(Path::new("sh"), ["-c", "echo out; echo err >&2"])
            .await
            .unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shp2pgsql_empty_output_is_error() {
        // `true` n'écrit rien sur stdout
        let err = shp2pgsql(Path::new("true"), Path::new("states.shp"), "exercise.states")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ExternalTool);
        assert!(err.to_string().contains("cannot upload file to database"));
    }
}
