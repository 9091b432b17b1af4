use crate::console::Console;
use crate::error::{ErrorKind, Result};
use axum::Router;
use axum::extract::{Path as UrlPath, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use clap::Args;
use exn::ResultExt;
use kure_archive::confine_name;
use kure_workspace::{Layout, Workspace};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;

/// Name of the repository archive CKAN clients are pointed at.
const ARCHIVE: &str = "main.tar.gz";

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (default: `port` from the configuration, 8000)
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub fn run(args: &ServeArgs, workspace: &Workspace, console: &Console) -> Result<()> {
    let layout = workspace.layout();
    let port = args.port.unwrap_or(workspace.config().port);

    console.detail("Adding files from local/ckan");
    let archive = pack_local_ckan(layout)?;
    console.detail(format_args!("Created {}", archive.display()));

    let name = layout.root().file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
    console.done("Starting server, CTRL-C to stop. Address:");
    console.plain(format_args!("{name} | http://localhost:{port}/{ARCHIVE}"));
    console.done("Paste it into CKAN Settings > New");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .or_raise(|| ErrorKind::Serve(port))?;
    runtime.block_on(serve(layout.server_dir(), port))
}

/// Pack every top-level entry of `local/ckan` into the served archive.
fn pack_local_ckan(layout: &Layout) -> Result<PathBuf> {
    let local_ckan = layout.local_ckan();
    let archive = layout.server_dir().join(ARCHIVE);
    let mut entries = fs::read_dir(&local_ckan)
        .and_then(|entries| entries.map(|entry| entry.map(|entry| entry.path())).collect::<io::Result<Vec<_>>>())
        .or_raise(|| ErrorKind::Read(local_ckan.clone()))?;
    entries.sort();
    kure_archive::pack(&archive, &entries).or_raise(|| ErrorKind::Pack(archive.clone()))?;
    Ok(archive)
}

fn router(dir: PathBuf) -> Router {
    Router::new().route("/:file", get(serve_file)).with_state(Arc::new(dir))
}

#[instrument(skip(dir))]
async fn serve(dir: PathBuf, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await.or_raise(|| ErrorKind::Serve(port))?;
    tracing::info!(dir = %dir.display(), "Listening");
    axum::serve(listener, router(dir)).await.or_raise(|| ErrorKind::Serve(port))
}

/// A single file of the served directory; anything that isn't a plain file
/// name inside it is not found.
async fn serve_file(State(dir): State<Arc<PathBuf>>, UrlPath(file): UrlPath<String>) -> Response {
    let Ok(name) = confine_name(&file) else {
        tracing::debug!(%file, "Rejected request path");
        return StatusCode::NOT_FOUND.into_response();
    };
    match tokio::fs::read(dir.join(name)).await {
        Ok(body) => {
            tracing::info!(%file, bytes = body.len(), "Served");
            ([(header::CONTENT_TYPE, content_type(&file))], body).into_response()
        },
        Err(err) if err.kind() == io::ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            tracing::warn!(%file, error = %err, "Could not read served file");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

fn content_type(file: &str) -> &'static str {
    match file.rsplit_once('.').map(|(_, extension)| extension) {
        Some("gz" | "tgz") => "application/gzip",
        Some("tar") => "application/x-tar",
        Some("ckan" | "netkan" | "json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::testing::{workspace, write};
    use rstest::rstest;

    #[test]
    fn test_pack_local_ckan() {
        let (temp, workspace) = workspace();
        let layout = workspace.layout();
        write(&layout.local_ckan().join("Foo-1.0.ckan"), r#"{"identifier": "Foo"}"#);
        write(&layout.local_ckan().join("Bar/Bar-2.0.ckan"), r#"{"identifier": "Bar"}"#);

        let archive = pack_local_ckan(layout).unwrap();
        assert_eq!(archive, layout.server_dir().join("main.tar.gz"));

        let extracted = temp.path().join("extracted");
        let stats = kure_archive::unpack(&extracted, fs::File::open(&archive).unwrap()).unwrap();
        assert_eq!(stats.files, 2);
        assert!(extracted.join("Foo-1.0.ckan").is_file());
        assert!(extracted.join("Bar/Bar-2.0.ckan").is_file());
    }

    #[tokio::test]
    async fn test_serves_files_of_the_directory() {
        let (_temp, workspace) = workspace();
        let dir = workspace.layout().server_dir();
        write(&dir.join("main.tar.gz"), "archive");
        write(&workspace.root().join("kure-secret.txt"), "secret");
        let state = Arc::new(dir);

        let response = serve_file(State(state.clone()), UrlPath("main.tar.gz".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/gzip");

        let response = serve_file(State(state.clone()), UrlPath("missing.tar.gz".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = serve_file(State(state), UrlPath("../../kure-secret.txt".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[case("main.tar.gz", "application/gzip")]
    #[case("Foo-1.0.ckan", "application/json")]
    #[case("README", "application/octet-stream")]
    fn test_content_type(#[case] file: &str, #[case] expected: &str) {
        assert_eq!(content_type(file), expected);
    }
}
