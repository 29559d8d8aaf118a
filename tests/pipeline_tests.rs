mod common;

use common::{build_zip, release_json};
use packup::pipeline::{InstallEvent, InstallOutcome, InstallPipeline, InstallRequest};
use packup::release::build_client;
use packup::session::{Session, SessionError};
use packup::types::MergeMode;
use packup::version::VERSION_MARKER;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    server: MockServer,
    _root: TempDir,
    install_dir: PathBuf,
    work_dir: PathBuf,
}

impl Fixture {
    async fn new() -> Self {
        let root = TempDir::new().unwrap();
        let install_dir = root.path().join("game");
        let work_dir = root.path().join("work");
        fs::create_dir_all(&install_dir).unwrap();
        fs::create_dir_all(&work_dir).unwrap();
        Self {
            server: MockServer::start().await,
            _root: root,
            install_dir,
            work_dir,
        }
    }

    /// Serve a release `tag` whose single asset `pack.zip` is `archive`.
    async fn serve_release(&self, tag: &str, archive: Vec<u8>) {
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(release_json(tag, &self.server.uri(), &["pack.zip"])),
            )
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download/pack.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
            .mount(&self.server)
            .await;
    }

    fn request(&self) -> InstallRequest {
        InstallRequest {
            feed_url: format!("{}/feed", self.server.uri()),
            install_dir: self.install_dir.clone(),
            work_dir: self.work_dir.clone(),
            merge_mode: MergeMode::Replace,
            feed_timeout: Duration::from_secs(5),
        }
    }

    async fn run(&self, request: InstallRequest) -> (InstallOutcome, Vec<InstallEvent>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = InstallPipeline::new(build_client().unwrap(), request, tx)
            .run()
            .await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        (outcome, events)
    }

    fn assert_work_dir_clean(&self) {
        let leftovers: Vec<_> = fs::read_dir(&self.work_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(leftovers.is_empty(), "work dir not cleaned: {:?}", leftovers);
    }
}

fn logs(events: &[InstallEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            InstallEvent::Log(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_install_wrapped_archive_succeeds() {
    let fx = Fixture::new().await;
    fs::write(fx.install_dir.join(VERSION_MARKER), "v2.0.0").unwrap();
    fx.serve_release(
        "v2.1.0",
        build_zip(&[
            ("pack/", None),
            ("pack/options.txt", Some("opts")),
            ("pack/servers.dat", Some("servers")),
            ("pack/readme.md", Some("readme")),
            ("pack/mods/", None),
            ("pack/mods/a.jar", Some("a")),
        ]),
    )
    .await;

    let (outcome, events) = fx.run(fx.request()).await;

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.message, "Successfully installed 4 items");
    assert_eq!(outcome.version.as_deref(), Some("v2.1.0"));
    assert_eq!(read(&fx.install_dir.join(VERSION_MARKER)), "v2.1.0");

    // The wrapping folder is collapsed
    assert_eq!(read(&fx.install_dir.join("options.txt")), "opts");
    assert_eq!(read(&fx.install_dir.join("mods/a.jar")), "a");
    assert!(!fx.install_dir.join("pack").exists());

    let lines = logs(&events);
    assert!(lines.contains(&"Downloading v2.1.0".to_string()));
    assert!(lines.contains(&"Copying from: pack".to_string()));
    assert!(lines.contains(&"Folder: mods".to_string()));
    assert!(lines.contains(&"File: options.txt".to_string()));

    assert!(events.contains(&InstallEvent::Progress(100)));
    assert_eq!(events.last(), Some(&InstallEvent::Finished(outcome.clone())));

    fx.assert_work_dir_clean();
}

#[tokio::test]
async fn test_install_flat_archive_uses_staging_root() {
    let fx = Fixture::new().await;
    fx.serve_release(
        "v1.0.0",
        build_zip(&[("config/", None), ("config/a.cfg", Some("a")), ("options.txt", Some("o"))]),
    )
    .await;

    let (outcome, _) = fx.run(fx.request()).await;

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.message, "Successfully installed 2 items");
    assert_eq!(read(&fx.install_dir.join("config/a.cfg")), "a");
    assert_eq!(read(&fx.install_dir.join("options.txt")), "o");
    fx.assert_work_dir_clean();
}

#[tokio::test]
async fn test_single_top_level_file_is_not_collapsed() {
    let fx = Fixture::new().await;
    fx.serve_release("v1.0.0", build_zip(&[("only.txt", Some("x"))])).await;

    let (outcome, _) = fx.run(fx.request()).await;

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(read(&fx.install_dir.join("only.txt")), "x");
}

#[tokio::test]
async fn test_missing_target_aborts_without_writes() {
    let fx = Fixture::new().await;
    fx.serve_release("v1.0.0", build_zip(&[("options.txt", Some("o"))])).await;

    let mut request = fx.request();
    request.install_dir = fx.install_dir.join("does-not-exist");

    let (outcome, events) = fx.run(request.clone()).await;

    assert!(!outcome.success);
    assert!(outcome.version.is_none());
    assert!(outcome.message.starts_with("install directory not found"));
    assert!(!request.install_dir.exists());
    assert!(!logs(&events).iter().any(|l| l == "Extracting"));
    fx.assert_work_dir_clean();
}

#[tokio::test]
async fn test_colliding_folder_is_replaced() {
    let fx = Fixture::new().await;
    fs::create_dir_all(fx.install_dir.join("mods")).unwrap();
    fs::write(fx.install_dir.join("mods/stale.jar"), "stale").unwrap();
    fx.serve_release(
        "v3.0.0",
        build_zip(&[("mods/", None), ("mods/fresh.jar", Some("fresh")), ("options.txt", Some("o"))]),
    )
    .await;

    let (outcome, _) = fx.run(fx.request()).await;

    assert!(outcome.success, "{}", outcome.message);
    assert!(fx.install_dir.join("mods/fresh.jar").exists());
    assert!(!fx.install_dir.join("mods/stale.jar").exists());
}

#[tokio::test]
async fn test_merge_mode_keeps_destination_files() {
    let fx = Fixture::new().await;
    fs::create_dir_all(fx.install_dir.join("mods")).unwrap();
    fs::write(fx.install_dir.join("mods/local.jar"), "mine").unwrap();
    fx.serve_release(
        "v3.0.0",
        build_zip(&[("mods/", None), ("mods/fresh.jar", Some("fresh")), ("options.txt", Some("o"))]),
    )
    .await;

    let mut request = fx.request();
    request.merge_mode = MergeMode::Merge;
    let (outcome, _) = fx.run(request).await;

    assert!(outcome.success, "{}", outcome.message);
    assert!(fx.install_dir.join("mods/fresh.jar").exists());
    assert_eq!(read(&fx.install_dir.join("mods/local.jar")), "mine");
}

#[tokio::test]
async fn test_one_failing_item_still_succeeds() {
    let fx = Fixture::new().await;
    // A directory where a file should land makes that copy fail
    fs::create_dir_all(fx.install_dir.join("blocked.cfg")).unwrap();
    fx.serve_release(
        "v1.2.0",
        build_zip(&[("blocked.cfg", Some("x")), ("fine.cfg", Some("y"))]),
    )
    .await;

    let (outcome, events) = fx.run(fx.request()).await;

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.message, "Successfully installed 1 items");
    assert!(logs(&events).iter().any(|l| l.starts_with("Error: blocked.cfg")));
    assert_eq!(read(&fx.install_dir.join(VERSION_MARKER)), "v1.2.0");
    fx.assert_work_dir_clean();
}

#[tokio::test]
async fn test_every_item_failing_is_a_failure() {
    let fx = Fixture::new().await;
    fs::create_dir_all(fx.install_dir.join("blocked.cfg")).unwrap();
    fs::write(fx.install_dir.join(VERSION_MARKER), "v1.0.0").unwrap();
    fx.serve_release("v1.1.0", build_zip(&[("blocked.cfg", Some("x"))])).await;

    let (outcome, _) = fx.run(fx.request()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "no files found to install");
    // No version bump without installed items
    assert_eq!(read(&fx.install_dir.join(VERSION_MARKER)), "v1.0.0");
    fx.assert_work_dir_clean();
}

#[tokio::test]
async fn test_empty_effective_root_is_a_failure() {
    let fx = Fixture::new().await;
    fx.serve_release("v1.0.0", build_zip(&[("empty/", None)])).await;

    let (outcome, _) = fx.run(fx.request()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "no files found to install");
    assert!(!fx.install_dir.join(VERSION_MARKER).exists());
    fx.assert_work_dir_clean();
}

#[tokio::test]
async fn test_feed_error_reports_connection_error() {
    let fx = Fixture::new().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&fx.server)
        .await;

    let (outcome, events) = fx.run(fx.request()).await;

    assert!(!outcome.success);
    assert!(outcome.message.starts_with("connection error"));
    assert_eq!(events.len(), 1);
    fx.assert_work_dir_clean();
}

#[tokio::test]
async fn test_release_without_zip_reports_no_archive() {
    let fx = Fixture::new().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(release_json("v1.0.0", &fx.server.uri(), &["pack.tar.gz"])),
        )
        .mount(&fx.server)
        .await;

    let (outcome, _) = fx.run(fx.request()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "no archive found in release v1.0.0");
}

#[tokio::test]
async fn test_corrupt_archive_is_cleaned_up() {
    let fx = Fixture::new().await;
    fx.serve_release("v1.0.0", b"this is not a zip file".to_vec()).await;

    let (outcome, _) = fx.run(fx.request()).await;

    assert!(!outcome.success);
    assert!(outcome.message.contains("not a valid zip archive"), "{}", outcome.message);
    fx.assert_work_dir_clean();
}

#[tokio::test]
async fn test_session_allows_one_install_at_a_time() {
    let fx = Fixture::new().await;
    fx.serve_release("v5.0.0", build_zip(&[("options.txt", Some("o"))])).await;

    let mut session = Session::new();
    assert!(!session.is_busy());
    session.start(build_client().unwrap(), fx.request()).unwrap();
    assert!(session.is_busy());
    assert_eq!(
        session.start(build_client().unwrap(), fx.request()),
        Err(SessionError::Busy)
    );

    let mut seen = Vec::new();
    let outcome = session.wait(|event| seen.push(event.clone())).await.unwrap();

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.version.as_deref(), Some("v5.0.0"));
    assert!(!session.is_busy());
    assert!(seen.iter().all(|e| !matches!(e, InstallEvent::Finished(_))));
    assert!(session.next_event().await.is_none());
}

#[tokio::test]
async fn test_session_refuses_empty_install_dir() {
    let fx = Fixture::new().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&fx.server)
        .await;

    let mut request = fx.request();
    request.install_dir = PathBuf::new();

    let mut session = Session::new();
    assert_eq!(
        session.start(build_client().unwrap(), request),
        Err(SessionError::NoInstallDir)
    );
    assert!(!session.is_busy());
    assert!(session.next_event().await.is_none());
    fx.assert_work_dir_clean();
}
