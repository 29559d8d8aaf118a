use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;
use zip::write::FileOptions;

// Each test binary only uses part of these helpers
#[allow(dead_code)]
pub struct TestContext {
    pub _temp_dir: TempDir,
    pub config_path: PathBuf,
    pub install_dir: PathBuf,
    pub work_dir: PathBuf,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config").join("config.json");
        let install_dir = temp_dir.path().join("game");
        let work_dir = temp_dir.path().join("work");
        std::fs::create_dir_all(&install_dir).expect("Failed to create install dir");
        std::fs::create_dir_all(&work_dir).expect("Failed to create work dir");

        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_packup"));

        Self {
            _temp_dir: temp_dir,
            config_path,
            install_dir,
            work_dir,
            bin_path,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.env("PACKUP_CONFIG", &self.config_path);
        cmd.env("PACKUP_INSTALL_DIR", &self.install_dir);
        cmd.env("PACKUP_WORK_DIR", &self.work_dir);
        cmd.env_remove("PACKUP_SOURCE");
        cmd.env_remove("RUST_LOG");
        cmd.env("HOME", self._temp_dir.path());
        cmd.env("XDG_CONFIG_HOME", self._temp_dir.path().join("xdg-config"));
        cmd
    }
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_failure(&self) -> &Self {
        assert!(
            !self.status.success(),
            "Command unexpectedly succeeded\nstdout: {}\nstderr: {}",
            self.stdout,
            self.stderr
        );
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Stderr did not contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}

/// Build a zip archive in memory. `None` content adds a directory entry.
#[allow(dead_code)]
pub fn build_zip(entries: &[(&str, Option<&str>)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        match content {
            Some(text) => {
                zip.start_file(*name, FileOptions::default())
                    .expect("Failed to start zip entry");
                zip.write_all(text.as_bytes())
                    .expect("Failed to write zip entry");
            }
            None => zip
                .add_directory(*name, FileOptions::default())
                .expect("Failed to add zip directory"),
        }
    }
    zip.finish().expect("Failed to finish zip").into_inner()
}

/// Release feed document with the given assets, each served under `base_url`.
#[allow(dead_code)]
pub fn release_json(tag: &str, base_url: &str, asset_names: &[&str]) -> serde_json::Value {
    let assets: Vec<serde_json::Value> = asset_names
        .iter()
        .map(|name| {
            serde_json::json!({
                "name": name,
                "browser_download_url": format!("{}/download/{}", base_url, name),
            })
        })
        .collect();
    serde_json::json!({ "tag_name": tag, "assets": assets })
}
