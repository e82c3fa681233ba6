use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// TestHarness provides an isolated fabrica project: a `features/`
/// directory, a `.fabrica/config.md` and a private `HOME` so no global
/// configuration leaks in.
pub struct TestHarness {
    pub dir: TempDir,
    pub features_dir: PathBuf,
    pub config_path: PathBuf,
    pub fabrica_binary: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base_path = temp_dir.path();

        let features_dir = base_path.join("features");
        let config_path = base_path.join(".fabrica/config.md");
        fs::create_dir_all(&features_dir).expect("Failed to create features dir");
        fs::create_dir_all(base_path.join(".fabrica")).expect("Failed to create .fabrica dir");
        fs::create_dir_all(base_path.join("home")).expect("Failed to create home dir");

        let default_config = r#"---
project:
  name: harness
features:
  config_path: features
  config_name: features
---

# Project Config
"#;
        fs::write(&config_path, default_config).expect("Failed to write config");

        TestHarness {
            dir: temp_dir,
            features_dir,
            config_path,
            fabrica_binary: PathBuf::from(env!("CARGO_BIN_EXE_fabrica")),
        }
    }

    /// Creates a test harness with custom config content.
    pub fn with_config(config_content: &str) -> Self {
        let harness = Self::new();
        fs::write(&harness.config_path, config_content).expect("Failed to write custom config");
        harness
    }

    /// Returns the base directory path (the TempDir path).
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `features/<name>.yaml`.
    pub fn write_definitions(&self, name: &str, yaml: &str) {
        fs::write(self.features_dir.join(format!("{}.yaml", name)), yaml)
            .expect("Failed to write definition file");
    }

    /// Write a data file in the project root and return its path.
    pub fn write_data(&self, name: &str, json: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, json).expect("Failed to write data file");
        path
    }

    /// Executes the fabrica binary with the given arguments in the harness directory.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(&self.fabrica_binary)
            .args(args)
            .current_dir(self.path())
            .env("HOME", self.path().join("home"))
            .env("NO_COLOR", "1")
            .env_remove("FABRICA_QUIET")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run fabrica")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
