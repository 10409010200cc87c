use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

// Nothing listens on the discard port, so provider calls fail fast
const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

#[allow(dead_code)]
pub struct TestContext {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
    pub install_root: PathBuf,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.json");
        let install_root = temp_dir.path().join("World of Warcraft");
        fs::create_dir_all(install_root.join("Interface").join("AddOns"))
            .expect("Failed to create addon directory");

        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_wadman"));

        Self {
            temp_dir,
            config_path,
            install_root,
            bin_path,
        }
    }

    pub fn addons_dir(&self) -> PathBuf {
        self.install_root.join("Interface").join("AddOns")
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.env("WADMAN_CONFIG", &self.config_path);
        cmd.env("WADMAN_INSTALL_PATH", &self.install_root);
        cmd.env("WADMAN_CURSEFORGE_URL", UNREACHABLE_URL);
        cmd.env("WADMAN_WOWINTERFACE_URL", UNREACHABLE_URL);
        cmd.env_remove("RUST_LOG");
        cmd.env_remove("WADMAN_FLAVOR");
        cmd.env_remove("WADMAN_CHANNEL");
        // Keep auto-detection away from the real home directory
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("XDG_CONFIG_HOME", self.temp_dir.path().join("config"));
        cmd
    }

    pub fn run(&self, args: &[&str]) -> CommandOutput {
        self.cmd()
            .args(args)
            .output()
            .expect("Failed to run wadman")
            .into()
    }

    pub fn write_config(&self, config: &serde_json::Value) {
        fs::write(
            &self.config_path,
            serde_json::to_string_pretty(config).expect("Failed to encode config"),
        )
        .expect("Failed to write config");
    }

    pub fn read_config(&self) -> serde_json::Value {
        let content = fs::read_to_string(&self.config_path).expect("Failed to read config");
        serde_json::from_str(&content).expect("Config is not valid JSON")
    }

    pub fn add_addon_dir(&self, name: &str, toc: &str) {
        let dir = self.addons_dir().join(name);
        fs::create_dir_all(&dir).expect("Failed to create addon dir");
        fs::write(dir.join(format!("{}.toc", name)), toc).expect("Failed to write toc");
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
        if self.status.success() {
            panic!(
                "Command unexpectedly succeeded\nstdout: {}\nstderr: {}",
                self.stdout, self.stderr
            );
        }
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
