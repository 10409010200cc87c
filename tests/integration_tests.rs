mod common;

use common::TestContext;
use serde_json::json;
use std::fs;

#[test]
fn test_help_and_version() {
    let ctx = TestContext::new();

    ctx.run(&["--help"])
        .assert_success()
        .assert_stdout_contains("A CLI addon manager for World of Warcraft")
        .assert_stdout_contains("Usage: wadman");

    ctx.run(&["version"])
        .assert_success()
        .assert_stdout_contains("wadman");
}

#[test]
fn test_list_without_config() {
    let ctx = TestContext::new();

    ctx.run(&["list"])
        .assert_success()
        .assert_stdout_contains("--- Installed Addons ---")
        .assert_stdout_contains("No addons installed yet.");
    assert!(!ctx.config_path.exists());
}

#[test]
fn test_migrate_legacy_config() {
    let ctx = TestContext::new();
    ctx.write_config(&json!({
        "install_path": ctx.addons_dir(),
        "addons": [
            {
                "id": 61284,
                "name": "Details! Damage Meter",
                "file_id": 2934567,
                "version": "DetailsRetail.8.2.0",
                "directories": ["Details", "Details_Compare"]
            },
            {
                "id": 3358,
                "title": "Never installed",
                "file_id": 0,
                "directories": null
            }
        ]
    }));

    ctx.run(&["migrate"]).assert_success();

    let config = ctx.read_config();
    assert_eq!(config["version"], 4);
    assert_eq!(
        config["install_path"],
        json!(ctx.install_root.to_string_lossy())
    );

    let addons = config["addons"].as_array().unwrap();
    assert_eq!(addons.len(), 2);
    let details = addons
        .iter()
        .find(|a| a["remote_id"] == "61284")
        .expect("Details record");
    assert_eq!(details["provider"], "curse");
    assert_eq!(details["display_name"], "Details! Damage Meter");
    assert_eq!(details["installed_release_id"], "2934567");
    assert_eq!(details["installed_version_label"], "DetailsRetail.8.2.0");
    assert_eq!(details["owned_directories"], json!(["Details", "Details_Compare"]));

    let pending = addons
        .iter()
        .find(|a| a["remote_id"] == "3358")
        .expect("pending record");
    assert_eq!(pending["installed_release_id"], "");
    assert_eq!(pending["owned_directories"], json!([]));

    // A second run leaves the file as it is
    let before = fs::read_to_string(&ctx.config_path).unwrap();
    ctx.run(&["migrate"]).assert_success();
    assert_eq!(fs::read_to_string(&ctx.config_path).unwrap(), before);
}

#[test]
fn test_newer_config_version_is_rejected() {
    let ctx = TestContext::new();
    ctx.write_config(&json!({ "version": 99, "addons": [] }));

    ctx.run(&["list"])
        .assert_failure()
        .assert_stderr_contains("requires a newer version of wadman");

    // The file must not be rewritten
    assert_eq!(ctx.read_config()["version"], 99);
}

#[test]
fn test_config_set_and_show_formats() {
    let ctx = TestContext::new();

    ctx.run(&["config", "set", "channel", "release"]).assert_success();
    ctx.run(&["config", "set", "game-versions=9.,8."]).assert_success();
    ctx.run(&["config", "set", "bogus=1"]).assert_failure();

    ctx.run(&["config", "get", "channel"])
        .assert_success()
        .assert_stdout_contains("release");

    let output = ctx.run(&["config", "show", "--format", "json"]);
    output.assert_success();
    let shown: serde_json::Value =
        serde_json::from_str(&output.stdout).expect("Output was not valid JSON");
    assert_eq!(shown["settings"]["channel"], "release");
    assert_eq!(shown["settings"]["game_versions"], json!(["9.", "8."]));

    let output = ctx.run(&["config", "show", "--format", "yaml"]);
    output.assert_success().assert_stdout_contains("channel: release");
    let _: serde_yaml::Value =
        serde_yaml::from_str(&output.stdout).expect("Output was not valid YAML");

    // The install path came from the environment and stays out of the file
    assert_eq!(ctx.read_config()["install_path"], "");
}

#[test]
fn test_scan_suggests_add_command() {
    let ctx = TestContext::new();
    ctx.add_addon_dir("Details", "## Title: Details\n## X-Curse-Project-ID: 61284\n");
    ctx.add_addon_dir("Details_Compare", "## Title: Compare\n## X-Part-Of: Details\n");
    ctx.add_addon_dir("Grid", "## Title: Grid\n## X-WoWI-ID: 5108\n");
    ctx.add_addon_dir("Mystery", "## Title: Mystery\n");
    ctx.add_addon_dir("Lazy", "## LoadOnDemand: 1\n## X-Curse-Project-ID: 7\n");

    let output = ctx.run(&["scan"]);
    output
        .assert_success()
        .assert_stdout_contains("Mystery")
        .assert_stdout_contains("wadman add curse:61284 wowi:5108");
    assert!(!output.stdout.contains("Lazy"));
    assert!(!output.stdout.contains("Details_Compare"));

    ctx.run(&["scan", "--include-load-on-demand"])
        .assert_success()
        .assert_stdout_contains("curse:7");
}

#[test]
fn test_remove_deletes_owned_directories() {
    let ctx = TestContext::new();
    for dir in ["Foo", "Foo_Options", "Bar"] {
        fs::create_dir_all(ctx.addons_dir().join(dir)).unwrap();
    }
    ctx.write_config(&json!({
        "install_path": "",
        "version": 4,
        "addons": [
            {
                "provider": "curse",
                "remote_id": "1",
                "display_name": "Foo",
                "installed_release_id": "10",
                "installed_version_label": "1.0",
                "owned_directories": ["Foo", "Foo_Options"]
            }
        ]
    }));

    ctx.run(&["remove", "curse:1"])
        .assert_success()
        .assert_stdout_contains("Removed [curse:1] Foo");

    assert!(!ctx.addons_dir().join("Foo").exists());
    assert!(!ctx.addons_dir().join("Foo_Options").exists());
    assert!(ctx.addons_dir().join("Bar").is_dir());
    assert_eq!(ctx.read_config()["addons"], json!([]));
}

#[test]
fn test_list_shows_disabled_and_missing() {
    let ctx = TestContext::new();
    for dir in ["Foo", "Baz", "Baz_Config"] {
        fs::create_dir_all(ctx.addons_dir().join(dir)).unwrap();
    }
    let character = ctx
        .install_root
        .join("WTF")
        .join("Account")
        .join("ACCOUNT")
        .join("Realm")
        .join("Character");
    fs::create_dir_all(&character).unwrap();
    fs::write(
        character.join("AddOns.txt"),
        "Foo: disabled\nBaz: enabled\nBaz_Config: disabled\n",
    )
    .unwrap();

    let record = |id: &str, name: &str, dirs: &[&str]| {
        json!({
            "provider": "curse",
            "remote_id": id,
            "display_name": name,
            "installed_release_id": "1",
            "installed_version_label": "1.0",
            "owned_directories": dirs
        })
    };
    ctx.write_config(&json!({
        "version": 4,
        "addons": [
            record("1", "Foo", &["Foo"]),
            record("2", "Gone", &["Gone"]),
            record("3", "Baz", &["Baz", "Baz_Config"])
        ]
    }));

    ctx.run(&["list"])
        .assert_success()
        .assert_stdout_contains("[curse:1] Foo (1.0) [disabled]")
        .assert_stdout_contains("[curse:2] Gone (1.0) [missing]")
        .assert_stdout_contains("[curse:3] Baz (1.0) [disabled (1/2)]");
}

#[test]
fn test_update_with_unreachable_provider_continues() {
    let ctx = TestContext::new();
    fs::create_dir_all(ctx.addons_dir().join("Foo")).unwrap();
    ctx.write_config(&json!({
        "version": 4,
        "addons": [
            {
                "provider": "curse",
                "remote_id": "1",
                "display_name": "Foo",
                "installed_release_id": "10",
                "owned_directories": ["Foo"]
            },
            {
                "provider": "wowi",
                "remote_id": "2",
                "display_name": "Bar"
            }
        ]
    }));

    ctx.run(&["update"])
        .assert_success()
        .assert_stdout_contains("Finished checking 2 addons (2 failed)");

    let config = ctx.read_config();
    assert_eq!(config["addons"][1]["installed_release_id"], "10");
    assert!(ctx.addons_dir().join("Foo").is_dir());

    ctx.run(&["update", "wowi:2"])
        .assert_success()
        .assert_stdout_contains("Finished checking 1 addons (1 failed)");
}

#[test]
fn test_missing_install_path_is_fatal() {
    let ctx = TestContext::new();

    let output: common::CommandOutput = ctx
        .cmd()
        .env("WADMAN_INSTALL_PATH", ctx.temp_dir.path().join("nowhere"))
        .args(["update"])
        .output()
        .expect("Failed to run wadman")
        .into();
    output.assert_failure().assert_stderr_contains("does not exist");
}

#[test]
fn test_invalid_identifier_is_rejected() {
    let ctx = TestContext::new();

    ctx.run(&["remove", "curse:abc"])
        .assert_failure()
        .assert_stderr_contains("Invalid addon identifier");
}
