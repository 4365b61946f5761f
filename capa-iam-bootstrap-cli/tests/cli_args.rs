use std::io::Write;
use std::process::{Command, Output};

const POLICY_NAMES: [&str; 4] = [
    "AWSIAMManagedPolicyControllers",
    "AWSIAMManagedPolicyCloudProviderControlPlane",
    "AWSIAMManagedPolicyCloudProviderNodes",
    "AWSEBSCSIPolicyController",
];

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_capa-iam-bootstrap"))
        .args(args)
        .env_remove("CAPA_IAM_BOOTSTRAP_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run capa-iam-bootstrap")
}

fn config_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("failed to create config file");
    file.write_all(contents.as_bytes())
        .expect("failed to write config file");
    file
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr was: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn help_lists_subcommands() {
    let out = run(&["--help"]);
    let s = String::from_utf8_lossy(&out.stdout);
    for subcommand in [
        "print-cloudformation-template",
        "print-policy",
        "print-config",
        "config-schema",
    ] {
        assert!(s.contains(subcommand), "help should list {}: {}", subcommand, s);
    }
}

#[test]
fn test_print_cloudformation_template_defaults() {
    let json = stdout_json(&run(&["print-cloudformation-template"]));
    assert_eq!(json["AWSTemplateFormatVersion"], "2010-09-09");

    let resources = json["Resources"].as_object().unwrap();
    assert_eq!(resources.len(), 10);
    assert!(!resources.contains_key("AWSIAMUserBootstrapper"));
    assert_eq!(
        resources["AWSIAMRoleControllers"]["Properties"]["RoleName"],
        "controllers.cluster-api-provider-aws.sigs.k8s.io"
    );
}

#[test]
fn test_print_cloudformation_template_with_json_config() {
    let config = config_file(
        ".json",
        r#"{
            "namePrefix": "dev-",
            "bootstrapUser": {"enable": true},
            "controlPlane": {"enableCSIPolicy": true},
            "managedControlPlane": {"disable": true}
        }"#,
    );
    let path = config.path().to_str().unwrap();
    let json = stdout_json(&run(&["--config", path, "print-cloudformation-template"]));

    let resources = json["Resources"].as_object().unwrap();
    assert!(resources.contains_key("AWSIAMUserBootstrapper"));
    assert!(resources.contains_key("AWSIAMGroupBootstrapper"));
    assert!(resources.contains_key("AWSEBSCSIPolicyController"));
    assert!(!resources.contains_key("AWSIAMRoleEKSControlPlane"));
    assert_eq!(
        resources["AWSIAMRoleNodes"]["Properties"]["RoleName"],
        "dev-nodes.cluster-api-provider-aws.sigs.k8s.io"
    );
}

#[test]
fn test_toml_config_from_environment() {
    let config = config_file(
        ".toml",
        r#"
namePrefix = "toml-"
stackName = "toml-stack"

[nodes]
disableCloudProviderPolicy = true
"#,
    );
    let output = Command::new(env!("CARGO_BIN_EXE_capa-iam-bootstrap"))
        .arg("print-config")
        .env("CAPA_IAM_BOOTSTRAP_CONFIG", config.path())
        .output()
        .expect("failed to run print-config");
    let json = stdout_json(&output);

    assert_eq!(json["namePrefix"], "toml-");
    assert_eq!(json["stackName"], "toml-stack");
    assert_eq!(json["nodes"]["disableCloudProviderPolicy"], true);
    // Unset fields keep their defaults
    assert_eq!(json["nameSuffix"], ".cluster-api-provider-aws.sigs.k8s.io");
}

#[test]
fn test_print_policy_for_each_managed_policy() {
    for name in POLICY_NAMES {
        let json = stdout_json(&run(&["print-policy", "--document", name]));
        assert_eq!(json["Version"], "2012-10-17", "policy {}", name);
        assert!(
            !json["Statement"].as_array().unwrap().is_empty(),
            "policy {} has no statements",
            name
        );
    }
}

#[test]
fn test_print_policy_unknown_name() {
    let output = run(&["print-policy", "--document", "AWSIAMRoleNodes"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("AWSIAMRoleNodes"), "stderr was: {}", stderr);
}

#[test]
fn test_null_name_suffix_is_rejected() {
    let config = config_file(".json", r#"{"nameSuffix": null}"#);
    let path = config.path().to_str().unwrap();
    let output = run(&["--config", path, "print-cloudformation-template"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nameSuffix"), "stderr was: {}", stderr);
}

#[test]
fn test_missing_config_file() {
    let output = run(&[
        "--config",
        "/nonexistent/bootstrap.json",
        "print-cloudformation-template",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Failed to read configuration file"),
        "stderr was: {}",
        stderr
    );
}

#[test]
fn test_malformed_config_file() {
    let config = config_file(".json", "{ not json");
    let path = config.path().to_str().unwrap();
    let output = run(&["--config", path, "print-config"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Failed to parse JSON configuration"),
        "stderr was: {}",
        stderr
    );
}

#[test]
fn test_config_schema_describes_spec() {
    let json = stdout_json(&run(&["config-schema"]));
    let properties = json["properties"].as_object().unwrap();
    for field in ["namePrefix", "nameSuffix", "bootstrapUser", "clusterAPIControllers"] {
        assert!(properties.contains_key(field), "schema lacks {}", field);
    }
}

#[test]
fn test_verbose_logs_to_stderr_only() {
    let output = run(&["--verbose", "print-cloudformation-template"]);
    let json = stdout_json(&output);
    assert!(json["Resources"].is_object());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Rendered"), "stderr was: {}", stderr);
}
