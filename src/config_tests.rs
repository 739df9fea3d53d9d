use super::*;
use serial_test::serial;
use tempfile::tempdir;

#[test]
fn test_default_config() {
    let config = PowerdConfig::default();
    assert_eq!(config.service_name, "power");
    assert_eq!(config.bind_addr, "127.0.0.1");
    assert_eq!(config.port, 0);
    assert_eq!(config.log_level, "info");
    assert_eq!(config.listen_addr(), "127.0.0.1:0");
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_yaml_uses_defaults() {
    let yaml = r#"
port: 4100
log_level: debug
"#;
    let config: PowerdConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.port, 4100);
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.service_name, "power");
    assert_eq!(config.home, None);
}

#[test]
fn test_load_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("powerd.yaml");
    std::fs::write(
        &path,
        "home: /tmp/powerd-test\nservice_name: power-test\nbind_addr: \"::1\"\n",
    )
    .unwrap();

    let config = PowerdConfig::load(&path).unwrap();
    assert_eq!(config.service_name, "power-test");
    assert_eq!(config.home_dir().unwrap(), PathBuf::from("/tmp/powerd-test"));
    assert_eq!(config.listen_addr(), "[::1]:0");
}

#[test]
fn test_validation_rejects_bad_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("powerd.yaml");

    std::fs::write(&path, "service_name: ../escape\n").unwrap();
    let err = PowerdConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("Invalid service name"));

    std::fs::write(&path, "bind_addr: not-an-ip\n").unwrap();
    let err = PowerdConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("Invalid bind address"));
}

#[test]
fn test_malformed_yaml_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("powerd.yaml");
    std::fs::write(&path, "port: [1, 2\n").unwrap();

    let err = PowerdConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
#[serial]
fn test_resolve_reads_home_config() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("powerd.yaml"), "port: 4242\n").unwrap();

    std::env::set_var(crate::paths::HOME_ENV, dir.path());
    let config = PowerdConfig::resolve(None);
    std::env::remove_var(crate::paths::HOME_ENV);

    assert_eq!(config.unwrap().port, 4242);
}

#[test]
#[serial]
fn test_resolve_without_file_uses_defaults() {
    let dir = tempdir().unwrap();

    std::env::set_var(crate::paths::HOME_ENV, dir.path());
    let config = PowerdConfig::resolve(None);
    std::env::remove_var(crate::paths::HOME_ENV);

    assert_eq!(config.unwrap(), PowerdConfig::default());
}
