//! Environment variable overrides. Kept in their own test binary, and in a
//! single test, because the process environment is shared.

use std::env;
use std::fs;

use callback_core::config::ConfigManager;
use callback_core::ConfigurationError;

#[test]
fn test_environment_variables_override_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("callback.yaml"),
        "async_bridge:\n  response_timeout_ms: 1000\nstacks:\n  strict_pop: false\n",
    )
    .unwrap();

    env::set_var("CALLBACK_ASYNC_BRIDGE__RESPONSE_TIMEOUT_MS", "2500");
    env::set_var("CALLBACK_STACKS__STRICT_POP", "true");
    let loaded = ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
    env::remove_var("CALLBACK_ASYNC_BRIDGE__RESPONSE_TIMEOUT_MS");
    env::remove_var("CALLBACK_STACKS__STRICT_POP");

    let manager = loaded.unwrap();
    assert_eq!(manager.config().async_bridge.response_timeout_ms, Some(2500));
    assert!(manager.config().stacks.strict_pop);

    // Invalid values coming from the environment are rejected too.
    env::set_var("CALLBACK_JOBS__THREAD_NAME_PREFIX", " ");
    let rejected = ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
    env::remove_var("CALLBACK_JOBS__THREAD_NAME_PREFIX");
    assert!(matches!(rejected, Err(ConfigurationError::InvalidValue { .. })));

    env::set_var("CALLBACK_ENV", "staging");
    assert_eq!(ConfigManager::detect_environment(), "staging");
    env::remove_var("CALLBACK_ENV");
}
