use rto_domain::config::Config;

#[test]
fn empty_toml_yields_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.client.base_url, "https://api.minimax.io/anthropic");
    assert_eq!(config.client.model, "MiniMax-M2.1");
    assert_eq!(config.client.api_key_env, "ANTHROPIC_API_KEY");
    assert_eq!(config.run.max_iterations, 5);
    assert_eq!(
        config.run.artifacts_dir,
        std::path::PathBuf::from("./optimization_artifacts")
    );
    assert_eq!(
        config.skills.output_dir,
        std::path::PathBuf::from("./generated_skills")
    );
}

#[test]
fn partial_section_keeps_other_defaults() {
    let config: Config = toml::from_str(
        r#"
[run]
max_iterations = 3
min_score_threshold = 80.0
"#,
    )
    .unwrap();
    assert_eq!(config.run.max_iterations, 3);
    assert_eq!(config.run.min_score_threshold, 80.0);
    // Untouched fields keep their defaults.
    assert_eq!(config.run.convergence_threshold, 3.0);
    assert_eq!(config.client.model, "MiniMax-M2.1");
}

#[test]
fn client_override_parses() {
    let config: Config = toml::from_str(
        r#"
[client]
base_url = "http://localhost:8080/anthropic"
model = "MiniMax-M2"
"#,
    )
    .unwrap();
    assert_eq!(config.client.base_url, "http://localhost:8080/anthropic");
    assert_eq!(config.client.model, "MiniMax-M2");
}
