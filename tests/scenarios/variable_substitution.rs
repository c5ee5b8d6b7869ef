//! Test: Variable Substitution - placeholders in commands and paths

use crate::helpers::*;
use provision::core::config::{PipelineConfig, BUILTIN_PIPELINE};
use provision::execution::PipelineRunner;

/// Overrides flow into commands, working directories and skip paths
#[tokio::test]
async fn test_overrides_reach_invocations() {
    let overrides = vec![
        ("mecab_src".to_string(), "/opt/src/mecab".to_string()),
        ("python".to_string(), "python3".to_string()),
    ];
    let graph = PipelineConfig::from_yaml(BUILTIN_PIPELINE)
        .unwrap()
        .to_graph(&overrides)
        .unwrap();

    let clone = &graph.task("install-mecab").unwrap().steps[0];
    assert_eq!(
        clone.skip_if_exists.as_deref(),
        Some(std::path::Path::new("/opt/src/mecab"))
    );

    let runner = ScriptedRunner::new();
    let result = PipelineRunner::new(graph, runner.clone(), "/work")
        .run("install-mecab")
        .await
        .unwrap();
    assert_pipeline_completed(&result);

    let seen = runner.seen();
    assert_eq!(seen[0].args.last().unwrap(), "/opt/src/mecab");
    // absolute directories replace the base directory
    assert_eq!(seen[1].working_dir, std::path::PathBuf::from("/opt/src/mecab/mecab"));
}

/// Placeholders inside a single list entry are not split on whitespace
#[tokio::test]
async fn test_argv_entries_stay_whole() {
    let yaml = r#"
name: argv
variables:
  message: "hello world"
tasks:
  - name: greet
    steps:
      - name: echo
        run: [echo, "{{ message }}"]
"#;

    let runner = ScriptedRunner::new();
    run_yaml(yaml, "greet", runner.clone()).await;

    assert_eq!(runner.seen()[0].args, vec!["hello world"]);
}

/// A placeholder still undefined after overrides is rejected before anything runs
#[test]
fn test_undefined_variable_fails_to_build() {
    let yaml = r#"
name: broken
tasks:
  - name: install
    steps:
      - name: setup
        run: "{{ interpreter }} setup.py install"
"#;

    let config = PipelineConfig::from_yaml(yaml).unwrap();
    let err = config.to_graph(&[]).unwrap_err();
    assert!(format!("{:#}", err).contains("interpreter"));

    let overrides = vec![("interpreter".to_string(), "python3".to_string())];
    let graph = config.to_graph(&overrides).unwrap();
    assert_eq!(graph.task("install").unwrap().steps[0].program, "python3");
}
