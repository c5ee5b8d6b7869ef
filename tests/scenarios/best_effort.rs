//! Test: Best Effort - tolerated failures don't fail the task

use crate::helpers::*;
use provision::core::{StepStatus, TaskState};

/// A failing version probe leaves install-mecab succeeded
#[tokio::test]
async fn test_version_probe_failure_is_tolerated() {
    let runner = ScriptedRunner::new().failing("mecab -v", 127);
    let result = run_builtin("install-mecab", runner).await;

    assert_pipeline_completed(&result);
    let task = result.task("install-mecab").unwrap();
    assert_eq!(task.state, TaskState::Succeeded);

    let probe = task.steps.last().unwrap();
    assert_eq!(probe.step, "version");
    assert!(matches!(probe.status, StepStatus::Tolerated { .. }));
    assert_eq!(probe.exit_code, Some(127));
}

/// A tolerated failure mid-task doesn't stop the following steps
#[tokio::test]
async fn test_steps_after_tolerated_failure_run() {
    let yaml = r#"
name: best-effort
tasks:
  - name: setup
    steps:
      - name: probe
        run: which mecab
        on_failure: continue
      - name: build
        run: make
"#;

    let runner = ScriptedRunner::new().failing("which mecab", 1);
    let result = run_yaml(yaml, "setup", runner.clone()).await;

    assert_pipeline_completed(&result);
    assert_eq!(runner.commands(), vec!["which mecab", "make"]);
    assert_eq!(steps_run(&result, "setup"), vec!["probe", "build"]);
}
