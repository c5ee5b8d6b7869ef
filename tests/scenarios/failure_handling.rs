//! Test: Failure Handling - abort on the first failing step

use crate::helpers::*;
use provision::core::{FailureReason, TaskState};
use provision::execution::PipelineError;

/// A failing compile stops install-mecab before check, install, ldconfig and the probe
#[tokio::test]
async fn test_compile_failure_stops_install_mecab() {
    let runner = ScriptedRunner::new().failing("make", 2);
    let result = run_builtin("install-mecab", runner.clone()).await;

    assert_pipeline_failed(&result);
    assert_failed_at(&result, "install-mecab", "make");
    assert_eq!(
        steps_run(&result, "install-mecab"),
        vec!["clone", "configure", "make"]
    );

    let commands = runner.commands();
    for never in ["make check", "make install", "ldconfig", "mecab -v"] {
        assert!(
            !commands.iter().any(|c| c == never),
            "'{}' should not have run",
            never
        );
    }
    assert!(runner.seen().iter().all(|i| !i.elevated));

    assert_eq!(
        result.error(),
        Some(PipelineError::StepFailed {
            task: "install-mecab".to_string(),
            step: "make".to_string(),
            reason: FailureReason::ExitStatus { code: Some(2) },
        })
    );
}

/// The failing step's captured output is kept for the report
#[tokio::test]
async fn test_failure_report_keeps_output() {
    let runner = ScriptedRunner::new().failing("./configure --enable-utf8-only", 1);
    let result = run_builtin("install-mecab", runner).await;

    let failure = result.failure.as_ref().unwrap();
    assert_eq!(failure.step, "configure");
    assert_eq!(failure.stdout, "ran ./configure --enable-utf8-only");
    assert!(failure.stderr.contains("exited with 1"));
}

/// Running docs installs first; a failing install is reported as install's failure
#[tokio::test]
async fn test_docs_failure_in_install_names_install() {
    let runner = ScriptedRunner::new().failing("python setup.py install", 1);
    let result = run_builtin("docs", runner.clone()).await;

    assert_pipeline_failed(&result);
    assert_failed_at(&result, "install", "setup");

    let docs = result.task("docs").unwrap();
    assert_eq!(docs.state, TaskState::Skipped);
    assert!(docs.steps.is_empty());
    assert_eq!(docs.skip_reason.as_deref(), Some("dependency 'install' failed"));

    assert_eq!(runner.commands(), vec!["python setup.py install"]);
}

/// The doc alias behaves exactly like docs
#[tokio::test]
async fn test_doc_alias_runs_docs() {
    let runner = ScriptedRunner::new();
    let result = run_builtin("doc", runner.clone()).await;

    assert_pipeline_completed(&result);
    assert_task_order(&result, &["install", "docs"]);
    assert_eq!(
        runner.commands(),
        vec![
            "python setup.py install",
            "sphinx-apidoc -f -o docs/source budou",
            "make html",
        ]
    );
    assert_eq!(
        runner.seen()[2].working_dir,
        std::path::PathBuf::from("/work/docs")
    );
}

/// After init fails inside init-dev, nothing else runs and every later task is skipped
#[tokio::test]
async fn test_init_failure_skips_rest_of_init_dev() {
    let runner = ScriptedRunner::new().failing("pip install -r requirements.txt", 1);
    let result = run_builtin("init-dev", runner.clone()).await;

    assert_pipeline_failed(&result);
    assert_failed_at(&result, "init", "runtime-deps");
    assert_eq!(runner.commands().len(), 1);

    for task in ["init-dev-deps", "install-mecab", "init-dev"] {
        assert_eq!(result.task(task).unwrap().state, TaskState::Skipped, "{}", task);
    }
    assert_eq!(
        result.task("install-mecab").unwrap().skip_reason.as_deref(),
        Some("run stopped after 'init' failed")
    );
}
