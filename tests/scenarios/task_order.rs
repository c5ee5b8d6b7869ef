//! Test: Task Order - dependencies run first, each exactly once

use crate::helpers::*;
use provision::core::config::{PipelineConfig, BUILTIN_PIPELINE};
use std::collections::HashSet;

/// init-dev runs init, then the dev dependencies, then install-mecab
#[tokio::test]
async fn test_init_dev_order() {
    let runner = ScriptedRunner::new();
    let result = run_builtin("init-dev", runner.clone()).await;

    assert_pipeline_completed(&result);
    assert_task_order(&result, &["init", "init-dev-deps", "install-mecab", "init-dev"]);

    let commands = runner.commands();
    assert_eq!(commands[0], "pip install -r requirements.txt");
    assert_eq!(commands[1], "pip install -r requirements-dev.txt");
    assert_eq!(
        commands[2],
        "git clone https://github.com/taku910/mecab.git mecab"
    );
    assert_eq!(commands.last().unwrap(), "mecab -v");
    assert_eq!(commands.len(), 2 + 10);
}

/// install-mecab runs its steps in order, escalating only the installs and ldconfig
#[tokio::test]
async fn test_install_mecab_steps() {
    let runner = ScriptedRunner::new();
    let result = run_builtin("install-mecab", runner.clone()).await;

    assert_pipeline_completed(&result);
    assert_eq!(
        steps_run(&result, "install-mecab"),
        vec![
            "clone",
            "configure",
            "make",
            "check",
            "install",
            "ldconfig",
            "configure-ipadic",
            "make-ipadic",
            "install-ipadic",
            "version",
        ]
    );

    let elevated: Vec<String> = runner
        .seen()
        .iter()
        .filter(|i| i.elevated)
        .map(|i| i.command_line())
        .collect();
    assert_eq!(elevated, vec!["make install", "ldconfig", "make install"]);

    let dirs: Vec<_> = runner
        .seen()
        .iter()
        .map(|i| i.working_dir.display().to_string())
        .collect();
    assert_eq!(dirs[1], "/work/mecab/mecab");
    assert_eq!(dirs[6], "/work/mecab/mecab-ipadic");
}

/// Every task's plan lists each transitive dependency once, before its dependents
#[test]
fn test_resolve_order_is_dependency_first() {
    let graph = PipelineConfig::from_yaml(BUILTIN_PIPELINE)
        .unwrap()
        .to_graph(&[])
        .unwrap();

    for task in graph.tasks() {
        let order: Vec<&str> = graph.resolve_order(&task.name).unwrap().collect();

        let unique: HashSet<&str> = order.iter().copied().collect();
        assert_eq!(unique.len(), order.len(), "{} plan has duplicates", task.name);
        assert_eq!(*order.last().unwrap(), task.name);

        for (position, name) in order.iter().enumerate() {
            for dependency in &graph.task(name).unwrap().depends_on {
                let before = order[..position].iter().any(|n| n == dependency);
                assert!(before, "{} must come before {}", dependency, name);
            }
        }
    }
}

/// Tasks without dependencies run alone
#[tokio::test]
async fn test_standalone_tasks() {
    for (target, command) in [
        ("init", "pip install -r requirements.txt"),
        ("install", "python setup.py install"),
        ("test", "python -m unittest discover -s tests"),
    ] {
        let runner = ScriptedRunner::new();
        let result = run_builtin(target, runner.clone()).await;

        assert_pipeline_completed(&result);
        assert_task_order(&result, &[target]);
        assert_eq!(runner.commands(), vec![command]);
    }
}
