//! Scenario tests for the provisioning pipeline

mod helpers;

mod best_effort;
mod failure_handling;
mod task_order;
mod variable_substitution;
