pub mod classifier;
pub mod conflict;
pub mod occurrence;
pub mod oracle_client;
pub mod plan_generator;
pub mod plan_validator;
pub mod planning_service;
pub mod prompt_templates;
pub mod schedule_utils;
