pub(crate) mod ai_grading;
pub(crate) mod chat_client;
pub(crate) mod content_generation;
pub(crate) mod grading_request;
pub(crate) mod submission_reconcile;
