pub(crate) mod assignments;
pub(crate) mod errors;
pub(crate) mod folders;
pub(crate) mod handlers;
pub(crate) mod router;
pub(crate) mod session;
pub(crate) mod submissions;
pub(crate) mod users;
pub(crate) mod validation;
