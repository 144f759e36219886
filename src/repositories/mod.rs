pub(crate) mod assignments;
pub(crate) mod folders;
pub(crate) mod submissions;
pub(crate) mod users;
