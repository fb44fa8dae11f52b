mod code;
mod pending;

pub use code::Code;
pub use pending::{PendingLogin, PENDING_LOGIN_COOKIE};
