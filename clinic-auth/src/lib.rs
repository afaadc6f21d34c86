// Session, permission and route-guard layer.

pub mod backend;
pub mod capability;
pub mod context;
pub mod guard;
pub mod navigation;
pub mod options;
pub mod permissions;
pub mod session;
pub mod store;

pub use backend::*;
pub use capability::*;
pub use context::*;
pub use guard::*;
pub use navigation::*;
pub use options::*;
pub use permissions::*;
pub use session::*;
pub use store::*;
