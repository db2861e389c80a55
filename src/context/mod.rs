pub mod app;
pub mod role;

pub use app::{get_session_path, AccessError, AppContext, ColorPreference, Preferences, Profile};
pub use role::{Capability, Role};
