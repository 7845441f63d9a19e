pub mod backend;
pub mod frontend;
pub mod messages;

pub use messages::BackendMessage;
pub use messages::FrontendMessage;
pub use messages::StartupRequest;
