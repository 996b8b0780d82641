//! Configuration module

mod site;

pub use site::CommentsConfig;
pub use site::ServerConfig;
pub use site::SiteConfig;
pub use site::StoreConfig;
