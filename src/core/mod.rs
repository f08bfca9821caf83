pub mod api;
pub mod http_proxy;
pub mod logger;
pub mod query;

pub use api::{LoggingApi, PublicApi};
pub use http_proxy::HttpProxy;
pub use query::{Query, GLOBAL_ACTION_KEYWORD};
