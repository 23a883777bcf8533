pub mod dispatch;
pub mod import;
pub mod lead;
pub mod logs;
pub mod schema;
pub mod serve;
pub mod settings;
pub mod shared;
pub mod stats;
