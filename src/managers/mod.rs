pub mod backup;
pub mod distribution;
pub mod dump;
pub mod logging;
pub mod notification;
