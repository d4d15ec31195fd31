pub mod api;
pub mod config;
pub mod db;
pub mod leaderboard;
pub mod limits;
pub mod money;
pub mod relay;
pub mod ticket;

mod snowflake;

pub use self::config::Config;
