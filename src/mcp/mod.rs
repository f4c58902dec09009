

pub mod server;

pub use server::{SkillBridgeMcpServer, run_server};
