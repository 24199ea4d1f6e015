pub mod publish;
pub mod update;
