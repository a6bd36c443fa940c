pub mod deploy;
pub mod init;
pub mod policy;
pub mod up;
pub mod upload;
pub mod wire;
