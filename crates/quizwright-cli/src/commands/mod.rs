pub mod build;
pub mod init;
pub mod outcomes;
pub mod validate;
