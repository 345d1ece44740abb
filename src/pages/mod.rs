pub mod boundary;
pub mod login;
pub mod shell;
