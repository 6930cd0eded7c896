mod buffer;
mod session;
mod transaction;
