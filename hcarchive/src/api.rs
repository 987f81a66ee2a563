pub mod hipchat;
pub mod retry;
