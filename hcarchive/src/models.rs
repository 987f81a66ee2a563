pub mod archive;
pub mod hipchat;

pub use archive::Archive;
pub use hipchat::{Message, Page, Sender, SenderAccount, User};
