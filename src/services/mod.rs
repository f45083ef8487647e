mod gmail;

pub use gmail::{
    GMAIL_BASE_URL, Gmail, ListMessagesParams, ListMessagesResponse, Message, MessageFormat,
    MessageHeader, MessagePart, MessageRef,
};
