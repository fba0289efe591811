use crate::error::ProtocolError;
use std::fmt;

/// Operation selected by the request header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RequestCode {
    Register = 600,
    ListUsers = 601,
    GetPublicKey = 602,
    SendMessage = 603,
    PullMessages = 604,
}

impl RequestCode {
    pub fn name(self) -> &'static str {
        match self {
            RequestCode::Register => "register",
            RequestCode::ListUsers => "list_users",
            RequestCode::GetPublicKey => "get_public_key",
            RequestCode::SendMessage => "send_message",
            RequestCode::PullMessages => "pull_messages",
        }
    }
}

impl TryFrom<u16> for RequestCode {
    type Error = ProtocolError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            600 => Ok(RequestCode::Register),
            601 => Ok(RequestCode::ListUsers),
            602 => Ok(RequestCode::GetPublicKey),
            603 => Ok(RequestCode::SendMessage),
            604 => Ok(RequestCode::PullMessages),
            other => Err(ProtocolError::UnknownRequestCode(other)),
        }
    }
}

impl From<RequestCode> for u16 {
    fn from(code: RequestCode) -> Self {
        code as u16
    }
}

impl fmt::Display for RequestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), *self as u16)
    }
}

/// Result variant carried in the response header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ResponseCode {
    Registered = 2100,
    UserList = 2101,
    PublicKey = 2102,
    MessageAccepted = 2103,
    Messages = 2104,
    UserNotFound = 2106,
    /// Unrecognised request code, empty payload
    UnknownRequest = 9000,
    /// Payload could not be decoded or failed validation, reason text payload
    InvalidRequest = 9001,
    UsernameTaken = 9002,
}

impl ResponseCode {
    pub fn is_success(self) -> bool {
        (self as u16) < 2106
    }
}

impl TryFrom<u16> for ResponseCode {
    type Error = ProtocolError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            2100 => Ok(ResponseCode::Registered),
            2101 => Ok(ResponseCode::UserList),
            2102 => Ok(ResponseCode::PublicKey),
            2103 => Ok(ResponseCode::MessageAccepted),
            2104 => Ok(ResponseCode::Messages),
            2106 => Ok(ResponseCode::UserNotFound),
            9000 => Ok(ResponseCode::UnknownRequest),
            9001 => Ok(ResponseCode::InvalidRequest),
            9002 => Ok(ResponseCode::UsernameTaken),
            other => Err(ProtocolError::Validation(format!(
                "unknown response code {other}"
            ))),
        }
    }
}

impl From<ResponseCode> for u16 {
    fn from(code: ResponseCode) -> Self {
        code as u16
    }
}

/// Kind of a relayed message. The relay stores and forwards the byte unchanged;
/// the names only describe what clients put there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    SymmetricKeyRequest,
    SymmetricKey,
    Text,
    File,
    Other(u8),
}

impl From<u8> for MessageType {
    fn from(byte: u8) -> Self {
        match byte {
            1 => MessageType::SymmetricKeyRequest,
            2 => MessageType::SymmetricKey,
            3 => MessageType::Text,
            4 => MessageType::File,
            other => MessageType::Other(other),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::SymmetricKeyRequest => 1,
            MessageType::SymmetricKey => 2,
            MessageType::Text => 3,
            MessageType::File => 4,
            MessageType::Other(other) => other,
        }
    }
}
