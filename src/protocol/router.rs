use crate::config::PROTOCOL_VERSION;
use crate::core::packet::{Request, Response, MAX_RESPONSE_PAYLOAD};
use crate::core::payload::{self, MessageRecord};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::codes::{MessageType, RequestCode, ResponseCode};
use crate::store::{MailboxStore, UserDirectory};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Maps decoded requests onto the directory and mailbox and builds the reply.
///
/// The router holds no per-request state and never touches the transport; it
/// returns response bytes to whoever owns the connection. Cloning is cheap and
/// every clone shares the same stores.
#[derive(Debug, Clone, Default)]
pub struct Router {
    directory: Arc<UserDirectory>,
    mailbox: Arc<MailboxStore>,
}

impl Router {
    pub fn new(directory: Arc<UserDirectory>, mailbox: Arc<MailboxStore>) -> Self {
        Self { directory, mailbox }
    }

    pub fn directory(&self) -> &Arc<UserDirectory> {
        &self.directory
    }

    pub fn mailbox(&self) -> &Arc<MailboxStore> {
        &self.mailbox
    }

    /// Decode a raw request buffer, dispatch it and encode the response.
    ///
    /// Returns an error when no header could be decoded or the response cannot
    /// be framed; the caller then closes the connection without replying.
    pub fn handle_bytes(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let request = Request::from_bytes(raw)?;
        self.dispatch(&request).to_bytes()
    }

    /// Route a decoded request. Every outcome, including failures, is a response.
    #[instrument(skip(self, request), fields(code = request.header.request_code, client = %request.header.client_id_hex()))]
    pub fn dispatch(&self, request: &Request) -> Response {
        debug!(
            version = request.header.version,
            payload_size = request.header.payload_size,
            "Dispatching request"
        );

        let outcome = RequestCode::try_from(request.header.request_code).and_then(|code| {
            debug!(operation = %code, "Routing request");
            match code {
                RequestCode::Register => self.register(request),
                RequestCode::ListUsers => self.list_users(request),
                RequestCode::GetPublicKey => self.get_public_key(request),
                RequestCode::SendMessage => self.send_message(request),
                RequestCode::PullMessages => self.pull_messages(request),
            }
        });

        outcome.unwrap_or_else(|err| error_response(&err))
    }

    fn register(&self, request: &Request) -> Result<Response> {
        let registration = payload::decode_registration_payload(&request.payload)?;
        let user_id = self
            .directory
            .register(&registration.username, registration.public_key)?;
        Ok(respond(
            ResponseCode::Registered,
            payload::build_registration_success(&user_id),
        ))
    }

    fn list_users(&self, request: &Request) -> Result<Response> {
        let requester = request.header.requester_id()?;
        let users = self.directory.list_excluding(&requester);
        debug!(requester = %requester, count = users.len(), "Listing users");
        let body = payload::build_user_list(
            users
                .iter()
                .map(|u| (u.user_id.as_str(), u.username.as_str())),
        );
        Ok(respond(ResponseCode::UserList, body))
    }

    fn get_public_key(&self, request: &Request) -> Result<Response> {
        let user_id = payload::decode_public_key_request(&request.payload)?;
        let user = self.directory.find_by_id(&user_id)?;
        Ok(respond(
            ResponseCode::PublicKey,
            payload::build_public_key(&user.user_id, user.public_key.as_deref()),
        ))
    }

    fn send_message(&self, request: &Request) -> Result<Response> {
        let sender = request.header.requester_id()?;
        let message = payload::decode_message_payload(&request.payload)?;

        // Directory and mailbox are locked separately; a registered id never changes.
        if !self.directory.contains(&message.recipient_id) {
            return Err(ProtocolError::UserNotFound(message.recipient_id));
        }

        let message_id = self.mailbox.enqueue(
            &sender,
            &message.recipient_id,
            message.message_type,
            message.content,
        );
        info!(
            sender = %sender,
            recipient = %message.recipient_id,
            message_id,
            message_type = ?MessageType::from(message.message_type),
            "Message queued"
        );
        Ok(respond(
            ResponseCode::MessageAccepted,
            payload::build_send_ack(&message.recipient_id, message_id),
        ))
    }

    fn pull_messages(&self, request: &Request) -> Result<Response> {
        let requester = request.header.requester_id()?;
        let messages = self.mailbox.drain_batch(&requester, MAX_RESPONSE_PAYLOAD);
        info!(requester = %requester, count = messages.len(), "Mailbox delivered");
        let body = payload::build_message_batch(messages.iter().map(|m| MessageRecord {
            sender_id: &m.sender_id,
            message_id: m.message_id,
            message_type: m.message_type,
            content: &m.content,
        }));
        Ok(respond(ResponseCode::Messages, body))
    }
}

#[inline]
fn respond(code: ResponseCode, payload: Vec<u8>) -> Response {
    Response::new(PROTOCOL_VERSION, code.into(), payload)
}

/// Translate a recoverable error into the response the client sees.
pub fn error_response(err: &ProtocolError) -> Response {
    match err {
        ProtocolError::UnknownRequestCode(code) => {
            warn!(code, "Unknown request code");
            respond(ResponseCode::UnknownRequest, Vec::new())
        }
        ProtocolError::UserNotFound(user_id) => {
            debug!(user_id = %user_id, "Request names an unknown user");
            respond(
                ResponseCode::UserNotFound,
                payload::build_error_text(constants::ERR_USER_NOT_FOUND),
            )
        }
        ProtocolError::UsernameTaken(_) => respond(
            ResponseCode::UsernameTaken,
            payload::build_error_text(constants::ERR_USERNAME_TAKEN),
        ),
        ProtocolError::Validation(reason) => {
            warn!(reason = %reason, "Request failed validation");
            respond(ResponseCode::InvalidRequest, payload::build_error_text(reason))
        }
        other => {
            warn!(error = %other, "Malformed request payload");
            respond(
                ResponseCode::InvalidRequest,
                payload::build_error_text(constants::ERR_INVALID_PAYLOAD),
            )
        }
    }
}
