//! In-memory `PreferencesApi` with scripted responses and a call log.

use portsync::integrations::qbittorrent::{ClientError, PreferencesApi};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Authenticate,
    GetPort,
    SetPort(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Expired,
    Fail(u16),
}

/// Each call pops the next scripted reply for its endpoint; an empty script
/// answers `Ok`.
#[derive(Debug, Default)]
pub struct FakeApi {
    pub remote_port: u16,
    pub get_replies: VecDeque<Reply>,
    pub set_replies: VecDeque<Reply>,
    pub login_replies: VecDeque<bool>,
    pub calls: Vec<Call>,
}

impl FakeApi {
    pub fn with_remote_port(port: u16) -> Self {
        Self {
            remote_port: port,
            ..Self::default()
        }
    }

    pub fn script_get(mut self, replies: &[Reply]) -> Self {
        self.get_replies.extend(replies.iter().copied());
        self
    }

    pub fn script_set(mut self, replies: &[Reply]) -> Self {
        self.set_replies.extend(replies.iter().copied());
        self
    }

    pub fn script_login(mut self, replies: &[bool]) -> Self {
        self.login_replies.extend(replies.iter().copied());
        self
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }
}

fn to_error(reply: Reply) -> Option<ClientError> {
    match reply {
        Reply::Ok => None,
        Reply::Expired => Some(ClientError::AuthExpired),
        Reply::Fail(status) => Some(ClientError::UnexpectedStatus {
            status,
            body: "scripted failure".to_string(),
        }),
    }
}

impl PreferencesApi for FakeApi {
    async fn authenticate(&mut self) -> Result<(), ClientError> {
        self.calls.push(Call::Authenticate);
        if self.login_replies.pop_front().unwrap_or(true) {
            Ok(())
        } else {
            Err(ClientError::LoginRejected {
                status: 200,
                body: "Fails.".to_string(),
            })
        }
    }

    async fn get_listen_port(&mut self) -> Result<u16, ClientError> {
        self.calls.push(Call::GetPort);
        let reply = self.get_replies.pop_front().unwrap_or(Reply::Ok);
        match to_error(reply) {
            Some(e) => Err(e),
            None => Ok(self.remote_port),
        }
    }

    async fn set_listen_port(&mut self, port: u16) -> Result<(), ClientError> {
        self.calls.push(Call::SetPort(port));
        let reply = self.set_replies.pop_front().unwrap_or(Reply::Ok);
        match to_error(reply) {
            Some(e) => Err(e),
            None => {
                self.remote_port = port;
                Ok(())
            }
        }
    }
}
