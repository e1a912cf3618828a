pub mod client;
pub mod error;
pub mod types;

pub use client::{AnthropicClient, MessageSender};
pub use error::AnthropicError;
pub use types::MessagesRequest;

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::types::{ContentBlock, MessagesResponse, Usage};
    use super::{AnthropicError, MessageSender, MessagesRequest};

    /// Replays canned answers in order and keeps every request it saw.
    /// `Err(status)` entries become `ApiError`s with that status.
    pub struct CannedSender {
        answers: Mutex<VecDeque<Result<String, u16>>>,
        pub requests: Mutex<Vec<MessagesRequest>>,
    }

    impl CannedSender {
        pub fn new(answers: Vec<Result<&str, u16>>) -> Self {
            Self {
                answers: Mutex::new(
                    answers
                        .into_iter()
                        .map(|a| a.map(str::to_string))
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn ok(text: &str) -> Self {
            Self::new(vec![Ok(text)])
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl MessageSender for CannedSender {
        async fn send_message(
            &self,
            req: &MessagesRequest,
        ) -> Result<MessagesResponse, AnthropicError> {
            self.requests.lock().unwrap().push(req.clone());
            let next = self.answers.lock().unwrap().pop_front();
            match next {
                Some(Ok(text)) => Ok(MessagesResponse {
                    id: "mock".into(),
                    content: vec![ContentBlock {
                        content_type: "text".into(),
                        text,
                    }],
                    model: req.model.clone(),
                    stop_reason: Some("end_turn".into()),
                    usage: Usage::default(),
                }),
                Some(Err(status)) => Err(AnthropicError::ApiError {
                    status,
                    message: "mock error".into(),
                }),
                None => Err(AnthropicError::ApiError {
                    status: 500,
                    message: "no canned answer left".into(),
                }),
            }
        }
    }
}
