//! Doorbell button backed by line input

use async_trait::async_trait;
use doorbell_session::{SessionError, Trigger};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

/// Fires once per input line; end of input stops the doorbell
pub struct LineTrigger<R> {
    lines: Lines<R>,
}

impl LineTrigger<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> LineTrigger<R> {
    pub fn new(reader: R) -> Self {
        Self { lines: reader.lines() }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Trigger for LineTrigger<R> {
    async fn fired(&mut self) -> doorbell_session::Result<bool> {
        match self.lines.next_line().await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(SessionError::trigger(format!("reading button input: {}", e))),
        }
    }
}
