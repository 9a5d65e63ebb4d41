use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    upload::{HttpTransport, Transport},
};

pub struct Context {
    /// The loaded configuration.
    pub config: Config,
    /// Where chunks are sent.
    pub transport: Box<dyn Transport>,
    /// Fired on Ctrl-C.
    pub cancel: CancellationToken,
}

impl Context {
    /// Create a context that talks to `endpoint` over HTTP.
    pub fn new(config: Config, endpoint: &str) -> Self {
        let transport = HttpTransport::new(Client::new(), endpoint);
        tracing::debug!(endpoint = transport.endpoint(), "using upload endpoint");
        Self::with_transport(config, Box::new(transport))
    }

    pub fn with_transport(config: Config, transport: Box<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancel [`Context::cancel`] when the process receives Ctrl-C.
    pub fn cancel_on_ctrl_c(&self) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted");
                cancel.cancel();
            }
        });
    }
}
