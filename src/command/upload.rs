use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::Context as _;
use clap::Args;

use crate::{
    availability::{wait_until_available, WaitOptions},
    context::Context,
    upload::Uploader,
};

use super::Command;

#[derive(Args, Clone, Debug)]
pub struct UploadArgs {
    /// The file to upload.
    pub file: PathBuf,
    /// Give up waiting for the file to become available after this many seconds. Waits forever
    /// if not given.
    #[arg(long, value_name = "SECS")]
    pub wait_timeout: Option<u64>,
    /// Exit with status 1 when the upload does not complete, e.g. the file is missing or the
    /// server rejects a chunk.
    #[arg(long, default_value = "false")]
    pub strict: bool,
}

impl UploadArgs {
    fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout: self.wait_timeout.map(Duration::from_secs),
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl Command for UploadArgs {
    async fn run(&self, context: &mut Context) -> anyhow::Result<ExitCode> {
        wait_until_available(&self.file, &self.wait_options(), &context.cancel).await?;

        let uploader = Uploader::new(&*context.transport, context.config.upload_secret());
        let outcome = tokio::select! {
            outcome = uploader.upload(&self.file) => {
                outcome.with_context(|| format!("upload {}", self.file.display()))?
            }
            _ = context.cancel.cancelled() => {
                anyhow::bail!("interrupted while uploading {}", self.file.display())
            }
        };

        if let Some(url) = outcome.url() {
            println!("{}", url);
        }

        if self.strict && !outcome.is_success() {
            Ok(ExitCode::FAILURE)
        } else {
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use parking_lot::Mutex;
    use reqwest::StatusCode;

    use super::*;
    use crate::{
        config::Config,
        error::UploadError,
        upload::{ChunkRequest, Transport, TransportResponse},
    };

    struct CountingTransport {
        status: u16,
        calls: std::sync::Arc<Mutex<usize>>,
    }

    #[async_trait::async_trait]
    impl Transport for CountingTransport {
        async fn send(&self, _: ChunkRequest) -> Result<TransportResponse, UploadError> {
            *self.calls.lock() += 1;
            Ok(TransportResponse {
                status: StatusCode::from_u16(self.status).unwrap(),
                body: Bytes::from_static(br#"{"status":"success","data":{"url":"https://x/y"}}"#),
            })
        }
    }

    fn test_context(status: u16) -> (Context, std::sync::Arc<Mutex<usize>>) {
        let calls = std::sync::Arc::new(Mutex::new(0));
        let transport = CountingTransport {
            status,
            calls: calls.clone(),
        };
        let context = Context::with_transport(Config::new("s3cr3t"), Box::new(transport));
        (context, calls)
    }

    fn args(file: PathBuf, strict: bool) -> UploadArgs {
        UploadArgs {
            file,
            wait_timeout: Some(1),
            strict,
        }
    }

    #[tokio::test]
    async fn missing_file_exits_zero_without_requests() {
        let dir = tempfile::tempdir().unwrap();
        let (mut context, calls) = test_context(200);

        let code = args(dir.path().join("gone.bin"), false)
            .run(&mut context)
            .await
            .unwrap();

        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(*calls.lock(), 0);
    }

    #[tokio::test]
    async fn strict_mode_fails_on_reported_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (mut context, _) = test_context(200);
        let code = args(dir.path().join("gone.bin"), true)
            .run(&mut context)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::FAILURE);

        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"hello").unwrap();
        let (mut context, calls) = test_context(500);
        let code = args(path, true).run(&mut context).await.unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert_eq!(*calls.lock(), 1);
    }

    struct StalledTransport;

    #[async_trait::async_trait]
    impl Transport for StalledTransport {
        async fn send(&self, _: ChunkRequest) -> Result<TransportResponse, UploadError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancel_interrupts_a_stalled_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"hello").unwrap();
        let mut context =
            Context::with_transport(Config::new("s3cr3t"), Box::new(StalledTransport));

        let cancel = context.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let run = args(path, false);
        let err = tokio::time::timeout(Duration::from_secs(5), run.run(&mut context))
            .await
            .expect("run should stop once cancelled")
            .unwrap_err();
        assert!(err.to_string().contains("interrupted"));
    }

    #[tokio::test]
    async fn small_file_uploads_in_one_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"hello").unwrap();
        let (mut context, calls) = test_context(200);

        let code = args(path, true).run(&mut context).await.unwrap();

        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(*calls.lock(), 1);
    }
}
