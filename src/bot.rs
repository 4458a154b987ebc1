use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use async_read_progress::TokioAsyncReadProgressExt;
use async_trait::async_trait;
use chrono::Utc;
use grammers_client::{
    types::{Attribute, Chat, Message, User},
    Client, InputMessage, Update,
};
use log::{error, info, warn};
use tokio::sync::Mutex;

use crate::command::{route, ChatKind, Route};
use crate::error::FetchError;
use crate::extractor::YtDlp;
use crate::media;
use crate::models::{DownloadedAsset, VideoMetadata, VideoRequest};
use crate::workflow::{Delivery, Workflow};

const START_TEXT: &str = "🎵 <b>TikTok Video Downloader Bot</b>\n\
    \n\
    <b>How to use:</b>\n\
    1. Send me any TikTok video URL\n\
    2. I'll download and send you the video\n\
    3. Max video length: 3 minutes\n\
    \n\
    <b>Supported URLs:</b>\n\
    \u{2022} tiktok.com/...\n\
    \u{2022} vm.tiktok.com/...\n\
    \u{2022} vt.tiktok.com/...\n\
    \n\
    In groups, use <code>/download &lt;url&gt;</code>\n\
    \n\
    <b>Commands:</b>\n\
    /start - Show this help\n\
    /help - Get assistance";

const HELP_TEXT: &str = "🤖 <b>Need Help?</b>\n\
    \n\
    <b>Just send me a TikTok URL and I'll download the video for you!</b>\n\
    \n\
    <b>Examples of supported URLs:</b>\n\
    \u{2022} https://www.tiktok.com/@username/video/123456789\n\
    \u{2022} https://vm.tiktok.com/ABC123/\n\
    \u{2022} https://vt.tiktok.com/XYZ789/\n\
    \n\
    <b>Limitations:</b>\n\
    \u{274c} Max 3 minutes per video\n\
    \u{274c} Max 50MB per video\n\
    \u{274c} TikTok links only";

const DOWNLOADING_TEXT: &str = "⏬ Downloading your TikTok video...";
const SENT_TEXT: &str = "✅ Video downloaded and sent successfully!";

/// Bot is the main struct of the bot.
/// All the chat handling is implemented in this struct.
pub struct Bot {
    client: Client,
    me: User,
    workflow: Workflow<YtDlp>,
}

impl Bot {
    pub async fn new(client: Client, workflow: Workflow<YtDlp>) -> Result<Arc<Self>> {
        let me = client.get_me().await?;
        info!("Signed in as @{}", me.username().unwrap_or_default());

        Ok(Arc::new(Self {
            client,
            me,
            workflow,
        }))
    }

    /// Main loop to receive updates asynchronously
    pub async fn run(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, exiting");
                    break;
                }
                Ok(update) = self.client.next_update() => {
                    let self_ = Arc::clone(&self);

                    // One task per update so a slow download never blocks other chats
                    tokio::spawn(async move {
                        if let Err(err) = self_.handle_update(update).await {
                            error!("Error handling update: {}", err);
                        }
                    });
                }
            }
        }
    }

    async fn handle_update(&self, update: Update) -> Result<()> {
        match update {
            Update::NewMessage(msg) if !msg.outgoing() => self.handle_message(msg).await,
            _ => Ok(()),
        }
    }

    /// Process incoming messages with commands or URLs
    async fn handle_message(&self, msg: Message) -> Result<()> {
        let chat = match msg.chat() {
            Chat::User(_) => ChatKind::Private,
            Chat::Group(_) => ChatKind::Group,
            _ => return Ok(()),
        };

        let me = self.me.username().unwrap_or_default();
        match route(msg.text(), chat, me) {
            Route::Ignore => {
                if msg.text().starts_with('/') {
                    warn!("Ignoring command {:?} in chat {}", msg.text(), msg.chat().id());
                }
                Ok(())
            }
            Route::Start => self.reply_html(&msg, START_TEXT).await,
            Route::Help => self.reply_html(&msg, HELP_TEXT).await,
            Route::Download(arg) => self.handle_download(msg, arg).await,
            Route::Link => match VideoRequest::from_text(msg.text()) {
                Some(request) => self.handle_request(msg, request).await,
                None => self.reject(&msg, FetchError::InvalidUrl).await,
            },
        }
    }

    async fn reply_html(&self, msg: &Message, text: &str) -> Result<()> {
        msg.reply(InputMessage::html(text)).await?;
        Ok(())
    }

    async fn reject(&self, msg: &Message, err: FetchError) -> Result<()> {
        msg.reply(format!("❌ {}", err)).await?;
        Ok(())
    }

    /// Handle /download command in groups
    async fn handle_download(&self, msg: Message, arg: Option<String>) -> Result<()> {
        let arg = match arg {
            Some(arg) => arg,
            None => {
                msg.reply("Please specify a TikTok URL: /download <url>").await?;
                return Ok(());
            }
        };

        match VideoRequest::from_text(&arg) {
            Some(request) => self.handle_request(msg, request).await,
            None => self.reject(&msg, FetchError::InvalidUrl).await,
        }
    }

    /// Run the download pipeline and report the outcome in the status message.
    async fn handle_request(&self, msg: Message, request: VideoRequest) -> Result<()> {
        info!(
            "Accepted {} from chat {} (message: {:?})",
            request.url,
            msg.chat().id(),
            request.text
        );

        let status = Arc::new(Mutex::new(msg.reply(DOWNLOADING_TEXT).await?));
        let delivery = ChatDelivery {
            client: &self.client,
            msg: &msg,
            status: Arc::clone(&status),
            uploading: Arc::new(AtomicBool::new(false)),
        };

        let text = match self.workflow.run(&request, &delivery).await {
            Ok(delivered) => {
                info!(
                    "Sent {:?} ({}) to chat {}",
                    delivered.title,
                    bytesize::to_string(delivered.size, true),
                    msg.chat().id()
                );
                SENT_TEXT.to_string()
            }
            Err(err) => {
                match &err {
                    FetchError::Unexpected(cause) => {
                        error!("Error processing {}: {}", request.url, cause)
                    }
                    other => info!("Request for {} ended: {}", request.url, other),
                }
                format!("❌ {}", err)
            }
        };

        status.lock().await.edit(text).await?;
        Ok(())
    }
}

/// Uploads a finished download as a reply to the requesting message.
struct ChatDelivery<'a> {
    client: &'a Client,
    msg: &'a Message,
    status: Arc<Mutex<Message>>,
    uploading: Arc<AtomicBool>,
}

#[async_trait]
impl Delivery for ChatDelivery<'_> {
    async fn send_video(
        &self,
        asset: &DownloadedAsset,
        metadata: &VideoMetadata,
        caption: &str,
    ) -> Result<()> {
        let length = asset.size as usize;
        let name = asset
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("video.mp4")
            .to_string();
        let video = media::video_info(&asset.path, metadata.duration_secs).await;

        let file = tokio::fs::File::open(&asset.path).await?;
        self.uploading.store(true, Ordering::SeqCst);

        let mut stream = file.report_progress(Duration::from_secs(3), {
            let status = Arc::clone(&self.status);
            let uploading = Arc::clone(&self.uploading);
            move |progress| {
                let status = Arc::clone(&status);
                let uploading = Arc::clone(&uploading);
                tokio::spawn(async move {
                    let status = status.lock().await;
                    if !uploading.load(Ordering::SeqCst) {
                        return;
                    }
                    status
                        .edit(InputMessage::html(format!(
                            "⏳ Uploading <b>({:.2}%)</b>\n<i>{} / {}</i>",
                            progress as f64 / length.max(1) as f64 * 100.0,
                            bytesize::to_string(progress as u64, true),
                            bytesize::to_string(length as u64, true),
                        )))
                        .await
                        .ok();
                });
            }
        });

        let start_time = Utc::now();
        let uploaded = self.client.upload_stream(&mut stream, length, name.clone()).await;
        self.uploading.store(false, Ordering::SeqCst);
        let uploaded = uploaded?;
        let elapsed = Utc::now() - start_time;

        info!(
            "Uploaded {} ({}) in {:.2} secs",
            name,
            bytesize::to_string(asset.size, true),
            elapsed.num_milliseconds() as f64 / 1000.0
        );

        let input = InputMessage::html(caption)
            .document(uploaded)
            .attribute(Attribute::Video {
                supports_streaming: true,
                duration: video.duration,
                w: video.width,
                h: video.height,
                round_message: false,
            });
        self.msg.reply(input).await?;

        Ok(())
    }
}
