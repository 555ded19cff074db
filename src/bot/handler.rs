use std::sync::Arc;

use anyhow::{Context, Result};

use crate::convert::convert_workbook_bytes;
use crate::settings::Settings;

use super::api::TelegramClient;
use super::types::{Document, Message};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const START_TEXT: &str = "Welcome! I can convert Excel timetables to ICS calendar files. \
Just send me an Excel file (.xlsx) and I'll convert it for you.";

pub const HELP_TEXT: &str = "Available commands:
/start - Start the bot
/help - Show this help message

To convert an Excel timetable:
1. Send me an Excel file (.xlsx)
2. I'll process it and send back an ICS calendar file
3. You can then import the ICS file into your calendar app

Note: The Excel file should follow the expected format with modules at the top and weekly timetables below.";

pub const NOT_XLSX_TEXT: &str = "Please send an Excel file (.xlsx) for conversion.";
pub const PROCESSING_TEXT: &str = "Processing your Excel file... Please wait.";
pub const FALLBACK_TEXT: &str = "Please send me an Excel file (.xlsx) to convert to ICS format, \
or use /help for more information.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Start,
    Help,
    Workbook(String),
    OtherDocument,
    Text,
    Ignored,
}

fn is_xlsx(document: &Document) -> bool {
    document
        .file_name
        .as_deref()
        .is_some_and(|name| name.to_lowercase().ends_with(".xlsx"))
}

pub fn classify(message: &Message) -> Incoming {
    if let Some(document) = &message.document {
        return if is_xlsx(document) {
            Incoming::Workbook(document.file_id.clone())
        } else {
            Incoming::OtherDocument
        };
    }

    match message.text.as_deref().map(str::trim) {
        // `/help@SomeBot` is how commands arrive in group chats.
        Some(text) if text.split('@').next() == Some("/start") => Incoming::Start,
        Some(text) if text.split('@').next() == Some("/help") => Incoming::Help,
        Some(_) => Incoming::Text,
        None => Incoming::Ignored,
    }
}

async fn convert_upload(
    client: &TelegramClient,
    settings: &Arc<Settings>,
    chat_id: i64,
    file_id: &str,
) -> Result<()> {
    let bytes = client
        .download_file(file_id)
        .await
        .context("Could not download the file")?;

    let converted = tokio::task::spawn_blocking({
        let settings = Arc::clone(settings);
        move || convert_workbook_bytes(bytes, &settings)
    })
    .await
    .context("conversion worker join failed")??;

    log_info!(
        "chat {}: converted '{}' ({} weeks, {} lessons)",
        chat_id,
        converted.name,
        converted.weeks,
        converted.lessons
    );

    let file_name = converted.file_name();
    client
        .send_document(chat_id, file_name, converted.ics.into_bytes())
        .await
}

pub async fn handle_message(client: &TelegramClient, settings: &Arc<Settings>, message: Message) -> Result<()> {
    let chat_id = message.chat.id;

    match classify(&message) {
        Incoming::Start => client.send_message(chat_id, START_TEXT).await,
        Incoming::Help => client.send_message(chat_id, HELP_TEXT).await,
        Incoming::OtherDocument => client.send_message(chat_id, NOT_XLSX_TEXT).await,
        Incoming::Text => client.send_message(chat_id, FALLBACK_TEXT).await,
        Incoming::Ignored => Ok(()),
        Incoming::Workbook(file_id) => {
            client.send_message(chat_id, PROCESSING_TEXT).await?;
            if let Err(err) = convert_upload(client, settings, chat_id, &file_id).await {
                log_warn!("chat {}: conversion failed: {err:#}", chat_id);
                client
                    .send_message(chat_id, &format!("Error processing file: {err:#}"))
                    .await?;
            }
            Ok(())
        }
    }
}
