//! Nexmo Call Control Objects.

use serde::Serialize;

/// Prompt played before the media stream is connected.
pub const DEFAULT_TALK_TEXT: &str = "担当者にお繋ぎいたしますので、このまま少々お待ちください。";
pub const DEFAULT_TALK_LANGUAGE: &str = "ja-JP";

/// Format of the media stream Vonage opens to `/media-stream`.
pub const MEDIA_CONTENT_TYPE: &str = "audio/l16;rate=16000";

/// One NCCO action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum NccoAction {
    Talk {
        text: String,
        language: String,
    },
    Connect {
        endpoint: Vec<NccoEndpoint>,
    },
}

/// Connect target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NccoEndpoint {
    Websocket {
        uri: String,
        #[serde(rename = "content-type")]
        content_type: String,
    },
}

/// Talk prompt, then bridge the call audio to `media_stream_url`.
pub fn answer_ncco(talk_text: &str, language: &str, media_stream_url: &str) -> Vec<NccoAction> {
    vec![
        NccoAction::Talk {
            text: talk_text.to_string(),
            language: language.to_string(),
        },
        NccoAction::Connect {
            endpoint: vec![NccoEndpoint::Websocket {
                uri: media_stream_url.to_string(),
                content_type: MEDIA_CONTENT_TYPE.to_string(),
            }],
        },
    ]
}
