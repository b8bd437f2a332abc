//! Typed SSE event structures for the OpenAI Responses stream.
//!
//! Parse errors happen at the serde boundary, not scattered through parsing
//! logic. Only the events that carry output text or end the stream are
//! modelled; everything else lands in `Unknown`.

pub mod openai {
    use serde::Deserialize;

    /// Top-level Responses SSE event, tagged by `type` field.
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    pub enum Event {
        #[serde(rename = "response.output_text.delta")]
        OutputTextDelta {
            item_id: Option<String>,
            delta: Option<String>,
        },
        #[serde(rename = "response.output_text.done")]
        OutputTextDone {
            item_id: Option<String>,
            text: Option<String>,
        },
        #[serde(rename = "response.refusal.delta")]
        RefusalDelta { delta: Option<String> },
        #[serde(rename = "response.completed")]
        Completed { response: Option<ResponseInfo> },
        #[serde(rename = "response.incomplete")]
        Incomplete { response: Option<ResponseInfo> },
        #[serde(rename = "response.failed")]
        Failed {
            response: Option<ResponseInfo>,
            error: Option<ErrorInfo>,
        },
        #[serde(rename = "error")]
        Error { error: Option<ErrorInfo> },
        /// Unknown event type - forward compatibility
        #[serde(other)]
        Unknown,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseInfo {
        pub usage: Option<Usage>,
        pub error: Option<ErrorInfo>,
        pub incomplete_details: Option<IncompleteDetails>,
    }

    #[derive(Debug, Deserialize, Default)]
    pub struct Usage {
        #[serde(default)]
        pub input_tokens: u32,
        #[serde(default)]
        pub output_tokens: u32,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorInfo {
        pub message: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct IncompleteDetails {
        pub reason: Option<String>,
    }

}
