// Tool descriptions and the get_current_time entry point
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::error;

use crate::config::TimeSourceConfig;
use crate::error::TimeError;
use crate::resolver::TimeResolver;

pub const GET_CURRENT_TIME: &str = "get_current_time";

pub fn get_tools_description_json() -> Value {
    json!([
        {
            "name": GET_CURRENT_TIME,
            "description": concat!(
                "Get the current time from an NTP server specified by NTP_SERVER env var ",
                "(default 'pool.ntp.org'), in time zone specified by TZ env var ",
                "(default system local)"
            ),
            "inputSchema": {
                "type": "object",
                "properties": {},
                "required": []
            },
            "annotations": {
                "title": "Get Current Time",
                "readOnlyHint": true,
                "destructiveHint": false,
                "idempotentHint": false,
                "openWorldHint": true
            }
        }
    ])
}

/// Resolve the time on its own task so the caller's dispatch loop stays free,
/// and return the single text the tool replies with.
pub async fn call_get_current_time(
    resolver: Arc<TimeResolver>,
    config: TimeSourceConfig,
) -> String {
    let task = tokio::spawn(async move { resolver.resolve(&config).await });
    match task.await {
        Ok(resolution) => resolution.into_text(),
        Err(e) => {
            error!(error = %e, "time resolution task did not complete");
            TimeError::TimeUnavailable(e.to_string()).to_string()
        }
    }
}

/// Wrap tool output as an MCP `tools/call` result with one text item.
pub fn text_result(text: String) -> Value {
    json!({
        "content": [
            {
                "type": "text",
                "text": text
            }
        ],
        "isError": false
    })
}
