//! Built-in n8n <-> Make node table.
//!
//! Every pair is written once and expanded into both directions, so the base
//! table is one-to-one by construction.

use serde_json::{Map, Value, json};

use super::transform::ValueTransform;
use super::types::{MappingTables, NodeMappingEntry};
use crate::platform::Direction;

struct BasePair {
    n8n: &'static str,
    n8n_version: u32,
    n8n_name: &'static str,
    make: &'static str,
    make_version: u32,
    make_label: &'static str,
    accuracy: u8,
    /// n8n parameter -> Make parameter.
    params: &'static [(&'static str, &'static str)],
    /// Keyed by n8n parameter; applied on the way to Make and inverted on the
    /// way back.
    transforms: &'static [(&'static str, ValueTransform)],
    /// Filled in on the way to Make when n8n omitted a parameter at its default.
    n8n_defaults: &'static [(&'static str, &'static str)],
    note: Option<&'static str>,
}

const BASE: &[BasePair] = &[
    BasePair {
        n8n: "n8n-nodes-base.httpRequest",
        n8n_version: 4,
        n8n_name: "HTTP Request",
        make: "http:ActionSendData",
        make_version: 3,
        make_label: "HTTP - Make a request",
        accuracy: 90,
        params: &[
            ("url", "url"),
            ("method", "method"),
            ("headers", "headers"),
            ("queryParameters", "qs"),
            ("body", "data"),
            ("bodyContentType", "bodyType"),
            ("timeout", "timeout"),
            ("followRedirects", "followRedirect"),
        ],
        transforms: &[("followRedirects", ValueTransform::BooleanToString)],
        n8n_defaults: &[("method", "GET")],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.webhook",
        n8n_version: 2,
        n8n_name: "Webhook",
        make: "gateway:CustomWebHook",
        make_version: 1,
        make_label: "Webhooks - Custom webhook",
        accuracy: 80,
        params: &[("path", "hook"), ("httpMethod", "method")],
        transforms: &[],
        n8n_defaults: &[],
        note: Some("Make webhooks are created in the scenario; re-link the hook after import."),
    },
    BasePair {
        n8n: "n8n-nodes-base.respondToWebhook",
        n8n_version: 1,
        n8n_name: "Respond to Webhook",
        make: "gateway:WebhookRespond",
        make_version: 1,
        make_label: "Webhooks - Webhook response",
        accuracy: 85,
        params: &[
            ("responseBody", "body"),
            ("responseCode", "status"),
            ("options.responseHeaders", "headers"),
        ],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.set",
        n8n_version: 3,
        n8n_name: "Edit Fields",
        make: "util:SetVariables",
        make_version: 1,
        make_label: "Tools - Set multiple variables",
        accuracy: 75,
        params: &[("assignments", "variables"), ("include", "scope")],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.if",
        n8n_version: 2,
        n8n_name: "If",
        make: "builtin:BasicRouter",
        make_version: 1,
        make_label: "Router",
        accuracy: 70,
        params: &[],
        transforms: &[],
        n8n_defaults: &[],
        note: Some("Conditions become route filters in Make and must be re-entered."),
    },
    BasePair {
        n8n: "n8n-nodes-base.switch",
        n8n_version: 3,
        n8n_name: "Switch",
        make: "util:Switcher",
        make_version: 1,
        make_label: "Tools - Switch",
        accuracy: 60,
        params: &[("rules", "cases"), ("fallbackOutput", "else")],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.code",
        n8n_version: 2,
        n8n_name: "Code",
        make: "code:ExecuteCode",
        make_version: 1,
        make_label: "Code - Run code",
        accuracy: 75,
        params: &[("jsCode", "code"), ("language", "language")],
        transforms: &[],
        n8n_defaults: &[("language", "javaScript")],
        note: Some("Code is copied verbatim; data access differs between platforms."),
    },
    BasePair {
        n8n: "n8n-nodes-base.wait",
        n8n_version: 1,
        n8n_name: "Wait",
        make: "util:FunctionSleep",
        make_version: 1,
        make_label: "Tools - Sleep",
        accuracy: 85,
        params: &[("amount", "duration")],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.splitOut",
        n8n_version: 1,
        n8n_name: "Split Out",
        make: "builtin:BasicFeeder",
        make_version: 1,
        make_label: "Iterator",
        accuracy: 90,
        params: &[("fieldToSplitOut", "array")],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.aggregate",
        n8n_version: 1,
        n8n_name: "Aggregate",
        make: "builtin:BasicAggregator",
        make_version: 1,
        make_label: "Array aggregator",
        accuracy: 70,
        params: &[("fieldsToAggregate", "target")],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.googleSheets",
        n8n_version: 4,
        n8n_name: "Google Sheets",
        make: "google-sheets:addRow",
        make_version: 2,
        make_label: "Google Sheets - Add a row",
        accuracy: 80,
        params: &[
            ("documentId", "spreadsheetId"),
            ("sheetName", "sheetId"),
            ("columns", "values"),
        ],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.slack",
        n8n_version: 2,
        n8n_name: "Slack",
        make: "slack:CreateMessage",
        make_version: 4,
        make_label: "Slack - Create a message",
        accuracy: 85,
        params: &[
            ("channelId", "channel"),
            ("text", "text"),
            ("otherOptions.mrkdwn", "mrkdwn"),
            ("otherOptions.thread_ts", "threadTs"),
        ],
        transforms: &[("otherOptions.mrkdwn", ValueTransform::BooleanToString)],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.emailSend",
        n8n_version: 2,
        n8n_name: "Send Email",
        make: "email:ActionSendEmail",
        make_version: 7,
        make_label: "Email - Send an email",
        accuracy: 85,
        params: &[
            ("fromEmail", "from"),
            ("toEmail", "to"),
            ("subject", "subject"),
            ("text", "text"),
            ("html", "html"),
        ],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.gmail",
        n8n_version: 2,
        n8n_name: "Gmail",
        make: "google-email:ActionSendEmail",
        make_version: 2,
        make_label: "Gmail - Send an email",
        accuracy: 80,
        params: &[("sendTo", "to"), ("subject", "subject"), ("message", "content")],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.airtable",
        n8n_version: 2,
        n8n_name: "Airtable",
        make: "airtable:ActionCreateRecord",
        make_version: 3,
        make_label: "Airtable - Create a record",
        accuracy: 75,
        params: &[("base", "base"), ("table", "table"), ("columns", "record")],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.openAi",
        n8n_version: 1,
        n8n_name: "OpenAI",
        make: "openai-gpt-3:CreateCompletion",
        make_version: 1,
        make_label: "OpenAI - Create a completion",
        accuracy: 70,
        params: &[
            ("model", "model"),
            ("prompt", "prompt"),
            ("options.maxTokens", "max_tokens"),
            ("options.temperature", "temperature"),
        ],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.telegram",
        n8n_version: 1,
        n8n_name: "Telegram",
        make: "telegram:SendReplyMessage",
        make_version: 1,
        make_label: "Telegram Bot - Send a text message or a reply",
        accuracy: 85,
        params: &[
            ("chatId", "chatId"),
            ("text", "text"),
            ("additionalFields.parse_mode", "parseMode"),
        ],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.rssFeedRead",
        n8n_version: 1,
        n8n_name: "RSS Read",
        make: "rss:ActionReadArticles",
        make_version: 4,
        make_label: "RSS - Retrieve RSS feed items",
        accuracy: 90,
        params: &[("url", "url")],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.html",
        n8n_version: 1,
        n8n_name: "HTML",
        make: "regexp:HTMLToText",
        make_version: 1,
        make_label: "Text parser - HTML to text",
        accuracy: 65,
        params: &[("html", "html")],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.xml",
        n8n_version: 1,
        n8n_name: "XML",
        make: "xml:ParseXML",
        make_version: 1,
        make_label: "XML - Parse XML",
        accuracy: 75,
        params: &[("dataPropertyName", "xml")],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.spreadsheetFile",
        n8n_version: 2,
        n8n_name: "Spreadsheet File",
        make: "csv:ParseCSV",
        make_version: 1,
        make_label: "CSV - Parse CSV",
        accuracy: 65,
        params: &[
            ("options.delimiter", "delimiter"),
            ("options.headerRow", "containsHeaders"),
        ],
        transforms: &[("options.headerRow", ValueTransform::BooleanToString)],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.emailReadImap",
        n8n_version: 2,
        n8n_name: "Email Trigger (IMAP)",
        make: "email:TriggerNewEmail",
        make_version: 7,
        make_label: "Email - Watch emails",
        accuracy: 75,
        params: &[("mailbox", "folder"), ("options.customEmailConfig", "criteria")],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.googleDrive",
        n8n_version: 3,
        n8n_name: "Google Drive",
        make: "google-drive:uploadAFile",
        make_version: 4,
        make_label: "Google Drive - Upload a file",
        accuracy: 75,
        params: &[("name", "filename"), ("driveId", "drive"), ("folderId", "folder")],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
    BasePair {
        n8n: "n8n-nodes-base.discord",
        n8n_version: 2,
        n8n_name: "Discord",
        make: "discord:createMessage",
        make_version: 2,
        make_label: "Discord - Send a message",
        accuracy: 80,
        params: &[("content", "content"), ("channelId", "channelId")],
        transforms: &[],
        n8n_defaults: &[],
        note: None,
    },
];

impl BasePair {
    fn to_make(&self) -> NodeMappingEntry {
        let mut entry = NodeMappingEntry::new(self.n8n, self.make)
            .version(self.make_version)
            .display_name(self.make_label)
            .accuracy(self.accuracy);
        for (n8n, make) in self.params {
            entry = entry.param(*n8n, *make);
        }
        for (n8n, transform) in self.transforms {
            entry = entry.transform(*n8n, *transform);
        }
        for (n8n, value) in self.n8n_defaults {
            entry = entry.default_value(*n8n, Value::String(value.to_string()));
        }
        if let Some(note) = self.note {
            entry = entry.description(note);
        }
        entry
    }

    fn to_n8n(&self) -> NodeMappingEntry {
        let mut entry = NodeMappingEntry::new(self.make, self.n8n)
            .version(self.n8n_version)
            .display_name(self.n8n_name)
            .accuracy(self.accuracy);
        for (n8n, make) in self.params {
            entry = entry.param(*make, *n8n);
        }
        for (n8n, transform) in self.transforms {
            let renamed = self
                .params
                .iter()
                .find(|(source, _)| source == n8n)
                .map(|(_, make)| *make);
            if let (Some(make), Some(inverse)) = (renamed, transform.inverse()) {
                entry = entry.transform(make, inverse);
            }
        }
        if let Some(note) = self.note {
            entry = entry.description(note);
        }
        entry
    }
}

/// Fresh copy of the built-in table.
pub fn base_tables() -> MappingTables {
    let mut tables = MappingTables::new();
    for pair in BASE {
        tables.insert(Direction::N8nToMake, pair.to_make());
        tables.insert(Direction::MakeToN8n, pair.to_n8n());
    }
    tables
}

/// Make module type used for routers; its outputs are routes.
pub const MAKE_ROUTER: &str = "builtin:BasicRouter";

const N8N_IF: &str = "n8n-nodes-base.if";
const N8N_SWITCH: &str = "n8n-nodes-base.switch";

/// An n8n `if` has two outputs. A router mapped to it with more routes than
/// that becomes a `switch` with one output per route instead.
pub fn widen_router(entry: &NodeMappingEntry, routes: usize) -> Option<NodeMappingEntry> {
    if entry.source_type != MAKE_ROUTER || entry.target_type != N8N_IF || routes <= 2 {
        return None;
    }
    Some(
        NodeMappingEntry::new(MAKE_ROUTER, N8N_SWITCH)
            .version(3)
            .display_name("Switch")
            .description("Each route becomes a switch output; route filters must be re-entered as rules.")
            .accuracy(entry.accuracy),
    )
}

/// Switch parameters with one always-matching rule per route, so every route
/// receives the item as it does behind a Make router.
pub fn switch_rules(routes: usize) -> Map<String, Value> {
    let values: Vec<Value> = (1..=routes)
        .map(|n| {
            json!({
                "conditions": { "conditions": [], "combinator": "and" },
                "renameOutput": true,
                "outputKey": format!("Route {}", n)
            })
        })
        .collect();
    let mut params = Map::new();
    params.insert("mode".into(), json!("rules"));
    params.insert("rules".into(), json!({ "values": values }));
    params.insert("options".into(), json!({ "allMatchingOutputs": true }));
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_pair_lands_in_both_directions() {
        let tables = base_tables();
        assert_eq!(tables.n8n_to_make.len(), BASE.len());
        assert_eq!(tables.make_to_n8n.len(), BASE.len());
    }

    #[test]
    fn http_entry() {
        let tables = base_tables();
        let http = &tables.n8n_to_make["n8n-nodes-base.httpRequest"];
        assert_eq!(http.target_type, "http:ActionSendData");
        assert_eq!(http.target_version, Some(3));
        assert_eq!(http.parameter_map["body"], "data");
        assert_eq!(http.defaults["method"], json!("GET"));
        assert_eq!(http.transforms["followRedirects"], ValueTransform::BooleanToString);

        let back = &tables.make_to_n8n["http:ActionSendData"];
        assert_eq!(back.target_type, "n8n-nodes-base.httpRequest");
        assert_eq!(back.target_version, Some(4));
        assert_eq!(back.parameter_map["data"], "body");
        assert_eq!(back.transforms["followRedirect"], ValueTransform::StringToBoolean);
        assert!(back.defaults.is_empty());
    }

    #[test]
    fn router_pair() {
        let tables = base_tables();
        assert_eq!(tables.n8n_to_make["n8n-nodes-base.if"].target_type, MAKE_ROUTER);
    }

    #[test]
    fn wide_routers_become_switches() {
        let tables = base_tables();
        let router = &tables.make_to_n8n[MAKE_ROUTER];
        assert!(widen_router(router, 2).is_none());
        let wide = widen_router(router, 3).expect("three routes");
        assert_eq!(wide.target_type, "n8n-nodes-base.switch");
        assert_eq!(wide.display_name.as_deref(), Some("Switch"));
        assert_eq!(wide.accuracy, router.accuracy);
        assert!(widen_router(&tables.make_to_n8n["util:Switcher"], 5).is_none());

        let params = switch_rules(3);
        assert_eq!(params["rules"]["values"].as_array().map(Vec::len), Some(3));
        assert_eq!(params["rules"]["values"][2]["outputKey"], "Route 3");
        assert_eq!(params["options"]["allMatchingOutputs"], true);
    }
}
