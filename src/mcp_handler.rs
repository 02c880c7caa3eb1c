use anyhow::Result;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::use_cases::{DrawUseCase, TicketUseCase};

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;
const NOT_FOUND: i32 = -32004;

#[derive(Debug, serde::Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

#[derive(Debug, serde::Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

#[derive(Debug, serde::Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id: Some(id.unwrap_or(json!(1))),
        }
    }

    fn failure(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

fn parse_error(detail: String) -> JsonRpcResponse {
    let mut response = JsonRpcResponse::failure(None, PARSE_ERROR, "Parse error".to_string());
    if let Some(error) = response.error.as_mut() {
        error.data = Some(json!(detail));
    }
    response
}

fn write_response<W: Write>(writer: &mut W, response: &JsonRpcResponse) -> Result<()> {
    writeln!(writer, "{}", serde_json::to_string(response)?)?;
    writer.flush()?;
    Ok(())
}

/// Maps a use-case failure onto a JSON-RPC error code.
fn error_code(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<ServiceError>() {
        Some(ServiceError::Validation(_)) => INVALID_PARAMS,
        Some(ServiceError::NotFound(_)) => NOT_FOUND,
        None => INTERNAL_ERROR,
    }
}

pub struct MCPHandler {
    draw_use_case: Arc<DrawUseCase>,
    ticket_use_case: Arc<TicketUseCase>,
}

impl MCPHandler {
    pub fn new(draw_use_case: Arc<DrawUseCase>, ticket_use_case: Arc<TicketUseCase>) -> Self {
        Self {
            draw_use_case,
            ticket_use_case,
        }
    }

    /// Reads one JSON-RPC message per line until EOF.
    pub async fn serve<R, W>(self, reader: R, mut writer: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        for raw in reader.split(b'\n') {
            let line = match String::from_utf8(raw?) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Request is not valid UTF-8: {}", e);
                    write_response(&mut writer, &parse_error(e.to_string()))?;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => {
                    // Notifications get no reply
                    if request.id.is_none() || request.method.starts_with("notifications/") {
                        if request.method == "notifications/initialized" {
                            info!("🎰 Client initialized");
                        }
                        continue;
                    }
                    self.handle_request(request).await
                }
                Err(e) => {
                    warn!("Failed to parse request: {} - Line: {}", e, line);
                    parse_error(e.to_string())
                }
            };

            write_response(&mut writer, &response)?;
        }

        Ok(())
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => {
                info!("🎰 Initializing lotto collection server");
                JsonRpcResponse::success(
                    request.id,
                    json!({
                        "protocolVersion": "2024-11-05",
                        "capabilities": {
                            "tools": {}
                        },
                        "serverInfo": {
                            "name": "lotto-collection",
                            "version": env!("CARGO_PKG_VERSION")
                        }
                    }),
                )
            }
            "tools/list" => JsonRpcResponse::success(request.id, json!({ "tools": tools() })),
            "tools/call" => self.handle_call_tool(request.params, request.id).await,
            other => JsonRpcResponse::failure(
                Some(request.id.unwrap_or(json!(1))),
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        }
    }

    async fn handle_call_tool(&self, params: Option<Value>, id: Option<Value>) -> JsonRpcResponse {
        let id = Some(id.unwrap_or(json!(1)));

        let Some(params) = params else {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params".to_string());
        };

        let Some(tool_name) = params.get("name").and_then(|n| n.as_str()) else {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing tool name".to_string());
        };

        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
        let arguments_map: HashMap<String, Value> =
            serde_json::from_value(arguments).unwrap_or_default();

        match self.execute_tool(tool_name, &arguments_map).await {
            Ok(content) => JsonRpcResponse::success(
                id,
                json!({
                    "content": [
                        {
                            "type": "text",
                            "text": content
                        }
                    ]
                }),
            ),
            Err(e) => {
                warn!("Tool {} failed: {:#}", tool_name, e);
                JsonRpcResponse::failure(
                    id,
                    error_code(&e),
                    format!("Tool execution error: {}", e),
                )
            }
        }
    }

    async fn execute_tool(
        &self,
        tool_name: &str,
        arguments: &HashMap<String, Value>,
    ) -> Result<String> {
        let draws = &self.draw_use_case;
        let tickets = &self.ticket_use_case;

        match tool_name {
            "create_draw" => draws.create_draw(arguments).await,
            "list_draws" => draws.list_draws(arguments).await,
            "get_draw" => draws.get_draw(arguments).await,
            "get_latest_draw" => draws.get_latest_draw(arguments).await,
            "update_draw" => draws.update_draw(arguments).await,
            "delete_draw" => draws.delete_draw(arguments).await,
            "recompute_draw" => draws.recompute_draw(arguments).await,
            "check_ticket" => draws.check_ticket(arguments).await,
            "create_ticket" => tickets.create_ticket(arguments).await,
            "list_tickets" => tickets.list_tickets(arguments).await,
            "collection_summary" => tickets.collection_summary(arguments).await,
            "update_ticket" => tickets.update_ticket(arguments).await,
            "delete_ticket" => tickets.delete_ticket(arguments).await,
            "clear_collection" => tickets.clear_collection(arguments).await,
            _ => Err(ServiceError::Validation(format!("Unknown tool: {}", tool_name)).into()),
        }
    }
}

fn draw_fields_schema() -> Value {
    json!({
        "date": { "type": "string", "description": "Draw date in YYYY-MM-DD format" },
        "prize1": { "type": "string", "description": "6-digit first prize number" },
        "first3A": { "type": "string", "description": "First 3-digit front number" },
        "first3B": { "type": "string", "description": "Second 3-digit front number" },
        "last3A": { "type": "string", "description": "First 3-digit back number" },
        "last3B": { "type": "string", "description": "Second 3-digit back number" },
        "last2": { "type": "string", "description": "2-digit back number" }
    })
}

fn ticket_fields_schema() -> Value {
    json!({
        "owner_email": { "type": "string", "description": "Email of the authenticated owner" },
        "ticketNumber": { "type": "string", "description": "Ticket number, digits only" },
        "quantity": { "type": "integer", "description": "Number of tickets, greater than 0" },
        "amountPaid": { "type": "integer", "description": "Amount paid, greater than 0" },
        "purchaseDate": { "type": "string", "description": "Optional RFC 3339 timestamp, defaults to now" },
        "drawDateRef": { "type": "string", "description": "Optional draw date (YYYY-MM-DD) to check against" }
    })
}

fn with_id(mut properties: Value, description: &str) -> Value {
    if let Some(map) = properties.as_object_mut() {
        map.insert(
            "id".to_string(),
            json!({ "type": "integer", "description": description }),
        );
    }
    properties
}

const DRAW_REQUIRED: [&str; 7] = [
    "date", "prize1", "first3A", "first3B", "last3A", "last3B", "last2",
];

fn tools() -> Vec<Tool> {
    let owner_only = json!({
        "type": "object",
        "properties": {
            "owner_email": { "type": "string", "description": "Email of the authenticated owner" }
        },
        "required": ["owner_email"]
    });

    vec![
        Tool {
            name: "create_draw",
            description: "Publish the official result for a draw date (admin)",
            input_schema: json!({
                "type": "object",
                "properties": draw_fields_schema(),
                "required": DRAW_REQUIRED
            }),
        },
        Tool {
            name: "list_draws",
            description: "List every published draw, newest first",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        Tool {
            name: "get_draw",
            description: "Get a draw by id, or by date when no id is given",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer", "description": "Draw id" },
                    "date": { "type": "string", "description": "Draw date in YYYY-MM-DD format" }
                }
            }),
        },
        Tool {
            name: "get_latest_draw",
            description: "Get the most recent draw, or null when none exist",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        Tool {
            name: "update_draw",
            description: "Edit a draw and re-evaluate the tickets that reference it (admin)",
            input_schema: json!({
                "type": "object",
                "properties": with_id(draw_fields_schema(), "Draw id"),
                "required": ["id", "date", "prize1", "first3A", "first3B", "last3A", "last3B", "last2"]
            }),
        },
        Tool {
            name: "delete_draw",
            description: "Delete a draw and reset prize results on every ticket that referenced it (admin)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer", "description": "Draw id" }
                },
                "required": ["id"]
            }),
        },
        Tool {
            name: "recompute_draw",
            description: "Re-evaluate every ticket referencing a draw date (admin)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "date": { "type": "string", "description": "Draw date in YYYY-MM-DD format" }
                },
                "required": ["date"]
            }),
        },
        Tool {
            name: "check_ticket",
            description: "Check a ticket number against a published draw without saving it",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ticketNumber": { "type": "string", "description": "Ticket number" },
                    "date": { "type": "string", "description": "Draw date in YYYY-MM-DD format" }
                },
                "required": ["ticketNumber", "date"]
            }),
        },
        Tool {
            name: "create_ticket",
            description: "Add a ticket to the owner's collection, checking it when a draw date is given",
            input_schema: json!({
                "type": "object",
                "properties": ticket_fields_schema(),
                "required": ["owner_email", "ticketNumber", "quantity", "amountPaid"]
            }),
        },
        Tool {
            name: "list_tickets",
            description: "List the owner's ticket collection",
            input_schema: owner_only.clone(),
        },
        Tool {
            name: "collection_summary",
            description: "Totals for the owner's collection: tickets, spending, winnings, net profit and the last six months of spending",
            input_schema: owner_only.clone(),
        },
        Tool {
            name: "update_ticket",
            description: "Replace a ticket in the owner's collection and re-check it",
            input_schema: json!({
                "type": "object",
                "properties": with_id(ticket_fields_schema(), "Ticket id"),
                "required": ["owner_email", "id", "ticketNumber", "quantity", "amountPaid"]
            }),
        },
        Tool {
            name: "delete_ticket",
            description: "Remove a ticket from the owner's collection",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "owner_email": { "type": "string", "description": "Email of the authenticated owner" },
                    "id": { "type": "integer", "description": "Ticket id" }
                },
                "required": ["owner_email", "id"]
            }),
        },
        Tool {
            name: "clear_collection",
            description: "Remove every ticket the owner has",
            input_schema: owner_only,
        },
    ]
}

pub fn stdio() -> (BufReader<io::Stdin>, io::Stdout) {
    (BufReader::new(io::stdin()), io::stdout())
}
