//! Gauge MCP Server
//!
//! Line-delimited JSON-RPC over stdio.
//!
//! Tools:
//! - render: Render a template with conversion filters
//! - convert: Run one conversion filter and report why it failed, if it did
//! - help: Documentation for a filter, or the overview
//! - list_filters: Filters, optionally by kind
//! - list_units: Accepted units and spellings, optionally by kind
//!
//! Environment:
//! - GAUGE_CONFIG_PATH: host configuration JSON; must carry `unit_conversions`
//! - GAUGE_STATES_PATH: JSON array of entity states, re-read on each lookup
//! - RUST_LOG: log filter, `info` when unset

mod states;

use gauge::config::{default_host_config, load_host_config};
use gauge::Gauge;
use gauge_core::{GaugeError, Value};
use gauge_plugin::{StateProvider, StateSnapshot};
use gauge_units::QuantityKind;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use states::FileStates;
use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const PROTOCOL_VERSION: &str = "2025-11-25";
const SERVER_NAME: &str = "gauge";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

// MCP Protocol types
#[derive(Debug, Deserialize)]
struct McpRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<JsonValue>,
    method: String,
    #[serde(default)]
    params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
struct McpResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<McpError>,
}

#[derive(Debug, Serialize)]
struct McpError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<JsonValue>,
}

impl McpError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self { code: INVALID_PARAMS, message: message.into(), data: None }
    }
}

impl McpResponse {
    fn reply(id: Option<JsonValue>, result: Result<JsonValue, McpError>) -> Self {
        match result {
            Ok(r) => Self { jsonrpc: "2.0".to_string(), id, result: Some(r), error: None },
            Err(e) => Self { jsonrpc: "2.0".to_string(), id, result: None, error: Some(e) },
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn host_config() -> Result<JsonValue, GaugeError> {
    match env::var_os("GAUGE_CONFIG_PATH") {
        Some(path) => load_host_config(&PathBuf::from(path)),
        None => Ok(default_host_config()),
    }
}

fn state_provider() -> Arc<dyn StateProvider> {
    match env::var_os("GAUGE_STATES_PATH") {
        Some(path) => {
            let path = PathBuf::from(path);
            info!(path = %path.display(), "reading entity states from file");
            Arc::new(FileStates::new(path))
        }
        None => {
            warn!("GAUGE_STATES_PATH not set, entity references will not resolve");
            Arc::new(StateSnapshot::new())
        }
    }
}

fn main() {
    init_tracing();

    let host = match host_config() {
        Ok(host) => host,
        Err(e) => {
            error!(code = %e.code, "{}", e.message);
            std::process::exit(1);
        }
    };
    let gauge = match gauge::setup(&host, state_provider()) {
        Some(gauge) => gauge,
        None => {
            error!("host configuration does not enable unit_conversions");
            std::process::exit(1);
        }
    };

    info!(version = SERVER_VERSION, protocol = PROTOCOL_VERSION, "Gauge MCP server started");

    let stdin = io::stdin();
    let mut reader = io::BufReader::new(stdin.lock());

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                info!("client disconnected");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let Some(response) = handle_line(&gauge, line) else {
                    continue;
                };
                if let Err(e) = send(&response) {
                    error!(error = %e, "failed to write response");
                    break;
                }
            }
            Err(e) => {
                error!(error = %e, "failed to read input");
                break;
            }
        }
    }

    info!("server shutting down");
}

fn send(response: &McpResponse) -> io::Result<()> {
    let response_json = serde_json::to_string(response)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", response_json)?;
    stdout.flush()
}

/// Handle one input line. Notifications get no response.
fn handle_line(gauge: &Gauge, line: &str) -> Option<McpResponse> {
    let request: McpRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "unparseable request");
            return Some(McpResponse::reply(None, Err(McpError {
                code: PARSE_ERROR,
                message: format!("Parse error: {}", e),
                data: None,
            })));
        }
    };

    debug!(method = %request.method, "processing");
    let response = handle_request(gauge, &request);

    if request.id.is_none() {
        debug!(method = %request.method, "notification processed");
        return None;
    }
    Some(response)
}

fn handle_request(gauge: &Gauge, request: &McpRequest) -> McpResponse {
    let result = match request.method.as_str() {
        "initialize" => handle_initialize(&request.params),
        "initialized" | "notifications/initialized" | "ping" => Ok(json!({})),
        "tools/list" => Ok(tools_list()),
        "tools/call" => handle_tool_call(gauge, &request.params),
        _ => Err(McpError {
            code: METHOD_NOT_FOUND,
            message: format!("Method not found: {}", request.method),
            data: None,
        }),
    };
    McpResponse::reply(request.id.clone(), result)
}

fn handle_initialize(params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let client = params.as_ref()
        .and_then(|p| p.get("clientInfo"))
        .and_then(|c| c.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("unknown");

    let client_protocol = params.as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(PROTOCOL_VERSION);

    info!(client, protocol = client_protocol, "client connected");

    Ok(json!({
        "protocolVersion": client_protocol,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "description": "Power, energy, flow and temperature conversion filters for templates"
        },
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "instructions": "Render templates such as \"{{ 'sensor.grid_power' | kilowatts | round(2) }}\" with 'render'. Use 'list_units' to see which unit spellings each kind accepts and 'convert' to find out why a conversion rendered None."
    }))
}

fn kind_schema() -> JsonValue {
    json!({
        "type": "string",
        "enum": QuantityKind::ALL.iter().map(|k| k.name()).collect::<Vec<_>>(),
        "description": "Quantity kind"
    })
}

fn tools_list() -> JsonValue {
    json!({
        "tools": [
            {
                "name": "render",
                "description": "Render a template. {{ expr }} blocks may pipe numbers or entity ids through conversion filters: {{ 5000 | kilowatts('W') }}, {{ 'sensor.boiler' | fahrenheit }}. Conversions that cannot be made render as None.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "template": { "type": "string", "description": "Template text" },
                        "variables": { "type": "object", "description": "Variables visible to expressions" }
                    },
                    "required": ["template"]
                }
            },
            {
                "name": "convert",
                "description": "Run one conversion filter and return the number, or the reason it failed",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "filter": { "type": "string", "description": "Filter name or alias, e.g. kilowatts, kwh, c" },
                        "value": { "description": "Number, numeric text, or entity id such as sensor.grid_power" },
                        "unit": { "type": "string", "description": "Unit of the value; optional for entities" }
                    },
                    "required": ["filter", "value"]
                }
            },
            {
                "name": "help",
                "description": "Documentation for a filter, or an overview of all filters",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Filter name or alias" }
                    }
                }
            },
            {
                "name": "list_filters",
                "description": "List filters, optionally one category (power, energy, flow, temperature, builtin)",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "category": { "type": "string", "description": "Category to list" }
                    }
                }
            },
            {
                "name": "list_units",
                "description": "Units each kind accepts, with their spellings and filters",
                "inputSchema": {
                    "type": "object",
                    "properties": { "kind": kind_schema() }
                }
            }
        ]
    })
}

fn handle_tool_call(gauge: &Gauge, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let params = params.as_ref().ok_or_else(|| McpError::invalid_params("Missing params"))?;

    let name = params.get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing tool name"))?;

    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    match name {
        "render" => tool_render(gauge, &args),
        "convert" => tool_convert(gauge, &args),
        "help" => tool_help(gauge, &args),
        "list_filters" => tool_list_filters(gauge, &args),
        "list_units" => tool_list_units(gauge, &args),
        _ => Err(McpError::invalid_params(format!("Unknown tool: {}", name))),
    }
}

fn error_json(e: &GaugeError) -> JsonValue {
    serde_json::to_value(e).unwrap_or_else(|_| json!({"code": e.code, "message": e.message}))
}

fn tool_render(gauge: &Gauge, args: &JsonValue) -> Result<JsonValue, McpError> {
    let template = args.get("template")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing template argument"))?;

    let variables: HashMap<String, Value> = args.get("variables")
        .and_then(|v| v.as_object())
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect())
        .unwrap_or_default();

    let result = gauge.render(template, &variables);

    Ok(json!({
        "content": [{ "type": "text", "text": result.output }],
        "values": result.values.iter().map(Value::to_json).collect::<Vec<_>>(),
        "errors": result.errors.iter().map(error_json).collect::<Vec<_>>(),
        "isError": !result.is_ok()
    }))
}

fn tool_convert(gauge: &Gauge, args: &JsonValue) -> Result<JsonValue, McpError> {
    let filter = args.get("filter")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing filter argument"))?;
    let value = args.get("value")
        .map(Value::from_json)
        .ok_or_else(|| McpError::invalid_params("Missing value argument"))?;
    let unit = match args.get("unit") {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(s)) => Some(s.as_str()),
        Some(_) => return Err(McpError::invalid_params("unit must be a string")),
    };

    Ok(match gauge.convert(filter, &value, unit) {
        Ok(n) => json!({
            "content": [{ "type": "text", "text": gauge_core::format_number(n) }],
            "value": Value::Number(n).to_json(),
            "isError": false
        }),
        Err(e) => json!({
            "content": [{ "type": "text", "text": format!("None ({})", e.message) }],
            "error": error_json(&e),
            "isError": true
        }),
    })
}

fn tool_help(gauge: &Gauge, args: &JsonValue) -> Result<JsonValue, McpError> {
    let name = args.get("name").and_then(|v| v.as_str());
    let help = gauge.help(name);
    if let Value::Error(e) = &help {
        return Err(McpError {
            code: INVALID_PARAMS,
            message: e.message.clone(),
            data: Some(error_json(e)),
        });
    }
    Ok(json!({
        "content": [{ "type": "text", "text": format_help(&help) }],
        "data": help.to_json()
    }))
}

/// Markdown summary of a help value
fn format_help(help: &Value) -> String {
    let Some(map) = help.as_object() else {
        return String::new();
    };
    let mut out = String::new();
    if let Some(n) = map.get("name").and_then(Value::as_text) {
        out.push_str(&format!("# {}\n\n", n));
    }
    if let Some(d) = map.get("description").and_then(Value::as_text) {
        out.push_str(&format!("{}\n\n", d));
    }
    if let Some(u) = map.get("usage").and_then(Value::as_text) {
        out.push_str(&format!("**Usage:** `{}`\n\n", u));
    }
    if let Some(aliases) = map.get("aliases").and_then(Value::as_list).filter(|a| !a.is_empty()) {
        let names: Vec<&str> = aliases.iter().filter_map(Value::as_text).collect();
        out.push_str(&format!("**Aliases:** {}\n\n", names.join(", ")));
    }
    if let Some(Value::Object(categories)) = map.get("filters") {
        let mut categories: Vec<_> = categories.iter().collect();
        categories.sort_by(|a, b| a.0.cmp(b.0));
        for (category, names) in categories {
            let names: Vec<&str> = names.as_list().unwrap_or_default().iter().filter_map(Value::as_text).collect();
            out.push_str(&format!("**{}:** {}\n\n", category, names.join(", ")));
        }
    }
    out
}

fn tool_list_filters(gauge: &Gauge, args: &JsonValue) -> Result<JsonValue, McpError> {
    let category = args.get("category").and_then(|v| v.as_str());
    let filters = gauge.list_functions(category);
    Ok(json!({ "content": [{ "type": "text", "text": "Filters listed" }], "data": filters.to_json() }))
}

fn tool_list_units(gauge: &Gauge, args: &JsonValue) -> Result<JsonValue, McpError> {
    let kind = match args.get("kind").and_then(|v| v.as_str()) {
        None => None,
        Some(name) => Some(QuantityKind::from_name(name)
            .ok_or_else(|| McpError::invalid_params(format!("Unknown kind: {}", name)))?),
    };
    let units = gauge.list_units(kind);
    Ok(json!({ "content": [{ "type": "text", "text": "Units listed" }], "data": units.to_json() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_plugin::EntityState;

    fn test_gauge() -> Gauge {
        let states = StateSnapshot::new()
            .with_state(EntityState::new("sensor.grid_power", "2").with_unit("kW"))
            .with_state(EntityState::new("sensor.outdoor", "unknown").with_unit("°C"));
        gauge::setup(&default_host_config(), Arc::new(states)).unwrap()
    }

    fn call(gauge: &Gauge, line: JsonValue) -> JsonValue {
        let response = handle_line(gauge, &line.to_string()).unwrap();
        serde_json::to_value(&response).unwrap()
    }

    fn tool(gauge: &Gauge, name: &str, arguments: JsonValue) -> JsonValue {
        call(gauge, json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call",
            "params": { "name": name, "arguments": arguments }
        }))
    }

    #[test]
    fn test_initialize_echoes_protocol() {
        let g = test_gauge();
        let r = call(&g, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
            "params": {"protocolVersion": "2024-11-05", "clientInfo": {"name": "test"}}}));
        assert_eq!(r["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(r["result"]["serverInfo"]["name"], SERVER_NAME);
    }

    #[test]
    fn test_notifications_get_no_response() {
        let g = test_gauge();
        let line = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
        assert!(handle_line(&g, &line).is_none());
    }

    #[test]
    fn test_protocol_errors() {
        let g = test_gauge();
        let r = serde_json::to_value(handle_line(&g, "{ nope").unwrap()).unwrap();
        assert_eq!(r["error"]["code"], PARSE_ERROR);

        let r = call(&g, json!({"jsonrpc": "2.0", "id": 2, "method": "resources/list"}));
        assert_eq!(r["error"]["code"], METHOD_NOT_FOUND);

        let r = tool(&g, "eval", json!({}));
        assert_eq!(r["error"]["code"], INVALID_PARAMS);
        let r = tool(&g, "render", json!({}));
        assert_eq!(r["error"]["code"], INVALID_PARAMS);
    }

    #[test]
    fn test_tools_list() {
        let g = test_gauge();
        let r = call(&g, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}));
        let names: Vec<&str> = r["result"]["tools"].as_array().unwrap().iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert_eq!(names, ["render", "convert", "help", "list_filters", "list_units"]);
    }

    #[test]
    fn test_render_tool() {
        let g = test_gauge();
        let r = tool(&g, "render", json!({
            "template": "{{ 'sensor.grid_power' | watts }} W, {{ reading | kw(unit) }} kW",
            "variables": {"reading": 1500, "unit": "W"}
        }));
        assert_eq!(r["result"]["content"][0]["text"], "2000.0 W, 1.5 kW");
        assert_eq!(r["result"]["isError"], false);
        assert_eq!(r["result"]["values"][0], 2000.0);
    }

    #[test]
    fn test_convert_tool() {
        let g = test_gauge();
        let r = tool(&g, "convert", json!({"filter": "celsius", "value": 212, "unit": "°F"}));
        assert_eq!(r["result"]["value"], 100.0);

        let r = tool(&g, "convert", json!({"filter": "fahrenheit", "value": "sensor.outdoor"}));
        assert_eq!(r["result"]["isError"], true);
        assert_eq!(r["result"]["error"]["code"], "UNRESOLVED_REFERENCE");
    }

    #[test]
    fn test_help_and_listing_tools() {
        let g = test_gauge();
        let r = tool(&g, "help", json!({"name": "kwh"}));
        assert_eq!(r["result"]["data"]["name"], "kilowatt_hours");
        assert!(r["result"]["content"][0]["text"].as_str().unwrap().starts_with("# kilowatt_hours"));

        let r = tool(&g, "help", json!({"name": "kilowats"}));
        assert_eq!(r["error"]["code"], INVALID_PARAMS);

        let r = tool(&g, "list_filters", json!({"category": "temperature"}));
        assert_eq!(r["result"]["data"].as_array().map(|a| a.len()), Some(3));

        let r = tool(&g, "list_units", json!({"kind": "power"}));
        assert_eq!(r["result"]["data"].as_array().map(|a| a.len()), Some(5));
        let r = tool(&g, "list_units", json!({"kind": "volume"}));
        assert_eq!(r["error"]["code"], INVALID_PARAMS);
    }
}
