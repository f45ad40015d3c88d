mod support;

use serde_json::{json, Value};

use support::TestHome;

fn request(id: i64, method: &str, params: Value) -> String {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string()
}

/// Feed newline-delimited requests to `tasktracker mcp` and parse each reply
fn session(home: &TestHome, lines: &[String]) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    let mut input = lines.join("\n");
    input.push('\n');
    let output = home.cmd().arg("mcp").write_stdin(input).output()?;
    assert!(output.status.success(), "mcp exited with {:?}", output.status);

    let stdout = String::from_utf8(output.stdout)?;
    let mut replies = Vec::new();
    for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
        replies.push(serde_json::from_str(line)?);
    }
    Ok(replies)
}

fn tool_payload(reply: &Value) -> Result<Value, Box<dyn std::error::Error>> {
    let text = reply["result"]["content"][0]["text"]
        .as_str()
        .ok_or("missing text content")?;
    Ok(serde_json::from_str(text)?)
}

#[test]
fn stdio_session_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    let replies = session(
        &home,
        &[
            request(1, "initialize", json!({"protocolVersion": "2024-11-05"})),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
            request(2, "tools/list", json!({})),
            request(3, "resources/list", json!({})),
            request(4, "prompts/list", json!({})),
            request(5, "no/such/method", json!({})),
        ],
    )?;

    assert_eq!(replies.len(), 5);
    assert_eq!(replies[0]["result"]["serverInfo"]["name"], "tasktracker");
    assert_eq!(replies[1]["id"], 2);
    assert!(replies[1]["result"]["tools"].as_array().map_or(0, Vec::len) >= 16);
    assert_eq!(replies[2]["result"]["resources"][0]["uri"], "tasks://all");
    assert_eq!(replies[3]["result"]["prompts"][1]["name"], "create_plan_prompt");
    assert_eq!(replies[4]["error"]["code"], -32601);
    Ok(())
}

#[test]
fn tools_write_through_to_the_data_directory() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    let replies = session(
        &home,
        &[
            request(
                1,
                "tools/call",
                json!({"name": "add_task", "arguments": {"title": "Via MCP", "priority": 2}}),
            ),
            request(
                2,
                "tools/call",
                json!({"name": "add_plan_step", "arguments": {"name": "Plan via MCP"}}),
            ),
            request(
                3,
                "tools/call",
                json!({"name": "save_notes", "arguments": {"notes_text": "mcp notes"}}),
            ),
            request(
                4,
                "tools/call",
                json!({"name": "get_task", "arguments": {"task_id": "nope"}}),
            ),
        ],
    )?;

    let added = tool_payload(&replies[0])?;
    assert_eq!(added["success"], true);
    assert_eq!(added["result"]["priority"], 2);
    assert_eq!(replies[0]["result"]["isError"], false);

    let missing = tool_payload(&replies[3])?;
    assert_eq!(missing["error"]["code"], "NOT_FOUND");
    assert_eq!(replies[3]["result"]["isError"], true);

    let tasks = home.json(&["task", "list"])?;
    assert_eq!(tasks["data"]["tasks"][0]["title"], "Via MCP");
    let steps = support::step_names(&home)?;
    assert_eq!(steps, vec!["Plan via MCP"]);
    let notes = home.json(&["notes", "show"])?;
    assert_eq!(notes["data"]["notes"], "mcp notes");
    Ok(())
}

#[test]
fn resources_read_current_files() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    let id = support::add_task(&home, "Readable")?;
    home.json(&["notes", "set", "resource notes"])?;

    let replies = session(
        &home,
        &[
            request(1, "resources/read", json!({"uri": format!("tasks://{id}")})),
            request(2, "resources/read", json!({"uri": "notes://all"})),
            request(3, "resources/read", json!({"uri": "plan://missing"})),
            request(
                4,
                "prompts/get",
                json!({"name": "add_task_prompt", "arguments": {"title": "T"}}),
            ),
        ],
    )?;

    let task_text = replies[0]["result"]["contents"][0]["text"]
        .as_str()
        .ok_or("missing text")?;
    let task: Value = serde_json::from_str(task_text)?;
    assert_eq!(task["title"], "Readable");

    assert_eq!(replies[1]["result"]["contents"][0]["text"], "resource notes");
    assert_eq!(replies[2]["error"]["code"], -32002);

    let prompt = replies[3]["result"]["messages"][0]["content"]["text"]
        .as_str()
        .ok_or("missing prompt")?;
    assert!(prompt.contains("Title: T"));
    Ok(())
}

#[test]
fn malformed_lines_get_parse_errors() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    let replies = session(&home, &["this is not json".to_string(), request(2, "ping", json!({}))])?;

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["error"]["code"], -32700);
    assert_eq!(replies[1]["id"], 2);
    Ok(())
}
