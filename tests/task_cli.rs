mod support;

use predicates::str::contains;

use support::TestHome;

#[test]
fn add_uses_defaults_and_persists() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();

    home.cmd()
        .args(["task", "add", "Write the changelog", "-d", "for 0.3"])
        .assert()
        .success()
        .stdout(contains("Task created"))
        .stdout(contains("Write the changelog"));

    let tasks = home.read_json("tasks.json")?;
    let task = &tasks[0];
    assert_eq!(task["title"], "Write the changelog");
    assert_eq!(task["description"], "for 0.3");
    assert_eq!(task["priority"], 1);
    assert_eq!(task["status"], "not_started");
    assert_eq!(task["created_at"], task["updated_at"]);
    Ok(())
}

#[test]
fn list_filters_by_status_and_priority() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    home.json(&["task", "add", "Low one", "-p", "low"])?;
    home.json(&["task", "add", "Busy", "-p", "2", "-s", "in-progress"])?;
    home.json(&["task", "add", "Also low", "-p", "3", "-s", "completed"])?;

    let low = home.json(&["task", "list", "--priority", "3"])?;
    assert_eq!(low["data"]["total"], 2);
    assert_eq!(low["data"]["tasks"][0]["title"], "Low one");
    assert_eq!(low["data"]["tasks"][1]["title"], "Also low");

    let busy = home.json(&["task", "list", "--status", "in_progress"])?;
    assert_eq!(busy["data"]["total"], 1);
    assert_eq!(busy["data"]["tasks"][0]["priority"], 2);

    let both = home.json(&["task", "list", "-s", "completed", "-p", "low"])?;
    assert_eq!(both["data"]["total"], 1);
    Ok(())
}

#[test]
fn update_changes_only_given_fields() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    let id = support::add_task(&home, "Original")?;
    let before = home.json(&["task", "show", &id])?;

    let updated = home.json(&["task", "update", &id, "--status", "completed"])?;
    let task = &updated["data"];
    assert_eq!(task["title"], "Original");
    assert_eq!(task["status"], "completed");
    assert_eq!(task["created_at"], before["data"]["created_at"]);
    assert_ne!(task["updated_at"], before["data"]["updated_at"]);

    home.cmd()
        .args(["task", "update", &id])
        .assert()
        .code(2)
        .stderr(contains("nothing to update"));
    Ok(())
}

#[test]
fn invalid_input_is_rejected_without_changes() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    let id = support::add_task(&home, "Stable")?;

    home.cmd()
        .args(["task", "add", "Too urgent", "-p", "0"])
        .assert()
        .code(2)
        .stderr(contains("priority"));
    home.cmd()
        .args(["task", "update", &id, "-s", "someday"])
        .assert()
        .code(2)
        .stderr(contains("invalid status"));
    home.cmd()
        .args(["task", "update", &id, "-t", "  "])
        .assert()
        .code(2);

    let tasks = home.read_json("tasks.json")?;
    assert_eq!(tasks.as_array().map(Vec::len), Some(1));
    assert_eq!(tasks[0]["title"], "Stable");
    assert_eq!(tasks[0]["status"], "not_started");
    Ok(())
}

#[test]
fn delete_returns_the_removed_task() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    let keep = support::add_task(&home, "Keep")?;
    let drop = support::add_task(&home, "Drop")?;

    let deleted = home.json(&["task", "delete", &drop])?;
    assert_eq!(deleted["data"]["title"], "Drop");

    home.cmd().args(["task", "delete", &drop]).assert().code(3);
    home.cmd().args(["task", "show", &keep]).assert().success();

    let listed = home.json(&["task", "list"])?;
    assert_eq!(listed["data"]["total"], 1);
    Ok(())
}

#[test]
fn configured_defaults_apply() -> Result<(), Box<dyn std::error::Error>> {
    let home = TestHome::new();
    home.write_file(
        "config.toml",
        "[tasks]\ndefault_priority = 2\ndefault_status = \"in_progress\"\n",
    )?;

    let created = home.json(&["task", "add", "Configured"])?;
    assert_eq!(created["data"]["priority"], 2);
    assert_eq!(created["data"]["status"], "in_progress");
    Ok(())
}
