use tasktracker::output::{format_human, infer_command_name, HumanOutput};

fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|arg| arg.to_string()).collect()
}

#[test]
fn format_human_includes_sections() {
    let mut human = HumanOutput::new("Task created");
    human.push_summary("Title", "Write docs");
    human.push_detail("first line of the description");
    human.push_warning("previous tasks, plan and notes were replaced");
    human.push_next_step("tasktracker task list");

    let rendered = format_human(&human);
    assert!(rendered.contains("Task created"));
    assert!(rendered.contains("Summary:"));
    assert!(rendered.contains("- Title: Write docs"));
    assert!(rendered.contains("Details:"));
    assert!(rendered.contains("- first line of the description"));
    assert!(rendered.contains("Warnings:"));
    assert!(rendered.contains("Next steps:"));
    assert!(rendered.contains("- tasktracker task list"));
}

#[test]
fn format_human_omits_empty_sections() {
    let human = HumanOutput::new("Plan");
    assert_eq!(format_human(&human), "Plan");
}

#[test]
fn command_names_group_subcommands() {
    assert_eq!(infer_command_name(args(&["task", "add", "x"])), "task add");
    assert_eq!(
        infer_command_name(args(&["--data-dir", "/tmp/plan", "--json", "plan", "move"])),
        "plan move"
    );
    assert_eq!(infer_command_name(args(&["export", "out.json"])), "export");
    assert_eq!(infer_command_name(args(&["--json"])), "tasktracker");
}
