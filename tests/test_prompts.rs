//! Tests for the prompt layers shipped in config/prompts

use std::fs;

const LAYERS: &[&str] = &[
    "persona.md",
    "coordinator.md",
    "food_analyst.md",
    "coach.md",
    "data_manager.md",
    "tools.md",
];

fn read(name: &str) -> String {
    fs::read_to_string(format!("config/prompts/{name}"))
        .unwrap_or_else(|e| panic!("{name} prompt file missing: {e}"))
}

#[test]
fn test_all_prompt_layers_exist() {
    for layer in LAYERS {
        assert!(!read(layer).trim().is_empty(), "{layer} is empty");
    }
}

#[test]
fn test_persona_template_vars() {
    let text = read("persona.md");
    assert!(text.contains("{{bot_name}}"), "persona.md should contain {{bot_name}}");
    assert!(text.contains("{{today}}"), "persona.md should contain {{today}}");
    assert!(text.contains("{{user_id}}"), "persona.md should contain {{user_id}}");
}

#[test]
fn test_tools_template_vars() {
    let text = read("tools.md");
    assert!(text.contains("{{tools}}"), "tools.md should contain {{tools}}");
}

#[test]
fn test_only_known_placeholders() {
    let known = ["{{bot_name}}", "{{today}}", "{{user_id}}", "{{tools}}"];
    for layer in LAYERS {
        let mut text = read(layer);
        for k in known {
            text = text.replace(k, "");
        }
        assert!(!text.contains("{{"), "{layer} has an unknown placeholder");
    }
}

#[test]
fn test_data_manager_mentions_duplicate_flow() {
    let text = read("data_manager.md");
    assert!(text.contains("duplicate_prevented"));
    assert!(text.contains("force"));
}

#[test]
fn test_default_config_points_at_prompts() {
    let text = fs::read_to_string("config/default.toml").expect("config/default.toml missing");
    assert!(text.contains("prompts_dir = \"config/prompts\""));
}
