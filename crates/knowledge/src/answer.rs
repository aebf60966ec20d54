//! Support-style rendering of a retrieved answer.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const MAX_COMMANDS: usize = 8;

const COMMAND_KEYWORDS: &[&str] = &[
    "sudo", "apt-get", "apt ", "nmcli", "ifconfig", "iwconfig", "lspci", "lsusb", "dmesg",
    "systemctl", "rfkill", "netplan",
];

/// Clause separators inside a chat answer: commas, `&&`, sentence ends.
static SEGMENT_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",|&&|\.\s+").expect("unreachable error: invalid segment regex")
});

static LEADING_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*run\s+").expect("unreachable error: invalid prefix regex")
});

/// Diagnostics users are asked for when an answer does not help.
pub const DIAGNOSTICS: &[(&str, &str)] = &[
    ("Ubuntu version", "lsb_release -a"),
    ("WiFi chipset", "lspci | grep -i net"),
    ("Network status", "nmcli dev status"),
    ("Logs", "dmesg | tail -50"),
];

/// Pull copy-pasteable commands out of a free-text answer.
///
/// At most eight, in order of appearance, without duplicates. Bare `apt` and
/// `apt-get` invocations get `sudo`; an answer mentioning a reboot ends with
/// `sudo reboot`.
pub fn extract_commands(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut commands = Vec::new();

    for part in SEGMENT_SPLIT.split(text) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let low = part.to_lowercase();
        if !COMMAND_KEYWORDS.iter().any(|k| low.contains(k)) {
            continue;
        }

        let mut command = LEADING_RUN.replace(part, "").into_owned();
        let low = command.to_lowercase();
        if low.starts_with("apt-get") || low.starts_with("apt ") {
            command = format!("sudo {}", command);
        }

        if command.chars().count() >= 5 {
            commands.push(command);
        }
    }

    if text.to_lowercase().contains("reboot") {
        commands.push("sudo reboot".to_string());
    }

    let mut seen = HashSet::new();
    commands.retain(|c| seen.insert(c.clone()));
    commands.truncate(MAX_COMMANDS);
    commands
}

/// Render the best answer as a support reply: the answer itself, commands
/// to copy, and what to send back if it does not help.
pub fn format_support_answer(best_answer: &str) -> String {
    let commands = extract_commands(best_answer);
    let mut lines = vec![
        "Suggested fix (based on similar Ubuntu issues):".to_string(),
        String::new(),
        "1) Best next step:".to_string(),
        format!("- {}", best_answer.trim()),
    ];

    if !commands.is_empty() {
        lines.push(String::new());
        lines.push("2) Commands to run (copy/paste):".to_string());
        lines.push("```bash".to_string());
        lines.extend(commands);
        lines.push("```".to_string());
    }

    lines.push(String::new());
    lines.push("3) If it still doesn't work, reply with:".to_string());
    for (label, command) in DIAGNOSTICS {
        lines.push(format!("- {}: `{}`", label, command));
    }

    lines.join("\n")
}

/// Reply used when no candidate scored high enough to be trusted.
pub fn low_confidence_message() -> String {
    let mut lines = vec![
        "I'm not confident I have a good match for this question.".to_string(),
        "If this is an Ubuntu issue, please reply with:".to_string(),
    ];
    for (label, command) in DIAGNOSTICS.iter().filter(|(label, _)| *label != "Network status") {
        lines.push(format!("- {}: {}", label, command));
    }
    lines.join("\n")
}
