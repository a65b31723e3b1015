// SPDX-License-Identifier: MIT

//! Small output helpers shared by commands.

/// Print `obj` as pretty JSON, or run the text formatter.
pub fn format_or_json(
    json: bool,
    obj: &serde_json::Value,
    text: impl FnOnce(),
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(obj)?);
    } else {
        text();
    }
    Ok(())
}
