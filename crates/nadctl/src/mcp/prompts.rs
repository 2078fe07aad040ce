use serde_json::{json, Value};

use super::protocol::RpcError;

pub const QUICK_STATUS: &str = "nad_quick_status";
pub const SET_LISTENING_LEVEL: &str = "nad_set_listening_level";

/// Named listening levels and the volume each maps to.
const LEVELS: &[(&str, f64)] = &[
    ("background", -50.0),
    ("quiet", -40.0),
    ("moderate", -30.0),
    ("loud", -20.0),
];

pub fn definitions() -> Vec<Value> {
    let names: Vec<&str> = LEVELS.iter().map(|(name, _)| *name).collect();
    vec![
        json!({
            "name": QUICK_STATUS,
            "description": "Summarise what the receiver is doing right now",
        }),
        json!({
            "name": SET_LISTENING_LEVEL,
            "description": "Bring the receiver to a comfortable listening level",
            "arguments": [{
                "name": "level",
                "description": format!("One of {}, or a volume in dB", names.join(", ")),
                "required": true,
            }],
        }),
    ]
}

/// Volume for a named level or a literal dB value.
pub fn level_db(level: &str) -> Option<f64> {
    let level = level.trim();
    LEVELS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(level))
        .map(|(_, db)| *db)
        .or_else(|| {
            level
                .trim_end_matches("dB")
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|db| db.is_finite())
        })
}

fn user_message(text: String) -> Value {
    json!({ "role": "user", "content": { "type": "text", "text": text } })
}

pub fn get(name: &str, args: &Value) -> Result<Value, RpcError> {
    match name {
        QUICK_STATUS => Ok(json!({
            "description": "Receiver status summary",
            "messages": [user_message(
                "Call get_status on the NAD receiver and summarise it in one or two sentences: \
                 whether it is on, which input is playing, the volume in dB, and whether it is muted."
                    .to_string(),
            )],
        })),
        SET_LISTENING_LEVEL => {
            let level = args
                .get("level")
                .and_then(Value::as_str)
                .ok_or_else(|| RpcError::invalid_params("level is required"))?;
            let db = level_db(level)
                .ok_or_else(|| RpcError::invalid_params(format!("unknown listening level {level:?}")))?;
            Ok(json!({
                "description": format!("Set a {level} listening level"),
                "messages": [user_message(format!(
                    "Bring the NAD receiver to a {level} listening level. Check get_status first; \
                     if it is in standby, call power_on. If it is muted, call toggle_mute. \
                     Then call set_volume with level {db:.1} and report the final status."
                ))],
            }))
        }
        other => Err(RpcError::invalid_params(format!("unknown prompt {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_and_numeric_levels() {
        assert_eq!(level_db("Quiet"), Some(-40.0));
        assert_eq!(level_db("-27.5 dB"), Some(-27.5));
        assert_eq!(level_db("deafening"), None);
    }

    #[test]
    fn listening_level_prompt_names_the_volume() {
        let prompt = get(SET_LISTENING_LEVEL, &json!({ "level": "loud" })).unwrap();
        let text = prompt["messages"][0]["content"]["text"].as_str().unwrap();
        assert!(text.contains("set_volume with level -20.0"));
        assert!(get(SET_LISTENING_LEVEL, &json!({})).is_err());
    }
}
