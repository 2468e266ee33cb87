use crate::domain::calendar::parse_weekday;
use crate::domain::models::{Block, ScheduleTemplate};
use crate::infrastructure::error::InfraError;
use chrono::Weekday;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const TEMPLATES_JSON: &str = "templates.json";
pub const DEFAULT_START_HOUR: u8 = 8;
pub const MAX_START_HOUR: u8 = 23;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
    pub templates: serde_json::Value,
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "Powerhouse Planner",
                "timezone": "UTC",
                "startHour": DEFAULT_START_HOUR,
                "weekStart": "Sunday"
            }),
        ),
        (
            TEMPLATES_JSON,
            serde_json::json!({
                "schema": 1,
                "blocks": []
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            write_config(&path, &value)?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

fn write_config(path: &Path, value: &serde_json::Value) -> Result<(), InfraError> {
    let formatted = serde_json::to_string_pretty(value)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        templates: read_config(&config_dir.join(TEMPLATES_JSON))?,
    })
}

pub fn clamp_start_hour(hour: i64) -> u8 {
    hour.clamp(0, i64::from(MAX_START_HOUR)) as u8
}

pub fn read_start_hour(config_dir: &Path) -> Result<u8, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get("startHour")
        .and_then(serde_json::Value::as_i64)
        .map(clamp_start_hour)
        .unwrap_or(DEFAULT_START_HOUR))
}

pub fn save_start_hour(config_dir: &Path, hour: u8) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    let mut app = read_config(&path)?;
    let object = app.as_object_mut().ok_or_else(|| {
        InfraError::InvalidConfig(format!("invalid object structure in {}", path.display()))
    })?;
    object.insert(
        "startHour".to_string(),
        serde_json::Value::from(hour.min(MAX_START_HOUR)),
    );
    write_config(&path, &app)
}

/// Falls back to UTC when the configured name is absent or unknown.
pub fn read_timezone(config_dir: &Path) -> Result<Tz, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let name = app
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let Some(name) = name else {
        return Ok(Tz::UTC);
    };
    Ok(name.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!(timezone = name, "unknown timezone in app config, using UTC");
        Tz::UTC
    }))
}

pub fn read_week_start(config_dir: &Path) -> Result<Weekday, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get("weekStart")
        .and_then(serde_json::Value::as_str)
        .and_then(parse_weekday)
        .unwrap_or(Weekday::Sun))
}

/// The configured block list, or the built-in template when none is set or
/// the configured one does not validate.
pub fn read_schedule_template(config_dir: &Path) -> Result<ScheduleTemplate, InfraError> {
    let path = config_dir.join(TEMPLATES_JSON);
    let templates = read_config(&path)?;
    let Some(raw_blocks) = templates.get("blocks").filter(|value| {
        value
            .as_array()
            .is_some_and(|blocks| !blocks.is_empty())
    }) else {
        return Ok(ScheduleTemplate::builtin());
    };

    let blocks = match serde_json::from_value::<Vec<Block>>(raw_blocks.clone()) {
        Ok(blocks) => blocks,
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "ignoring undecodable template blocks");
            return Ok(ScheduleTemplate::builtin());
        }
    };
    Ok(ScheduleTemplate::from_blocks(blocks).unwrap_or_else(|error| {
        tracing::warn!(path = %path.display(), %error, "ignoring invalid template blocks");
        ScheduleTemplate::builtin()
    }))
}
