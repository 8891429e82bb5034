use agriconfig::DisplayConfig;
use agridoctor::present::{ResultView, ViewKind};
use agridoctor::types::{ErrorDetail, HistoryEntry, ModelHealth, SoilField, UserProfile};
use colored::{Color, Colorize};
use serde_json::Value;
use std::fmt::Write;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

const TIMESTAMP_FORMAT: &[time::format_description::FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Keys that name the predicted label inside a history record.
const PREDICTION_KEYS: [&str; 4] = ["crop", "fertilizer", "disease", "prediction"];

pub fn result(view: &ResultView, display: &DisplayConfig) {
    let color = match view.kind {
        ViewKind::Success => Color::Green,
        ViewKind::Failure => Color::Red,
    };
    println!("{}", view.title.color(color).bold());
    println!("{}", view.subtitle.dimmed());
    println!("  {}", view.headline.bold());

    for detail in &view.details {
        if detail.label == "Explanation" && !display.show_explanation {
            continue;
        }
        println!("  {:<15}{}", format!("{}:", detail.label), detail.value);
    }

    if !view.alternatives.is_empty() && display.top_predictions > 0 {
        println!("  {}", "Top predictions:".dimmed());
        for (rank, alternative) in view
            .alternatives
            .iter()
            .take(display.top_predictions)
            .enumerate()
        {
            println!("    {}. {alternative}", rank + 1);
        }
    }
}

pub fn user(user: &UserProfile) {
    let name = user.full_name.as_deref().unwrap_or(&user.username);
    println!("{} ({})", name.bold(), user.email);
    println!("  username: {}", user.username);
    println!("  member since: {}", local_timestamp(user.created_at));
}

pub fn history(title: &str, entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("No {title} history yet.");
        return;
    }
    for entry in entries {
        let when = entry
            .created_at
            .map_or_else(|| "unknown date    ".to_string(), local_timestamp);
        println!(
            "{}  {:<20} {}",
            when.dimmed(),
            summarize_prediction(&entry.prediction).bold(),
            summarize_inputs(&entry.input_data)
        );
    }
}

pub fn health(service: &str, health: &Result<ModelHealth, agridoctor::Error>) {
    match health {
        Ok(health) => {
            let loaded = health.model_loaded.unwrap_or(false);
            let status = health.status.as_deref().unwrap_or("unknown");
            let label = format!("{service:<20} {status}");
            if loaded {
                println!("{}", label.green());
            } else {
                println!("{}", label.yellow());
            }
            if let Some(message) = &health.message {
                println!("  {message}");
            }
            if !health.supported_plants.is_empty() {
                println!("  plants: {}", health.supported_plants.join(", "));
            }
        }
        Err(err) => println!("{}", format!("{service:<20} unavailable: {err}").red()),
    }
}

/// Appends the expected range when `message` is about one of the soil inputs.
pub fn with_field_hint(message: &str) -> String {
    SoilField::ALL
        .into_iter()
        .find(|field| message.starts_with(field.label()))
        .map_or_else(
            || message.to_string(),
            |field| format!("{message} (expected {})", field.hint()),
        )
}

/// Error text for a non-success reply, one line per field error.
pub fn service_error(status: u16, detail: Option<&ErrorDetail>) -> String {
    let mut output = format!("AgriDoctor API error ({status})");
    match detail {
        Some(ErrorDetail::Fields(errors)) if !errors.is_empty() => {
            output.push(':');
            for error in errors {
                let _ = write!(output, "\n  - {error}");
            }
        }
        Some(detail) => {
            let _ = write!(output, ": {detail}");
        }
        None => {}
    }
    output
}

fn local_timestamp(at: OffsetDateTime) -> String {
    let at = UtcOffset::current_local_offset().map_or(at, |offset| at.to_offset(offset));
    at.format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| at.to_string())
}

fn summarize_prediction(prediction: &Value) -> String {
    match prediction {
        Value::String(label) => label.clone(),
        Value::Object(fields) => PREDICTION_KEYS
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map_or_else(|| prediction.to_string(), str::to_string),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn summarize_inputs(inputs: &Value) -> String {
    match inputs {
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| match value {
                Value::String(text) => format!("{key}={text}"),
                other => format!("{key}={other}"),
            })
            .collect::<Vec<_>>()
            .join(" "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agridoctor::types::FieldError;
    use serde_json::json;

    #[test]
    fn prediction_summary_prefers_label_keys() {
        assert_eq!(summarize_prediction(&json!({"crop": "Rice", "crop_id": 20})), "Rice");
        assert_eq!(summarize_prediction(&json!("Urea")), "Urea");
        assert_eq!(summarize_prediction(&Value::Null), "-");
    }

    #[test]
    fn input_summary_is_key_value_pairs() {
        assert_eq!(
            summarize_inputs(&json!({"N": 90, "crop_type": "rice"})),
            "N=90 crop_type=rice"
        );
    }

    #[test]
    fn soil_validation_errors_carry_the_range() {
        assert_eq!(
            with_field_hint("Humidity must be a number"),
            "Humidity must be a number (expected 0-100 %)"
        );
        assert_eq!(
            with_field_hint("Nitrogen (N) is required"),
            "Nitrogen (N) is required (expected 0-200 kg/ha)"
        );
        assert_eq!(
            with_field_hint("Please select a crop type"),
            "Please select a crop type"
        );
    }

    #[test]
    fn field_errors_render_one_per_line() {
        let detail = ErrorDetail::Fields(vec![FieldError {
            loc: vec![json!("body"), json!("N")],
            msg: "field required".to_string(),
            kind: None,
        }]);
        assert_eq!(
            service_error(422, Some(&detail)),
            "AgriDoctor API error (422):\n  - N: field required"
        );
        assert_eq!(service_error(500, None), "AgriDoctor API error (500)");
    }
}
