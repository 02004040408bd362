use serde::Serialize;

use crate::cli::OutputFormat;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

/// One compact JSON document per line.
pub fn to_ndjson<T: Serialize>(items: &[T]) -> anyhow::Result<String> {
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(item)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::{render, to_ndjson};
    use crate::cli::OutputFormat;

    #[derive(Serialize)]
    struct Sample {
        id: &'static str,
        count: u32,
    }

    #[test]
    fn raw_is_single_line() {
        let rendered = render(&Sample { id: "a", count: 2 }, OutputFormat::Raw)
            .expect("render should work");
        assert_eq!(rendered, r#"{"id":"a","count":2}"#);
    }

    #[test]
    fn json_is_pretty() {
        let rendered = render(&Sample { id: "a", count: 2 }, OutputFormat::Json)
            .expect("render should work");
        assert!(rendered.contains('\n'));
    }

    #[test]
    fn ndjson_emits_one_line_per_item() {
        let items = [Sample { id: "a", count: 1 }, Sample { id: "b", count: 2 }];
        let ndjson = to_ndjson(&items).expect("ndjson conversion should work");
        assert_eq!(ndjson.lines().count(), 2);
        assert!(ndjson.contains("\"id\":\"b\""));
    }
}
