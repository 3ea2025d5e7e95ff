use console::Style;
use photonic_core::pipeline::JobResult;
use serde_json::Value;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    ok: Style,
    failed: Style,
    warning: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            ok: Style::new().green(),
            failed: Style::new().red().bold(),
            warning: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

/// Tool or processor name with its availability.
pub struct Availability {
    name: String,
    available: bool,
}

impl Availability {
    pub fn new(name: &str, available: bool) -> Self {
        Self {
            name: name.to_string(),
            available,
        }
    }
}

fn rule(len: usize) -> String {
    "\u{2550}".repeat(len)
}

fn is_path_key(key: &str) -> bool {
    matches!(key, "output" | "referenceImage")
}

/// Scalars print inline; arrays print one entry per line.
fn print_meta_value(s: &Styles, key: &str, value: &Value) {
    match value {
        Value::Array(items) if items.is_empty() => {}
        Value::Array(items) => {
            let style = if key == "warnings" { &s.warning } else { &s.value };
            println!("    {}", s.label.apply_to(key));
            for item in items {
                let text = match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                println!("      {}", style.apply_to(text));
            }
        }
        Value::Null => {}
        Value::String(text) if is_path_key(key) => {
            println!("    {:<18}{}", s.label.apply_to(key), s.path.apply_to(text));
        }
        Value::String(text) => {
            println!("    {:<18}{}", s.label.apply_to(key), s.value.apply_to(text));
        }
        other => {
            println!("    {:<18}{}", s.label.apply_to(key), s.value.apply_to(other));
        }
    }
}

pub fn print_job_result(result: &JobResult) {
    let s = Styles::new();
    let title = format!("{} job", result.job.job_type());

    println!();
    println!("  {}", s.title.apply_to(&title));
    println!("  {}", s.title.apply_to(rule(title.chars().count())));
    println!();

    println!("  {:<14}{}", s.label.apply_to("Job"), s.value.apply_to(&result.job.id));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(result.job.input.display())
    );
    match &result.error {
        None => println!("  {:<14}{}", s.label.apply_to("Status"), s.ok.apply_to(result.status())),
        Some(e) => {
            println!("  {:<14}{}", s.label.apply_to("Status"), s.failed.apply_to(result.status()));
            for line in e.to_string().lines() {
                println!("    {}", s.failed.apply_to(line));
            }
        }
    }
    println!();

    if !result.meta.is_empty() {
        println!("  {}", s.header.apply_to("Details"));
        for (key, value) in &result.meta {
            print_meta_value(&s, key, value);
        }
        println!();
    }
}

pub fn print_availability(sections: &[(&str, Vec<Availability>)]) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Photonic Tools"));
    println!("  {}", s.title.apply_to(rule(14)));
    println!();

    for (header, entries) in sections {
        println!("  {}", s.header.apply_to(header));
        for entry in entries {
            let status = if entry.available {
                s.ok.apply_to("available")
            } else {
                s.warning.apply_to("missing")
            };
            println!("    {:<18}{}", s.label.apply_to(&entry.name), status);
        }
        println!();
    }
}
